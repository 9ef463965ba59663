use axum::{middleware, routing::get, routing::MethodRouter, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    error::MetricsError,
    handlers,
    middleware::{login_required, metered, require_metrics_key},
};

/// Router builder that remembers every route pattern it registers.
///
/// Patterns use the application dialect (`/users/:id`, `/**`) and are
/// translated to axum's syntax on registration.
pub struct RouteTable<S = ()> {
    router: Router<S>,
    patterns: Vec<String>,
}

impl<S> Default for RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RouteTable<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            patterns: Vec::new(),
        }
    }

    pub fn route(mut self, pattern: &str, method_router: MethodRouter<S>) -> Self {
        self.router = self.router.route(&router_path(pattern), method_router);
        self.patterns.push(pattern.to_string());
        self
    }

    pub fn into_parts(self) -> (Router<S>, Vec<String>) {
        (self.router, self.patterns)
    }
}

/// `/users/:id` → `/users/{id}`, `/**` → `/{*rest}`, `/files/*path` → `/{*path}`
pub fn router_path(pattern: &str) -> String {
    pattern
        .split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':').filter(|n| !n.is_empty()) {
                return format!("{{{}}}", name);
            }
            if segment.starts_with('*') {
                let name = segment.trim_start_matches('*');
                let name = if name.is_empty() { "rest" } else { name };
                return format!("{{*{}}}", name);
            }
            segment.to_string()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Builds the application router and the endpoint pattern index.
///
/// The index is built from every registered pattern once the table is
/// complete, before the router can serve anything.
pub fn build_router(state: Arc<crate::AppState>) -> Result<Router, MetricsError> {
    let metrics = &state.metrics;
    let login = middleware::from_fn_with_state(state.clone(), login_required);

    let routes = RouteTable::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .route_layer(middleware::from_fn_with_state(state.clone(), require_metrics_key)),
        )
        .route(
            "/api/self",
            metered(metrics, get(handlers::auth_handler::get_self)).route_layer(login.clone()),
        )
        .route(
            "/api/users/:id",
            metered(metrics, get(handlers::users_handler::get_user)).route_layer(login),
        )
        // unserved paths, never measured
        .route("/**", metered(metrics, get(handlers::redirect_unserved)));

    let (router, patterns) = routes.into_parts();
    let index = metrics.init_index(&patterns)?;
    tracing::info!(
        registered = patterns.len(),
        indexed = index.len(),
        policy = ?metrics.policy(),
        "Endpoint pattern index built"
    );

    Ok(router.layer(TraceLayer::new_for_http()).with_state(state))
}
