use axum::{
    extract::{rejection::RawPathParamsRejection, RawPathParams, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};
use std::sync::Arc;

use crate::{
    extractors::CurrentUser,
    metrics::{Instrumentation, RequestFacts},
};

/// Observes the status code written by the wrapped handler.
///
/// Starts at `200 OK` because handlers that never set a status are
/// answered with success. Only the first recorded status is kept.
#[derive(Debug, Clone, Copy)]
pub struct StatusRecorder {
    status: StatusCode,
    recorded: bool,
}

impl Default for StatusRecorder {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            recorded: false,
        }
    }
}

impl StatusRecorder {
    pub fn record(&mut self, status: StatusCode) {
        if !self.recorded {
            self.status = status;
            self.recorded = true;
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Wraps a route's handler with endpoint usage metrics.
///
/// Apply login (or any other layer that puts a [`CurrentUser`] into the
/// request) on top of the returned router so the user is known here.
pub fn metered<S>(
    instrumentation: &Arc<Instrumentation>,
    method_router: MethodRouter<S>,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    method_router.route_layer(middleware::from_fn_with_state(
        instrumentation.clone(),
        endpoint_usage_middleware,
    ))
}

/// Middleware that counts the completed request against the route pattern index
pub async fn endpoint_usage_middleware(
    State(instrumentation): State<Arc<Instrumentation>>,
    params: Result<RawPathParams, RawPathParamsRejection>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let method = request.method().to_string();
    let host = request_host(&request);
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .map(|u| u.display_name().to_string())
        .unwrap_or_default();
    let params = match params {
        Ok(params) => params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        Err(rejection) => {
            tracing::debug!(%rejection, path = %path, "Path parameters unavailable for metrics");
            Vec::new()
        }
    };

    let response = next.run(request).await;

    let mut status = StatusRecorder::default();
    status.record(response.status());

    instrumentation.record(&RequestFacts {
        path,
        method,
        host,
        params,
        user,
        status: status.status(),
    });

    response
}

/// Host header, falling back to the URI authority (HTTP/2).
fn request_host(request: &Request) -> String {
    request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
        .unwrap_or_default()
        .to_string()
}
