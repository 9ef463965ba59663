mod config;
mod error;
mod extractors;
mod handlers;
mod metrics;
mod middleware;
mod startup;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use crate::metrics::Instrumentation;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub metrics: Arc<Instrumentation>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with conditional JSON/text output
    let use_json = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "text".to_string()) == "json";

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,endpoint_metrics=debug,tower_http=debug".into());

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {}", e);
        e
    })?;

    // Endpoint metrics live in an explicit recorder, not a global one
    let metrics = Arc::new(Instrumentation::new(config.match_policy));
    metrics.set_build_info(&config.build_info);
    tracing::info!(
        version = %config.build_info.version,
        environment = %config.build_info.environment,
        hostname = %config.build_info.hostname,
        "Metrics recorder initialized"
    );

    let bind_addr = config.bind_addr;
    let state = Arc::new(AppState { config, metrics });

    // Build router; the pattern index is built once all routes are registered
    let app = startup::build_router(state).map_err(|e| {
        tracing::error!("Failed to build endpoint pattern index: {}", e);
        e
    })?;

    // Start server
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
