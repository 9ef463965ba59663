use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::AppState;

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Render metrics in Prometheus format
    let metrics = state.metrics.render();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics,
    )
}
