//! Debug listener — `/metrics` in Prometheus text format, `/health` as JSON.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

use crate::metrics::LineMetrics;
use crate::service::StatusBoard;
use crate::tail::TailState;

#[derive(Clone)]
pub struct DebugState {
    pub metrics: Arc<LineMetrics>,
    pub status: StatusBoard,
}

pub fn router(state: DebugState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<DebugState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render_prometheus(),
    )
}

/// Healthy while every tailer is watching its file. A tailer waiting for a
/// rotated file to reappear reports `reopening` and degrades the service.
async fn health_handler(State(state): State<DebugState>) -> impl IntoResponse {
    let files = state.status.snapshot();
    let watching = files
        .iter()
        .filter(|f| f.state == TailState::Watching)
        .count();
    let healthy = watching == files.len();
    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "status": if healthy { "healthy" } else { "degraded" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "files": {
                "total": files.len(),
                "watching": watching,
                "details": files,
            }
        })),
    )
}
