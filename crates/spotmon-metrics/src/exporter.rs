//! Prometheus text exposition over HTTP

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, Registry, TextEncoder};

/// Render the registry in Prometheus text format.
pub fn export_metrics(registry: &Registry) -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics encoding produced invalid UTF-8")
}

/// Scrape endpoint state.
#[derive(Clone)]
pub struct MetricsState {
    pub registry: Arc<Registry>,
}

impl MetricsState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }
}

/// Handler for GET /metrics.
pub async fn metrics_handler(State(state): State<MetricsState>) -> Response {
    let metrics = export_metrics(&state.registry);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        metrics,
    )
        .into_response()
}

/// Router exposing the scrape endpoint.
pub fn metrics_router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(MetricsState::new(registry))
}
