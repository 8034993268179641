//! Liveness and metrics endpoints. `/health` is for load balancer probes;
//! `/metrics` flattens the runtime and scheduler counters for a human or a
//! scrape-less dashboard — Prometheus export lives in `case-runtime`'s own
//! feature-gated exporter, not here.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use super::schemas::HealthResponse;
use super::AppState;
use crate::error::ServerError;

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    build_response(&state)
}

/// `GET /metrics`
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses((status = 200, description = "Runtime and scheduler counters", body = HealthResponse))
)]
pub async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    build_response(&state)
}

fn build_response(state: &AppState) -> Result<impl IntoResponse, ServerError> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        runtime: state.runtime_metrics.snapshot().into(),
        scheduler: state.scheduler_metrics.snapshot().into(),
    }))
}
