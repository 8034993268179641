//! `GET /v1/executions/dlq` — inspect executions the executor gave up on
//! after exhausting retries, for operator triage (spec §4.6).

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::schemas::DlqEntryResponse;
use super::AppState;
use crate::error::ServerError;

#[derive(Debug, Serialize, ToSchema)]
pub struct DlqListResponse {
    pub entries: Vec<DlqEntryResponse>,
    pub count: usize,
}

/// `GET /v1/executions/dlq`
#[utoipa::path(
    get,
    path = "/v1/executions/dlq",
    tag = "Executions",
    responses((status = 200, description = "Dead-lettered executions", body = DlqListResponse))
)]
pub async fn list_dlq(State(state): State<AppState>) -> Result<impl IntoResponse, ServerError> {
    let entries: Vec<DlqEntryResponse> = state
        .dlq_queue
        .snapshot()
        .into_iter()
        .map(DlqEntryResponse::from)
        .collect();
    let count = entries.len();
    Ok(Json(DlqListResponse { entries, count }))
}
