//! `POST /proposals/{proposal_id}/decision` — the human-in-the-loop decision
//! endpoint. Wraps [`case_runtime::post_decision`], which applies the
//! decision through the reducer and re-dispatches a run when the action
//! requires one (approve / adjust).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use case_core::{HumanDecision, ProposalId};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use super::schemas::{DecisionRequest, DecisionResponse};
use super::AppState;
use crate::error::ServerError;

/// `POST /proposals/{proposal_id}/decision`
#[utoipa::path(
    post,
    path = "/proposals/{proposal_id}/decision",
    tag = "Proposals",
    params(("proposal_id" = Uuid, Path, description = "Proposal identifier")),
    request_body = DecisionRequest,
    responses(
        (status = 202, description = "Decision applied, run dispatched", body = DecisionResponse),
        (status = 404, description = "Proposal not found", body = super::schemas::ErrorResponse),
        (status = 409, description = "Proposal already decided", body = super::schemas::ErrorResponse),
    )
)]
#[instrument(skip(state, body))]
pub async fn decision(
    State(state): State<AppState>,
    Path(proposal_id): Path<Uuid>,
    Json(body): Json<DecisionRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let decision = HumanDecision {
        action: body.action,
        instruction: body.instruction,
        reason: body.reason,
        decided_by: body.decided_by.unwrap_or_else(|| "operator".to_string()),
        decided_at: Utc::now(),
    };

    let run_id = case_runtime::post_decision(
        &state.store,
        &state.lock,
        &state.executor,
        &state.providers,
        state.dlq.as_ref(),
        &state.safety_policy,
        &state.runtime_metrics,
        &state.runtime_config,
        ProposalId(proposal_id),
        decision,
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(DecisionResponse { run_id })))
}
