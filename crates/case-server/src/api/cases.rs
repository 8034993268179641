//! `POST /cases/{id}/run-initial` and `POST /cases/{id}/run-inbound` — the
//! two inbound-stimulus entrypoints that dispatch a run through
//! [`case_runtime::dispatch`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use case_core::{CaseId, MessageId, RunTrigger};
use case_runtime::DispatchOutcome;
use tracing::instrument;

use super::schemas::{DispatchResult, RunInboundRequest, RunInitialRequest};
use super::AppState;
use crate::error::ServerError;

impl From<DispatchOutcome> for DispatchResult {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Dispatched { run_id } => Self::Dispatched { run_id },
            DispatchOutcome::ActiveRunExists { run_id } => Self::ActiveRunExists { run_id },
            DispatchOutcome::SkippedLocked => Self::SkippedLocked,
            DispatchOutcome::AlreadySent => Self::AlreadySent,
            DispatchOutcome::CaseNotFound => {
                unreachable!("CaseNotFound is mapped to an error before reaching this conversion")
            }
        }
    }
}

fn status_for(result: &DispatchResult) -> StatusCode {
    match result {
        DispatchResult::Dispatched { .. } => StatusCode::ACCEPTED,
        DispatchResult::ActiveRunExists { .. } => StatusCode::CONFLICT,
        DispatchResult::SkippedLocked | DispatchResult::AlreadySent | DispatchResult::AlreadyProcessed => {
            StatusCode::OK
        }
    }
}

async fn run(
    state: &AppState,
    case_id: CaseId,
    trigger: RunTrigger,
    triggering_message: Option<case_core::Message>,
    scheduled_key: Option<String>,
) -> Result<impl IntoResponse, ServerError> {
    let outcome = case_runtime::dispatch(
        &state.store,
        &state.lock,
        &state.executor,
        &state.providers,
        state.dlq.as_ref(),
        state.classifier.as_ref(),
        state.thresholds,
        &state.safety_policy,
        &state.runtime_metrics,
        &state.runtime_config,
        case_id,
        trigger,
        triggering_message.as_ref(),
        scheduled_key,
    )
    .await?;

    if matches!(outcome, DispatchOutcome::CaseNotFound) {
        return Err(ServerError::Runtime(case_runtime::RuntimeError::CaseNotFound(case_id)));
    }

    let result = DispatchResult::from(outcome);
    let status = status_for(&result);
    Ok((status, Json(result)))
}

/// `POST /cases/{case_id}/run-initial`
#[utoipa::path(
    post,
    path = "/cases/{case_id}/run-initial",
    tag = "Cases",
    params(("case_id" = i64, Path, description = "Case identifier")),
    request_body = RunInitialRequest,
    responses(
        (status = 202, description = "Run dispatched", body = DispatchResult),
        (status = 404, description = "Case not found", body = super::schemas::ErrorResponse),
        (status = 409, description = "An active run already exists for this case", body = DispatchResult),
    )
)]
#[instrument(skip(state, body))]
pub async fn run_initial(
    State(state): State<AppState>,
    Path(case_id): Path<i64>,
    Json(body): Json<RunInitialRequest>,
) -> Result<impl IntoResponse, ServerError> {
    if let Some(mode) = body.autopilot_mode {
        tracing::debug!(?mode, "autopilot_mode on run-initial is informational only; the stored case record is authoritative");
    }
    run(&state, CaseId(case_id), RunTrigger::InitialRequest, None, None).await
}

/// `POST /cases/{case_id}/run-inbound`
#[utoipa::path(
    post,
    path = "/cases/{case_id}/run-inbound",
    tag = "Cases",
    params(("case_id" = i64, Path, description = "Case identifier")),
    request_body = RunInboundRequest,
    responses(
        (status = 202, description = "Run dispatched", body = DispatchResult),
        (status = 404, description = "Case or message not found", body = super::schemas::ErrorResponse),
        (status = 409, description = "An active run already exists for this case", body = DispatchResult),
    )
)]
#[instrument(skip(state, body))]
pub async fn run_inbound(
    State(state): State<AppState>,
    Path(case_id): Path<i64>,
    Json(body): Json<RunInboundRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let case_id = CaseId(case_id);
    let message_id = MessageId(body.message_id);
    if let Some(mode) = body.autopilot_mode {
        tracing::debug!(?mode, "autopilot_mode on run-inbound is informational only; the stored case record is authoritative");
    }

    let message = state
        .store
        .get_message(message_id)
        .await?
        .filter(|m| m.case_id == case_id)
        .ok_or_else(|| ServerError::MessageNotFound(message_id))?;

    run(&state, case_id, RunTrigger::InboundMessage, Some(message), None).await
}
