//! `POST /webhooks/inbound` — the email/portal relay's delivery endpoint.
//! Ingests a message (idempotent on `provider_message_id`) then dispatches a
//! run the same way [`super::cases::run_inbound`] does.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use case_core::{CaseId, MessageDirection, RunTrigger, ThreadHeaders};
use case_runtime::DispatchOutcome;
use case_store::NewMessage;
use tracing::instrument;

use super::schemas::{DispatchResult, WebhookInboundRequest, WebhookInboundResponse};
use super::AppState;
use crate::error::ServerError;

/// `POST /webhooks/inbound`
#[utoipa::path(
    post,
    path = "/webhooks/inbound",
    tag = "Webhooks",
    request_body = WebhookInboundRequest,
    responses(
        (status = 202, description = "Message ingested and run dispatched", body = WebhookInboundResponse),
        (status = 200, description = "Message already processed by an earlier delivery; not re-dispatched", body = WebhookInboundResponse),
        (status = 404, description = "Case not found", body = super::schemas::ErrorResponse),
        (status = 409, description = "An active run already exists for this case", body = WebhookInboundResponse),
    )
)]
#[instrument(skip(state, body))]
pub async fn inbound(
    State(state): State<AppState>,
    Json(body): Json<WebhookInboundRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let case_id = CaseId(body.case_id);

    let message = state
        .store
        .insert_message(NewMessage {
            case_id,
            direction: MessageDirection::Inbound,
            provider_message_id: body.provider_message_id,
            subject: body.subject,
            body: body.body,
            headers: ThreadHeaders {
                message_id: None,
                in_reply_to: body.in_reply_to,
                references: body.references,
            },
        })
        .await?;

    // `insert_message` is idempotent on `provider_message_id` and returns the
    // existing row on a replay. If that row was already carried to a run,
    // this delivery is a retry of a webhook we've already acted on — do not
    // dispatch a second classify/route/draft cycle for it.
    if message.is_processed() {
        return Ok((
            StatusCode::OK,
            Json(WebhookInboundResponse {
                message_id: message.id,
                dispatch: DispatchResult::AlreadyProcessed,
            }),
        ));
    }

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
        RunTrigger::InboundMessage,
        Some(&message),
        None,
    )
    .await?;

    if matches!(outcome, DispatchOutcome::CaseNotFound) {
        return Err(ServerError::Runtime(case_runtime::RuntimeError::CaseNotFound(case_id)));
    }

    if let DispatchOutcome::Dispatched { run_id } = outcome {
        state.store.mark_message_processed(message.id, run_id).await?;
    }

    let dispatch = DispatchResult::from(outcome);
    let status = match dispatch {
        DispatchResult::Dispatched { .. } => StatusCode::ACCEPTED,
        DispatchResult::ActiveRunExists { .. } => StatusCode::CONFLICT,
        DispatchResult::SkippedLocked | DispatchResult::AlreadySent | DispatchResult::AlreadyProcessed => {
            StatusCode::OK
        }
    };

    Ok((
        status,
        Json(WebhookInboundResponse {
            message_id: message.id,
            dispatch,
        }),
    ))
}
