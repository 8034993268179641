//! Claims and carries out a single proposal's side effect (C6/C7): claims
//! the `execution_key`, creates the `executions` row, dispatches to a
//! provider (or skips straight to `Skipped` for actions with none), and
//! folds the result back through the reducer.

use case_core::{Case, CaseEvent, Proposal};
use case_core::{ExecutionStatus, PortalTask, PortalTaskId, PortalTaskStatus, ProviderKind};
use case_executor::{DeadLetterJob, DeadLetterSink, ExecutionOutcome, ProposalExecutor};
use case_provider::ProviderRegistry;
use case_store::{CaseStore, NewExecution};
use chrono::Utc;
use serde_json::Value;

use crate::error::RuntimeError;
use crate::metrics::RuntimeMetrics;
use crate::routing;
use crate::transition;

/// Claim and execute `proposal`'s action. Returns `Ok(())` whether the send
/// succeeded, was skipped, or exhausted its retries and went to the DLQ —
/// only store/reducer failures propagate as an `Err`, matching how a
/// `RUN_COMPLETED` still fires after a gracefully-handled provider failure.
#[allow(clippy::too_many_arguments)]
pub async fn claim_and_execute(
    store: &dyn CaseStore,
    executor: &ProposalExecutor,
    providers: &ProviderRegistry,
    dlq: &dyn DeadLetterSink,
    metrics: &RuntimeMetrics,
    case: &Case,
    proposal: &Proposal,
) -> Result<(), RuntimeError> {
    let provider_kind = routing::provider_kind_for(proposal.action_type);
    let execution_key = format!("exec:{}", proposal.proposal_key);

    if !store.claim_execution(proposal.id, &execution_key).await? {
        // Another worker already claimed this proposal's side effect —
        // nothing left for this run to do (invariant I6).
        return Ok(());
    }

    let execution = store
        .create_execution(NewExecution {
            case_id: case.id,
            proposal_id: proposal.id,
            run_id: proposal.run_id,
            execution_key: execution_key.clone(),
            action_type: proposal.action_type,
            provider: provider_kind,
        })
        .await?;

    match provider_kind {
        ProviderKind::None => {
            store
                .update_execution_status(execution.id, ExecutionStatus::Skipped, None, None)
                .await?;
            transition::apply_event(
                store,
                case.id,
                CaseEvent::ProposalExecuted { proposal_id: proposal.id, execution_id: execution.id },
                &format!("proposal_executed:{}", proposal.id),
                Value::Null,
                false,
            )
            .await?;
            if let Some(event) = routing::terminal_event_for(proposal.action_type) {
                transition::apply_event(
                    store,
                    case.id,
                    event,
                    &format!("internal_action_completed:{}", execution.id),
                    Value::Null,
                    false,
                )
                .await?;
            }
            metrics.increment_executions_skipped();
        }
        ProviderKind::Email | ProviderKind::Portal => {
            let provider_name = routing::provider_name_for(provider_kind);
            let Some(provider) = providers.get(provider_name) else {
                store
                    .update_execution_status(
                        execution.id,
                        ExecutionStatus::Failed,
                        None,
                        Some(format!("no provider registered for {provider_name:?}")),
                    )
                    .await?;
                return Err(RuntimeError::ProviderNotFound(provider_name.to_string()));
            };
            let message = routing::build_outbound_message(case, proposal, &execution_key);

            match executor.execute(&message, provider.as_ref()).await {
                ExecutionOutcome::Sent(outcome) => {
                    let status = outcome.status;
                    store
                        .update_execution_status(
                            execution.id,
                            status,
                            outcome.provider_message_id.clone(),
                            None,
                        )
                        .await?;

                    match (provider_kind, status) {
                        (ProviderKind::Email, _) => {
                            transition::apply_event(
                                store,
                                case.id,
                                CaseEvent::ProposalExecuted { proposal_id: proposal.id, execution_id: execution.id },
                                &format!("proposal_executed:{}", proposal.id),
                                Value::Null,
                                false,
                            )
                            .await?;
                            transition::apply_event(
                                store,
                                case.id,
                                CaseEvent::EmailSent { provider_message_id: outcome.provider_message_id.clone() },
                                &format!("email_sent:{}", execution.id),
                                Value::Null,
                                false,
                            )
                            .await?;
                        }
                        (ProviderKind::Portal, ExecutionStatus::Sent) => {
                            transition::apply_event(
                                store,
                                case.id,
                                CaseEvent::ProposalExecuted { proposal_id: proposal.id, execution_id: execution.id },
                                &format!("proposal_executed:{}", proposal.id),
                                Value::Null,
                                false,
                            )
                            .await?;
                            transition::apply_event(
                                store,
                                case.id,
                                CaseEvent::PortalCompleted {
                                    confirmation_number: outcome.provider_message_id.clone(),
                                },
                                &format!("portal_completed:{}", execution.id),
                                Value::Null,
                                false,
                            )
                            .await?;
                        }
                        (ProviderKind::Portal, ExecutionStatus::PendingHuman) => {
                            // A human must finish the submission themselves — the
                            // proposal stays PENDING_PORTAL (not EXECUTED) until a
                            // later PORTAL_COMPLETED closes the task.
                            let now = Utc::now();
                            let task = PortalTask {
                                id: PortalTaskId::new(),
                                case_id: case.id,
                                proposal_id: Some(proposal.id),
                                execution_id: Some(execution.id),
                                portal_url: message.portal_url.clone().unwrap_or_default(),
                                content: message.body.clone(),
                                instructions: None,
                                status: PortalTaskStatus::Pending,
                                assignee: None,
                                confirmation_number: None,
                                created_at: now,
                                updated_at: now,
                            };
                            let created = store.create_portal_task(task).await?;
                            transition::apply_event(
                                store,
                                case.id,
                                CaseEvent::PortalTaskCreated {
                                    portal_task_id: created.id,
                                    portal_url: created.portal_url.clone(),
                                    proposal_id: Some(proposal.id),
                                },
                                &format!("portal_task_created:{}", created.id),
                                Value::Null,
                                false,
                            )
                            .await?;
                        }
                        _ => {
                            // Any other (provider, status) pairing isn't produced by
                            // a real provider today; still record completion rather
                            // than leave the proposal without a terminal status.
                            transition::apply_event(
                                store,
                                case.id,
                                CaseEvent::ProposalExecuted { proposal_id: proposal.id, execution_id: execution.id },
                                &format!("proposal_executed:{}", proposal.id),
                                Value::Null,
                                false,
                            )
                            .await?;
                        }
                    }
                    metrics.increment_executions_sent();
                }
                ExecutionOutcome::Failed { code, message: err_message, attempts, .. } => {
                    store
                        .update_execution_status(execution.id, ExecutionStatus::Failed, None, Some(err_message.clone()))
                        .await?;

                    // The executor only returns `Failed` once its own retry
                    // budget is spent, so the reducer sees this attempt as
                    // final regardless of how `retryable` the last error was.
                    let event = match provider_kind {
                        ProviderKind::Email => CaseEvent::EmailFailed { error: err_message.clone() },
                        ProviderKind::Portal => CaseEvent::PortalFailed { error: err_message.clone() },
                        ProviderKind::None => unreachable!("providerless actions never reach the executor"),
                    };
                    transition::apply_event(
                        store,
                        case.id,
                        event,
                        &format!("execution_failed:{}", execution.id),
                        Value::Null,
                        true,
                    )
                    .await?;

                    dlq.push(
                        DeadLetterJob {
                            queue_name: "execution".to_string(),
                            job_id: execution_key.clone(),
                            case_id: Some(case.id),
                            job_data: serde_json::json!({
                                "action_type": proposal.action_type,
                                "code": code,
                                "attempts": attempts,
                            }),
                        },
                        err_message,
                        attempts,
                    )
                    .await;
                    metrics.increment_executions_failed();
                }
            }
        }
    }

    Ok(())
}
