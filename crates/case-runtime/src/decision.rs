//! `POST /proposals/{id}/decision` (C4 resume path, spec §4.5's
//! `applyDecision`): `APPROVE`/`ADJUST` re-enter the Decision Pipeline via
//! [`case_pipeline::resume`]; `DISMISS` is applied directly as a
//! `PROPOSAL_DISMISSED` reducer event and never reaches `resume()`, per
//! that function's own contract.

use case_core::{CaseEvent, DecisionAction, HumanDecision, ProposalId, ProposalStatus, RunTrigger};
use case_executor::{DeadLetterSink, ProposalExecutor};
use case_pipeline::SafetyPolicy;
use case_provider::ProviderRegistry;
use case_store::CreateRunOutcome;
use serde_json::Value;
use tracing::instrument;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::metrics::RuntimeMetrics;
use crate::outcome;
use crate::transition;
use crate::{lock_name_for, SharedLock, SharedStore};

/// Apply a human decision against a pending proposal. Returns the id of the
/// resume run created to carry it out.
#[allow(clippy::too_many_arguments)]
#[instrument(skip(store, lock, executor, providers, dlq, safety_policy, metrics, config, decision), fields(proposal_id = %proposal_id))]
pub async fn post_decision(
    store: &SharedStore,
    lock: &SharedLock,
    executor: &ProposalExecutor,
    providers: &ProviderRegistry,
    dlq: &dyn DeadLetterSink,
    safety_policy: &SafetyPolicy,
    metrics: &RuntimeMetrics,
    config: &RuntimeConfig,
    proposal_id: ProposalId,
    decision: HumanDecision,
) -> Result<case_core::RunId, RuntimeError> {
    let proposal = store.get_proposal(proposal_id).await?.ok_or(RuntimeError::ProposalNotFound(proposal_id))?;
    if proposal.status != ProposalStatus::PendingApproval {
        return Err(RuntimeError::ProposalAlreadyDecided { proposal_id, status: proposal.status });
    }

    let case = store.get_case(proposal.case_id).await?.ok_or(RuntimeError::CaseNotFound(proposal.case_id))?;

    let run = match store
        .create_run(case.id, RunTrigger::Resume, proposal.trigger_message_id, None, case.autopilot_mode, config.lock_ttl)
        .await?
    {
        CreateRunOutcome::CaseNotFound => return Err(RuntimeError::CaseNotFound(case.id)),
        CreateRunOutcome::AlreadySent => return Err(RuntimeError::CaseTerminal(case.id)),
        CreateRunOutcome::ActiveRunExists(_) => return Err(RuntimeError::ActiveRunExists),
        CreateRunOutcome::Created(run) => run,
    };
    let run_id = run.id;

    let lock_name = lock_name_for(case.id);
    let guard = lock
        .acquire(&lock_name, config.lock_ttl, config.lock_acquire_timeout)
        .await
        .map_err(|_| RuntimeError::ActiveRunExists)?;

    let result =
        resume_claimed(store, executor, providers, dlq, safety_policy, metrics, config, &case, run_id, &proposal, &decision).await;

    let _ = guard.release().await;

    result.map(|()| run_id)
}

#[allow(clippy::too_many_arguments)]
async fn resume_claimed(
    store: &SharedStore,
    executor: &ProposalExecutor,
    providers: &ProviderRegistry,
    dlq: &dyn DeadLetterSink,
    safety_policy: &SafetyPolicy,
    metrics: &RuntimeMetrics,
    config: &RuntimeConfig,
    case: &case_core::Case,
    run_id: case_core::RunId,
    proposal: &case_core::Proposal,
    decision: &HumanDecision,
) -> Result<(), RuntimeError> {
    transition::apply_event(
        store.as_ref(),
        case.id,
        CaseEvent::RunClaimed { run_id },
        &format!("run_claimed:{run_id}"),
        Value::Null,
        false,
    )
    .await?;

    match decision.action {
        DecisionAction::Dismiss => {
            transition::apply_event(
                store.as_ref(),
                case.id,
                CaseEvent::ProposalDismissed { proposal_id: proposal.id, decision: decision.clone() },
                &format!("proposal_dismissed:{}", proposal.id),
                Value::Null,
                false,
            )
            .await?;
            transition::apply_event(
                store.as_ref(),
                case.id,
                CaseEvent::RunCompleted { run_id },
                &format!("run_completed:{run_id}"),
                Value::Null,
                false,
            )
            .await?;
            metrics.increment_runs_completed();
            Ok(())
        }
        DecisionAction::Approve | DecisionAction::Adjust => {
            transition::apply_event(
                store.as_ref(),
                case.id,
                CaseEvent::ProposalApproved { proposal_id: proposal.id, decision: decision.clone() },
                &format!("proposal_approved:{}", proposal.id),
                Value::Null,
                false,
            )
            .await?;

            match case_pipeline::resume(proposal, decision, safety_policy) {
                Ok(pipeline_outcome) => {
                    let applied = outcome::apply(
                        store.as_ref(),
                        executor,
                        providers,
                        dlq,
                        metrics,
                        config,
                        case,
                        run_id,
                        proposal.trigger_message_id,
                        Some(proposal.proposal_key.clone()),
                        pipeline_outcome,
                    )
                    .await;

                    match applied {
                        Ok(()) => {
                            metrics.increment_runs_completed();
                            Ok(())
                        }
                        Err(err) => {
                            fail_run(store.as_ref(), case.id, run_id, &err).await;
                            metrics.increment_runs_failed();
                            Err(err)
                        }
                    }
                }
                Err(pipeline_err) => {
                    let err = RuntimeError::Pipeline(pipeline_err);
                    fail_run(store.as_ref(), case.id, run_id, &err).await;
                    metrics.increment_runs_failed();
                    Err(err)
                }
            }
        }
    }
}

async fn fail_run(store: &dyn case_store::CaseStore, case_id: case_core::CaseId, run_id: case_core::RunId, err: &RuntimeError) {
    let _ = transition::apply_event(
        store,
        case_id,
        CaseEvent::RunFailed { run_id, error: err.to_string() },
        &format!("run_failed:{run_id}"),
        Value::Null,
        false,
    )
    .await;
}
