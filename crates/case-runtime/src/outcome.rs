//! Folds a [`PipelineOutcome`] back into store/ledger writes. Shared by the
//! fresh-run path ([`crate::engine`]) and the resume-after-decision path
//! ([`crate::decision`]) since both end up at the same three branches:
//! complete, gate, or auto-execute.

use case_core::{Case, CaseEvent, MessageId, PortalTask, PortalTaskId, PortalTaskStatus, ProposalStatus, RunId};
use case_executor::{DeadLetterSink, ProposalExecutor};
use case_pipeline::{PipelineOutcome, ProposalDraft};
use case_provider::ProviderRegistry;
use case_store::{CaseStore, NewProposal};
use chrono::Utc;
use serde_json::Value;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::execution;
use crate::metrics::RuntimeMetrics;
use crate::routing;
use crate::transition;

/// Apply `outcome` for `run_id`, ending with the run's terminal event.
///
/// `existing_proposal_key` carries the proposal identity forward across a
/// resume (`ADJUST` re-drafts under the same key rather than minting a new
/// one); `None` means this is the run's first proposal.
#[allow(clippy::too_many_arguments)]
pub async fn apply(
    store: &dyn CaseStore,
    executor: &ProposalExecutor,
    providers: &ProviderRegistry,
    dlq: &dyn DeadLetterSink,
    metrics: &RuntimeMetrics,
    config: &RuntimeConfig,
    case: &Case,
    run_id: RunId,
    trigger_message_id: Option<MessageId>,
    existing_proposal_key: Option<String>,
    outcome: PipelineOutcome,
) -> Result<(), RuntimeError> {
    match outcome {
        PipelineOutcome::Complete { portal_task } => {
            if let Some(intent) = portal_task {
                let now = Utc::now();
                let task = PortalTask {
                    id: PortalTaskId::new(),
                    case_id: case.id,
                    proposal_id: None,
                    execution_id: None,
                    portal_url: intent.portal_url.clone(),
                    content: None,
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
                        portal_url: intent.portal_url,
                        proposal_id: None,
                    },
                    &format!("portal_task_created:{}", created.id),
                    Value::Null,
                    false,
                )
                .await?;
            }
            finish_run(store, case.id, run_id).await
        }

        PipelineOutcome::Gated(draft) => {
            let proposal =
                upsert_draft(store, case.id, run_id, trigger_message_id, existing_proposal_key, &draft, ProposalStatus::PendingApproval)
                    .await?;
            gate_run(store, case.id, run_id, &proposal, draft.action_type).await
        }

        PipelineOutcome::AutoExecute(draft) => {
            let proposal =
                upsert_draft(store, case.id, run_id, trigger_message_id, existing_proposal_key, &draft, ProposalStatus::Approved)
                    .await?;

            if routing::needs_provider(draft.action_type)
                && store.recent_execution_count(case.id, config.rate_limit_window).await? >= config.rate_limit_max
            {
                metrics.increment_executions_rate_limited();
                return gate_run(store, case.id, run_id, &proposal, draft.action_type).await;
            }

            execution::claim_and_execute(store, executor, providers, dlq, metrics, case, &proposal).await?;
            finish_run(store, case.id, run_id).await
        }
    }
}

async fn upsert_draft(
    store: &dyn CaseStore,
    case_id: case_core::CaseId,
    run_id: RunId,
    trigger_message_id: Option<MessageId>,
    existing_proposal_key: Option<String>,
    draft: &ProposalDraft,
    status: ProposalStatus,
) -> Result<case_core::Proposal, RuntimeError> {
    let proposal_key =
        existing_proposal_key.unwrap_or_else(|| case_core::Proposal::build_key(case_id, trigger_message_id, draft.action_type, 0));

    let proposal = store
        .upsert_proposal(NewProposal {
            case_id,
            run_id,
            proposal_key,
            action_type: draft.action_type,
            trigger_message_id,
            draft_subject: draft.draft_subject.clone(),
            draft_body: draft.draft_body.clone(),
            reasoning: draft.reasoning.clone(),
            confidence: draft.confidence,
            risk_flags: draft.risk_flags.clone(),
            warnings: draft.warnings.clone(),
            can_auto_execute: draft.can_auto_execute,
            requires_human: draft.requires_human,
            pause_reason: draft.pause_reason,
            status,
            pipeline_state: Some(draft.pipeline_state.clone()),
        })
        .await?;
    Ok(proposal)
}

/// Pauses the run on `RUN_WAITING` after gating the proposal for a human.
async fn gate_run(
    store: &dyn CaseStore,
    case_id: case_core::CaseId,
    run_id: RunId,
    proposal: &case_core::Proposal,
    action_type: case_core::ActionType,
) -> Result<(), RuntimeError> {
    transition::apply_event(
        store,
        case_id,
        CaseEvent::ProposalGated { proposal_id: proposal.id, action_type },
        &format!("proposal_gated:{}", proposal.id),
        Value::Null,
        false,
    )
    .await?;
    transition::apply_event(
        store,
        case_id,
        CaseEvent::RunWaiting { run_id },
        &format!("run_waiting:{run_id}"),
        Value::Null,
        false,
    )
    .await?;
    Ok(())
}

async fn finish_run(store: &dyn CaseStore, case_id: case_core::CaseId, run_id: RunId) -> Result<(), RuntimeError> {
    transition::apply_event(
        store,
        case_id,
        CaseEvent::RunCompleted { run_id },
        &format!("run_completed:{run_id}"),
        Value::Null,
        false,
    )
    .await?;
    Ok(())
}
