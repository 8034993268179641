use case_core::{
    CaseEvent, CaseId, CaseSnapshot, CaseStatus, ExecutionStatus, FollowupMutation, FollowupStatus,
    Mutations, PauseReason, Patch, PortalTaskMutation, PortalTaskStatus, Projection,
    ProposalMutation, ProposalStatus, RunMutation, RunStatus,
};

use crate::context::ReducerContext;
use crate::error::ReducerError;

/// The pure case-event reducer (spec §4.1, component C2).
///
/// `(snapshot, event, ctx) -> (mutations, projection)`. Total over
/// [`CaseEvent`]; performs no I/O; never panics. Safety nets are applied
/// last, via [`crate::safety_net::apply`].
pub fn reduce(
    snapshot: &CaseSnapshot,
    event: &CaseEvent,
    ctx: ReducerContext,
) -> Result<(Mutations, Projection), ReducerError> {
    let was_review_before = snapshot.case.status.is_review();
    let mut mutations = Mutations::default();

    apply_event(snapshot, event, ctx, &mut mutations)?;

    let resulting_status = mutations.case.status.clone().into_option().unwrap_or(snapshot.case.status);
    let resulting_requires_human = mutations
        .case
        .requires_human
        .into_option()
        .unwrap_or(snapshot.case.requires_human);
    let resulting_pause_reason = mutations
        .case
        .pause_reason
        .clone()
        .into_option()
        .unwrap_or(snapshot.case.pause_reason);

    crate::safety_net::apply(
        &mut mutations,
        resulting_status,
        resulting_requires_human,
        resulting_pause_reason,
        was_review_before,
    );

    let projection = build_projection(snapshot, &mutations);
    Ok((mutations, projection))
}

fn apply_event(
    snapshot: &CaseSnapshot,
    event: &CaseEvent,
    ctx: ReducerContext,
    m: &mut Mutations,
) -> Result<(), ReducerError> {
    let case_id = snapshot.case.id;
    match event {
        CaseEvent::CaseSent => {
            m.case.status = Patch::Set(CaseStatus::Sent);
            m.case.send_date = Patch::Set(Some(ctx.now));
        }
        CaseEvent::PortalStarted => {
            m.case.status = Patch::Set(CaseStatus::PortalInProgress);
        }
        CaseEvent::PortalCompleted { confirmation_number } => {
            if let Some(task) = active_portal_task(snapshot) {
                m.portal_tasks.push(PortalTaskMutation {
                    portal_task_id: task.id,
                    status: Patch::Set(PortalTaskStatus::Completed),
                    confirmation_number: Patch::Set(confirmation_number.clone()),
                });
                if let Some(proposal_id) = task.proposal_id {
                    m.proposals.push(ProposalMutation { proposal_id, status: Patch::Set(ProposalStatus::Executed) });
                }
            }
            m.case.status = Patch::Set(CaseStatus::Sent);
            m.case.send_date = Patch::Set(Some(ctx.now));
        }
        CaseEvent::PortalFailed { error } => {
            if ctx.retries_exhausted {
                gate_for_run_failure(m, error.clone());
            }
        }
        CaseEvent::PortalTimedOut => {
            if ctx.retries_exhausted {
                gate_for_run_failure(m, "portal submission timed out".to_string());
            }
        }
        CaseEvent::PortalAborted => {
            if let Some(task) = active_portal_task(snapshot) {
                m.portal_tasks.push(PortalTaskMutation {
                    portal_task_id: task.id,
                    status: Patch::Set(PortalTaskStatus::Cancelled),
                    confirmation_number: Patch::Unchanged,
                });
                if task.proposal_id.is_some() {
                    m.proposals_dismiss_portal = true;
                }
            }
        }
        CaseEvent::PortalTaskCreated { portal_task_id, portal_url: _, proposal_id } => {
            m.portal_tasks.push(PortalTaskMutation {
                portal_task_id: *portal_task_id,
                status: Patch::Set(PortalTaskStatus::Pending),
                confirmation_number: Patch::Unchanged,
            });
            m.case.status = Patch::Set(CaseStatus::PortalInProgress);
            m.case.substatus = Patch::Set(Some("portal_redirect".to_string()));
            if let Some(proposal_id) = proposal_id {
                m.proposals.push(ProposalMutation { proposal_id: *proposal_id, status: Patch::Set(ProposalStatus::PendingPortal) });
            }
        }
        CaseEvent::PortalStuck { portal_task_id } => {
            m.portal_tasks.push(PortalTaskMutation {
                portal_task_id: *portal_task_id,
                status: Patch::Set(PortalTaskStatus::Stuck),
                confirmation_number: Patch::Unchanged,
            });
            m.case.status = Patch::Set(CaseStatus::NeedsHumanReview);
            m.case.pause_reason = Patch::Set(Some(PauseReason::PortalStuck));
            m.proposals_dismiss_portal = true;
        }
        CaseEvent::EmailSent { provider_message_id: _ } => {
            m.case.status = Patch::Set(CaseStatus::Sent);
            m.case.send_date = Patch::Set(Some(ctx.now));
        }
        CaseEvent::EmailFailed { error } => {
            if ctx.retries_exhausted {
                gate_for_run_failure(m, error.clone());
            }
        }
        CaseEvent::FeeQuoteReceived { fee_amount } => {
            m.case.substatus = Patch::Set(Some(format!("fee_quote_received:{fee_amount}")));
        }
        CaseEvent::AcknowledgmentReceived => {
            m.case.substatus = Patch::Set(Some("acknowledged".to_string()));
        }
        CaseEvent::CaseResponded { message_id: _ } => {
            m.case.status = Patch::Set(CaseStatus::Responded);
            m.case.last_response_date = Patch::Set(Some(ctx.now));
        }
        CaseEvent::CaseWrongAgency => {
            m.case.substatus = Patch::Set(Some("wrong_agency".to_string()));
        }
        CaseEvent::CaseEscalated { reason } => {
            m.case.status = Patch::Set(CaseStatus::NeedsPhoneCall);
            m.case.pause_reason = Patch::Set(Some(PauseReason::PhoneCallNeeded));
            m.case.substatus = Patch::Set(Some(reason.clone()));
        }
        CaseEvent::CaseReconciled => {
            m.case.requires_human = Patch::Set(false);
            m.case.pause_reason = Patch::Set(None);
            m.case.substatus = Patch::Set(None);
        }
        CaseEvent::CaseCompleted => {
            m.case.status = Patch::Set(CaseStatus::Completed);
        }
        CaseEvent::CaseCancelled { reason } => {
            m.case.status = Patch::Set(CaseStatus::Cancelled);
            m.case.substatus = Patch::Set(Some(reason.clone()));
        }
        CaseEvent::RunClaimed { run_id } => {
            let run = snapshot
                .active_run
                .as_ref()
                .filter(|r| r.id == *run_id)
                .ok_or(ReducerError::NoActiveRun { case_id })?;
            m.runs.push(RunMutation { run_id: run.id, status: Patch::Set(RunStatus::Running), ended_at: Patch::Unchanged });
            m.agent_runs_cancel_others = Some(*run_id);
        }
        CaseEvent::RunWaiting { run_id } => {
            m.runs.push(RunMutation { run_id: *run_id, status: Patch::Set(RunStatus::Waiting), ended_at: Patch::Unchanged });
        }
        CaseEvent::RunCompleted { run_id } => {
            m.runs.push(RunMutation { run_id: *run_id, status: Patch::Set(RunStatus::Completed), ended_at: Patch::Set(ctx.now) });
        }
        CaseEvent::RunFailed { run_id, error: _ } => {
            m.runs.push(RunMutation { run_id: *run_id, status: Patch::Set(RunStatus::Failed), ended_at: Patch::Set(ctx.now) });
        }
        CaseEvent::RunStaleCleaned { run_id } => {
            m.runs.push(RunMutation { run_id: *run_id, status: Patch::Set(RunStatus::Failed), ended_at: Patch::Set(ctx.now) });
            m.clear_requires_human_after_stale_run = true;
            // Only clear case-level flags when nothing else already demands
            // human attention (spec §4.4 step 8: "if the reason was purely
            // run-failure").
            if snapshot.case.pause_reason.is_none() || snapshot.case.pause_reason == Some(PauseReason::RunFailure) {
                m.case.requires_human = Patch::Set(false);
                m.case.pause_reason = Patch::Set(None);
            }
        }
        CaseEvent::ProposalGated { proposal_id, action_type } => {
            find_proposal(snapshot, *proposal_id)?;
            m.proposals.push(ProposalMutation { proposal_id: *proposal_id, status: Patch::Set(ProposalStatus::PendingApproval) });
            let pause_reason = action_type.policy().default_pause_reason.unwrap_or(PauseReason::Unspecified);
            m.case.status = Patch::Set(if pause_reason == PauseReason::FeeQuote {
                CaseStatus::NeedsHumanFeeApproval
            } else {
                CaseStatus::NeedsHumanReview
            });
            m.case.pause_reason = Patch::Set(Some(pause_reason));
            m.case.requires_human = Patch::Set(true);
        }
        CaseEvent::ProposalApproved { proposal_id, decision: _ } => {
            find_proposal(snapshot, *proposal_id)?;
            m.proposals.push(ProposalMutation { proposal_id: *proposal_id, status: Patch::Set(ProposalStatus::Approved) });
        }
        CaseEvent::ProposalDismissed { proposal_id, decision: _ } => {
            find_proposal(snapshot, *proposal_id)?;
            m.proposals.push(ProposalMutation { proposal_id: *proposal_id, status: Patch::Set(ProposalStatus::Dismissed) });
            m.case.status = Patch::Set(CaseStatus::AwaitingResponse);
            m.case.requires_human = Patch::Set(false);
            m.case.pause_reason = Patch::Set(None);
            m.case.substatus = Patch::Set(Some("dismissed".to_string()));
        }
        CaseEvent::ProposalExecuted { proposal_id, execution_id: _ } => {
            find_proposal(snapshot, *proposal_id)?;
            m.proposals.push(ProposalMutation { proposal_id: *proposal_id, status: Patch::Set(ProposalStatus::Executed) });
        }
        CaseEvent::ProposalBlocked { proposal_id, reason } => {
            find_proposal(snapshot, *proposal_id)?;
            m.proposals.push(ProposalMutation { proposal_id: *proposal_id, status: Patch::Set(ProposalStatus::Blocked) });
            m.case.status = Patch::Set(CaseStatus::NeedsHumanReview);
            m.case.pause_reason = Patch::Set(Some(PauseReason::Unspecified));
            m.case.substatus = Patch::Set(Some(reason.clone()));
        }
        CaseEvent::ProposalCancelled { proposal_id } => {
            find_proposal(snapshot, *proposal_id)?;
            m.proposals.push(ProposalMutation { proposal_id: *proposal_id, status: Patch::Set(ProposalStatus::Superseded) });
        }
        CaseEvent::StaleFlagsCleared => {
            if snapshot.case.status.is_review() {
                return Err(ReducerError::InvalidStaleFlagsClear { case_id });
            }
            m.case.requires_human = Patch::Set(false);
            m.case.pause_reason = Patch::Set(None);
            m.case.substatus = Patch::Set(None);
        }
        CaseEvent::StuckPortalTaskFailed { portal_task_id } => {
            m.portal_tasks.push(PortalTaskMutation {
                portal_task_id: *portal_task_id,
                status: Patch::Set(PortalTaskStatus::Failed),
                confirmation_number: Patch::Unchanged,
            });
            m.case.status = Patch::Set(CaseStatus::NeedsHumanReview);
            m.case.pause_reason = Patch::Set(Some(PauseReason::PortalStuck));
            m.case.requires_human = Patch::Set(true);
        }
    }
    Ok(())
}

fn gate_for_run_failure(m: &mut Mutations, reason: String) {
    m.case.status = Patch::Set(CaseStatus::NeedsHumanReview);
    m.case.pause_reason = Patch::Set(Some(PauseReason::RunFailure));
    m.case.requires_human = Patch::Set(true);
    m.case.substatus = Patch::Set(Some(reason));
}

fn active_portal_task(snapshot: &CaseSnapshot) -> Option<&case_core::PortalTask> {
    snapshot
        .portal_tasks
        .iter()
        .find(|t| matches!(t.status, PortalTaskStatus::Pending | PortalTaskStatus::InProgress))
}

fn find_proposal(
    snapshot: &CaseSnapshot,
    proposal_id: case_core::ProposalId,
) -> Result<&case_core::Proposal, ReducerError> {
    snapshot
        .proposals
        .iter()
        .find(|p| p.id == proposal_id)
        .ok_or(ReducerError::ProposalNotFound { case_id: snapshot.case.id, proposal_id })
}

fn build_projection(snapshot: &CaseSnapshot, m: &Mutations) -> Projection {
    let case_status = m.case.status.clone().into_option().unwrap_or(snapshot.case.status);
    let requires_human = m.case.requires_human.into_option().unwrap_or(snapshot.case.requires_human);
    let pause_reason = m.case.pause_reason.clone().into_option().unwrap_or(snapshot.case.pause_reason);
    let active_run_id = snapshot.active_run.as_ref().map(|r| r.id);
    let active_proposal_id = snapshot.active_proposal().map(|p| p.id);
    Projection {
        case_status,
        requires_human,
        pause_reason,
        active_run_id,
        active_proposal_id,
        last_action_type: None,
    }
}
