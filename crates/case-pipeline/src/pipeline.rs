//! The node graph itself: `load_context -> classify_inbound ->
//! update_constraints -> decide_next_action -> draft_response ->
//! safety_check -> gate_or_execute -> [execute_action | commit_state]`
//! (spec §4.3, component C5).
//!
//! Only `load_context` (reading the snapshot, already done by the caller)
//! and `classify_inbound` touch anything outside this crate; the rest is
//! pure state-machine logic over [`PipelineState`]. `execute_action` and
//! `commit_state` are the caller's (`case-runtime`'s) job — this module
//! hands back a [`PipelineOutcome`] describing which of those two paths to
//! take and with what payload.

use case_core::{
    ActionType, CaseSnapshot, DecisionAction, HumanDecision, Message, PauseReason, Proposal,
    ProposalStatus, RunId, RunTrigger, SubmissionChannel,
};
use serde_json::Value;
use tracing::instrument;

use crate::classifier::{Classifier, ClassifierInput};
use crate::draft::draft_response;
use crate::error::PipelineError;
use crate::gating::{gate_or_execute, GateDecision};
use crate::routing::{decide_next_action, FeeThresholds};
use crate::safety::SafetyPolicy;
use crate::state::PipelineState;

/// A human work item to hand to `case-portal`/the store when the run
/// completed by recognizing a portal redirect (spec §4.3 step 4).
#[derive(Debug, Clone)]
pub struct PortalTaskIntent {
    pub portal_url: String,
}

/// Everything needed to persist a proposal — gated or auto-executed.
#[derive(Debug, Clone)]
pub struct ProposalDraft {
    pub action_type: ActionType,
    pub draft_subject: Option<String>,
    pub draft_body: Option<String>,
    pub reasoning: Vec<String>,
    pub confidence: Option<f64>,
    pub risk_flags: Vec<String>,
    pub warnings: Vec<String>,
    pub can_auto_execute: bool,
    pub requires_human: bool,
    pub pause_reason: Option<PauseReason>,
    /// The checkpointed [`PipelineState`], to persist as the proposal's
    /// `pipeline_state` column for a future resume.
    pub pipeline_state: Value,
}

/// What the caller should do after a pipeline run.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// `action = NONE`, nothing further to draft or execute this run.
    Complete { portal_task: Option<PortalTaskIntent> },
    /// Gated: persist as `PENDING_APPROVAL` and pause the run.
    Gated(ProposalDraft),
    /// Cleared for immediate execution by `case-executor`.
    AutoExecute(ProposalDraft),
}

/// Run the pipeline from `load_context` through `gate_or_execute` for a
/// fresh (non-resumed) run.
#[instrument(skip(snapshot, classifier, triggering_message), fields(case_id = %snapshot.case.id, run_id = %run_id))]
#[allow(clippy::too_many_arguments)]
pub async fn run(
    snapshot: &CaseSnapshot,
    run_id: RunId,
    trigger: RunTrigger,
    triggering_message: Option<&Message>,
    classifier: &dyn Classifier,
    thresholds: FeeThresholds,
    safety_policy: &SafetyPolicy,
) -> Result<PipelineOutcome, PipelineError> {
    let mut state = load_context(snapshot, run_id, trigger, triggering_message);

    if trigger == RunTrigger::InitialRequest {
        state.action_type = initial_action_for_channel(snapshot.case.submission_channel);
        state.requires_response = true;
        state.log("initial request run; no inbound message to classify");
    } else {
        classify_inbound(&mut state, triggering_message, classifier).await;
        update_constraints(&mut state, snapshot);
        decide_next_action(&mut state, thresholds);

        if state.is_complete {
            return Ok(finish_complete(&state));
        }
    }

    draft_response(&mut state);
    run_safety_check(&mut state, safety_policy);

    finalize(state)
}

/// Resume a paused run after a human decision. `APPROVE` proceeds straight
/// to execution; `ADJUST` re-enters at `draft_response` with the
/// instruction appended to state; `DISMISS` is handled by the caller
/// directly (it is a pure reducer event — spec §4.3 resume semantics — and
/// never re-enters the pipeline).
pub fn resume(
    proposal: &Proposal,
    decision: &HumanDecision,
    safety_policy: &SafetyPolicy,
) -> Result<PipelineOutcome, PipelineError> {
    let checkpoint = proposal.pipeline_state.clone().ok_or(PipelineError::MissingCheckpoint)?;
    let mut state = PipelineState::from_checkpoint(checkpoint)?;

    match decision.action {
        DecisionAction::Approve => {
            state.reason("human approved; proceeding to execution".to_string());
            Ok(PipelineOutcome::AutoExecute(build_draft(&state)))
        }
        DecisionAction::Adjust => {
            state.adjustment_instruction = decision.instruction.clone();
            draft_response(&mut state);
            run_safety_check(&mut state, safety_policy);
            finalize(state)
        }
        DecisionAction::Dismiss => {
            // Caller should never route DISMISS here; guard defensively so
            // a misrouted call still degrades to a gate rather than an
            // incorrect auto-execution.
            state.reason("dismiss decision reached resume(); gating defensively".to_string());
            Ok(PipelineOutcome::Gated(build_draft(&state)))
        }
    }
}

/// Which action opens a case's first run depends on how it must be filed:
/// a portal-only case has no recipient email to send to, so its initial
/// request is a portal submission rather than an outbound message.
fn initial_action_for_channel(channel: SubmissionChannel) -> ActionType {
    match channel {
        SubmissionChannel::Portal => ActionType::SubmitPortal,
        SubmissionChannel::Email | SubmissionChannel::Both | SubmissionChannel::Manual => {
            ActionType::SendInitialRequest
        }
    }
}

fn load_context(
    snapshot: &CaseSnapshot,
    run_id: RunId,
    trigger: RunTrigger,
    triggering_message: Option<&Message>,
) -> PipelineState {
    let mut state = PipelineState::new(
        snapshot.case.id,
        run_id,
        trigger,
        triggering_message.map(|m| m.id),
        snapshot.case.autopilot_mode,
    );
    state.constraints = snapshot.case.constraints.clone();
    state.scope_items = snapshot.case.scope_items.clone();
    state.log("context loaded from case snapshot");
    state
}

async fn classify_inbound(
    state: &mut PipelineState,
    triggering_message: Option<&Message>,
    classifier: &dyn Classifier,
) {
    let Some(message) = triggering_message else {
        state.log("no triggering message for this run; skipping classification");
        return;
    };

    let output = classifier
        .classify(ClassifierInput { message_body: &message.body, message_subject: message.subject.as_deref() })
        .await;

    state.requires_response = output.requires_response;
    state.classification = Some(output.classification);
    state.denial_subtype = output.denial_subtype;
    state.fee_amount = output.fee_amount;
    state.portal_url = output.portal_url;
    state.key_points = output.key_points;
    state.log(format!("classified as {:?}", state.classification));
}

fn update_constraints(state: &mut PipelineState, snapshot: &CaseSnapshot) {
    state.prior_agency_research = snapshot
        .proposals
        .iter()
        .any(|p| p.action_type == ActionType::ResearchAgency && p.status == ProposalStatus::Executed);
}

fn run_safety_check(state: &mut PipelineState, safety_policy: &SafetyPolicy) {
    let Some(body) = state.draft_body.clone() else {
        return;
    };
    let (risk_flags, warnings) = safety_policy.check(state.action_type, &body);
    state.risk_flags = risk_flags;
    state.warnings = warnings;
}

fn finish_complete(state: &PipelineState) -> PipelineOutcome {
    let portal_task = (state.classification == Some(case_core::Classification::PortalRedirect))
        .then(|| state.portal_url.clone())
        .flatten()
        .map(|portal_url| PortalTaskIntent { portal_url });

    PipelineOutcome::Complete { portal_task }
}

fn finalize(state: PipelineState) -> Result<PipelineOutcome, PipelineError> {
    let draft = build_draft(&state);

    Ok(if draft.can_auto_execute {
        PipelineOutcome::AutoExecute(draft)
    } else {
        PipelineOutcome::Gated(draft)
    })
}

fn build_draft(state: &PipelineState) -> ProposalDraft {
    let decision = gate_or_execute(
        state.action_type,
        state.autopilot_mode,
        &state.risk_flags,
        state.forced_gate,
        state.action_pause_reason,
    );
    let (can_auto_execute, requires_human, pause_reason) = match decision {
        GateDecision::AutoExecute => (true, false, None),
        GateDecision::Gate(reason) => (false, true, reason),
    };

    ProposalDraft {
        action_type: state.action_type,
        draft_subject: state.draft_subject.clone(),
        draft_body: state.draft_body.clone(),
        reasoning: state.reasoning.clone(),
        confidence: state.confidence,
        risk_flags: state.risk_flags.clone(),
        warnings: state.warnings.clone(),
        can_auto_execute,
        requires_human,
        pause_reason,
        pipeline_state: state.checkpoint().unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_core::{
        AgencyIdentity, AutopilotMode, Case, CaseId, CaseStatus, MessageDirection, MessageId,
        SubmissionChannel, ThreadHeaders,
    };
    use chrono::Utc;

    use crate::classifier::{ClassifierOutput, FixedClassifier};

    fn case(autopilot_mode: AutopilotMode) -> Case {
        let now = Utc::now();
        Case {
            id: CaseId(1),
            submission_channel: SubmissionChannel::Email,
            agency: AgencyIdentity {
                name: "Test Agency".into(),
                jurisdiction: None,
                agency_email: Some("foia@agency.gov".into()),
                portal_url: None,
            },
            requested_records: vec![],
            status: CaseStatus::AwaitingResponse,
            substatus: None,
            requires_human: false,
            pause_reason: None,
            next_due_at: None,
            autopilot_mode,
            constraints: Value::Null,
            scope_items: Value::Null,
            send_date: None,
            last_response_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn snapshot(autopilot_mode: AutopilotMode) -> CaseSnapshot {
        CaseSnapshot { case: case(autopilot_mode), active_run: None, proposals: vec![], portal_tasks: vec![], followup: None }
    }

    fn inbound_message(body: &str) -> Message {
        Message {
            id: MessageId::new(),
            case_id: CaseId(1),
            direction: MessageDirection::Inbound,
            provider_message_id: Some("abc".into()),
            subject: Some("Re: request".into()),
            body: body.to_string(),
            headers: ThreadHeaders::default(),
            created_at: Utc::now(),
            processed_at: None,
            processed_run_id: None,
        }
    }

    #[tokio::test]
    async fn fee_fifty_in_auto_auto_executes() {
        let snap = snapshot(AutopilotMode::Auto);
        let message = inbound_message("Here is your fee quote.");
        let classifier = FixedClassifier(ClassifierOutput {
            requires_response: true,
            classification: case_core::Classification::FeeQuote,
            fee_amount: Some(50),
            ..ClassifierOutput::default()
        });
        let outcome = run(
            &snap,
            RunId::new(),
            RunTrigger::InboundMessage,
            Some(&message),
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
        )
        .await
        .unwrap();
        match outcome {
            PipelineOutcome::AutoExecute(draft) => {
                assert_eq!(draft.action_type, ActionType::AcceptFee);
                assert!(draft.can_auto_execute);
            }
            other => panic!("expected AutoExecute, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fee_seven_fifty_always_gates() {
        let snap = snapshot(AutopilotMode::Auto);
        let message = inbound_message("Here is your fee quote.");
        let classifier = FixedClassifier(ClassifierOutput {
            requires_response: true,
            classification: case_core::Classification::FeeQuote,
            fee_amount: Some(750),
            ..ClassifierOutput::default()
        });
        let outcome = run(
            &snap,
            RunId::new(),
            RunTrigger::InboundMessage,
            Some(&message),
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, PipelineOutcome::Gated(_)));
    }

    #[tokio::test]
    async fn portal_redirect_completes_with_portal_task() {
        let snap = snapshot(AutopilotMode::Auto);
        let message = inbound_message("Please submit at https://foia.chicago.gov.");
        let classifier = FixedClassifier(ClassifierOutput {
            requires_response: false,
            classification: case_core::Classification::PortalRedirect,
            portal_url: Some("https://foia.chicago.gov".into()),
            ..ClassifierOutput::default()
        });
        let outcome = run(
            &snap,
            RunId::new(),
            RunTrigger::InboundMessage,
            Some(&message),
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
        )
        .await
        .unwrap();
        match outcome {
            PipelineOutcome::Complete { portal_task } => {
                assert_eq!(portal_task.unwrap().portal_url, "https://foia.chicago.gov");
            }
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn initial_request_on_portal_only_case_submits_portal() {
        let mut snap = snapshot(AutopilotMode::Auto);
        snap.case.submission_channel = SubmissionChannel::Portal;
        snap.case.agency.agency_email = None;
        let classifier = FixedClassifier(ClassifierOutput::default());
        let outcome = run(
            &snap,
            RunId::new(),
            RunTrigger::InitialRequest,
            None,
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
        )
        .await
        .unwrap();
        match outcome {
            PipelineOutcome::AutoExecute(draft) => {
                assert_eq!(draft.action_type, ActionType::SubmitPortal);
                assert!(draft.draft_body.is_none());
            }
            other => panic!("expected AutoExecute, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn initial_request_on_email_case_sends_email() {
        let snap = snapshot(AutopilotMode::Auto);
        let classifier = FixedClassifier(ClassifierOutput::default());
        let outcome = run(
            &snap,
            RunId::new(),
            RunTrigger::InitialRequest,
            None,
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
        )
        .await
        .unwrap();
        match outcome {
            PipelineOutcome::AutoExecute(draft) => {
                assert_eq!(draft.action_type, ActionType::SendInitialRequest);
            }
            other => panic!("expected AutoExecute, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn medium_strength_denial_gates_with_rebuttal_even_in_auto() {
        let snap = snapshot(AutopilotMode::Auto);
        let message = inbound_message("Your request has been denied as exempt from release.");
        let classifier = FixedClassifier(ClassifierOutput {
            requires_response: true,
            classification: case_core::Classification::Denial,
            key_points: vec!["this is exempt from release".into()],
            ..ClassifierOutput::default()
        });
        let outcome = run(
            &snap,
            RunId::new(),
            RunTrigger::InboundMessage,
            Some(&message),
            &classifier,
            FeeThresholds::default(),
            &SafetyPolicy::default(),
        )
        .await
        .unwrap();
        match outcome {
            PipelineOutcome::Gated(draft) => {
                assert_eq!(draft.action_type, ActionType::SendRebuttal);
                assert!(draft.requires_human);
            }
            other => panic!("expected Gated, got {other:?}"),
        }
    }

    #[test]
    fn resume_adjust_reappends_instruction_and_regates() {
        let now = Utc::now();
        let mut state = PipelineState::new(CaseId(1), RunId::new(), RunTrigger::InboundMessage, None, AutopilotMode::Supervised);
        state.action_type = ActionType::ReformulateRequest;
        let proposal = Proposal {
            id: case_core::ProposalId::new(),
            case_id: CaseId(1),
            run_id: state.run_id,
            proposal_key: "k".into(),
            execution_key: None,
            action_type: ActionType::ReformulateRequest,
            trigger_message_id: None,
            draft_subject: None,
            draft_body: None,
            reasoning: vec![],
            confidence: None,
            risk_flags: vec![],
            warnings: vec![],
            can_auto_execute: false,
            requires_human: true,
            pause_reason: Some(PauseReason::Denial),
            status: ProposalStatus::PendingApproval,
            human_decision: None,
            pipeline_state: Some(state.checkpoint().unwrap()),
            created_at: now,
            updated_at: now,
        };
        let decision = HumanDecision {
            action: DecisionAction::Adjust,
            instruction: Some("soften the tone".to_string()),
            reason: None,
            decided_by: "reviewer@example.com".into(),
            decided_at: now,
        };
        let outcome = resume(&proposal, &decision, &SafetyPolicy::default()).unwrap();
        match outcome {
            PipelineOutcome::Gated(draft) => {
                assert!(draft.draft_body.unwrap().contains("soften the tone"));
            }
            other => panic!("expected Gated, got {other:?}"),
        }
    }

    #[test]
    fn resume_approve_goes_straight_to_execution() {
        let now = Utc::now();
        let mut state = PipelineState::new(CaseId(1), RunId::new(), RunTrigger::InboundMessage, None, AutopilotMode::Supervised);
        state.action_type = ActionType::AcceptFee;
        let proposal = Proposal {
            id: case_core::ProposalId::new(),
            case_id: CaseId(1),
            run_id: state.run_id,
            proposal_key: "k".into(),
            execution_key: None,
            action_type: ActionType::AcceptFee,
            trigger_message_id: None,
            draft_subject: None,
            draft_body: None,
            reasoning: vec![],
            confidence: None,
            risk_flags: vec![],
            warnings: vec![],
            can_auto_execute: false,
            requires_human: true,
            pause_reason: Some(PauseReason::FeeQuote),
            status: ProposalStatus::PendingApproval,
            human_decision: None,
            pipeline_state: Some(state.checkpoint().unwrap()),
            created_at: now,
            updated_at: now,
        };
        let decision = HumanDecision {
            action: DecisionAction::Approve,
            instruction: None,
            reason: None,
            decided_by: "reviewer@example.com".into(),
            decided_at: now,
        };
        let outcome = resume(&proposal, &decision, &SafetyPolicy::default()).unwrap();
        assert!(matches!(outcome, PipelineOutcome::AutoExecute(_)));
    }
}
