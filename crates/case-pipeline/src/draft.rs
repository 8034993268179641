//! `draft_response` — produces the outbound subject/body for an action.
//!
//! Content quality is explicitly a non-goal (spec §1): these are fixed,
//! deterministic templates, not an LLM call. A production deployment would
//! inject a drafting collaborator the same way [`crate::Classifier`] is
//! injected; no such interface is defined here, so the templates live as
//! the pipeline's own responsibility.

use case_core::ActionType;

use crate::state::PipelineState;

/// Fill in the subject/body template for `state.action_type`, appending the
/// adjustment instruction (if this is a resumed `ADJUST` pass) to the body.
pub fn draft_response(state: &mut PipelineState) {
    if !state.action_type.policy().requires_draft {
        state.draft_subject = None;
        state.draft_body = None;
        return;
    }

    let (subject, mut body) = template_for(state.action_type);

    if let Some(instruction) = &state.adjustment_instruction {
        body.push_str("\n\n[Adjusted per reviewer instruction: ");
        body.push_str(instruction);
        body.push(']');
        state.reason(format!("draft adjusted per reviewer instruction: {instruction}"));
    }

    state.draft_subject = Some(subject.to_string());
    state.draft_body = Some(body);
    state.confidence = Some(default_confidence(state.action_type));
}

fn template_for(action_type: ActionType) -> (&'static str, String) {
    match action_type {
        ActionType::SendInitialRequest => (
            "Public Records Request",
            "Under applicable public records law, I am requesting copies of the records described below."
                .to_string(),
        ),
        ActionType::SendFollowup => (
            "Follow-up: Pending Public Records Request",
            "I am following up on the records request referenced above, which remains outstanding."
                .to_string(),
        ),
        ActionType::AcceptFee => (
            "Re: Fee Quote — Accepted",
            "I accept the quoted fee and authorize the agency to proceed with fulfillment.".to_string(),
        ),
        ActionType::NegotiateFee => (
            "Re: Fee Quote — Request for Waiver or Reduction",
            "I respectfully request a fee waiver or reduction, as the requested records are in the public interest."
                .to_string(),
        ),
        ActionType::SendClarification => (
            "Re: Request for Clarification",
            "In response to your request for clarification, please find the additional detail below."
                .to_string(),
        ),
        ActionType::SendRebuttal => (
            "Re: Denial — Request for Reconsideration",
            "I am writing to respectfully contest the denial of the above-referenced request.".to_string(),
        ),
        ActionType::RespondPartialApproval => (
            "Re: Partial Release — Remaining Records Requested",
            "Thank you for the partial release. I am writing to request the remaining responsive records."
                .to_string(),
        ),
        ActionType::ReformulateRequest => (
            "Revised Public Records Request",
            "In light of your agency's response, please find a reformulated request below.".to_string(),
        ),
        ActionType::ResearchAgency | ActionType::SubmitPortal | ActionType::CloseCase | ActionType::Escalate
        | ActionType::None => ("", String::new()),
    }
}

fn default_confidence(action_type: ActionType) -> f64 {
    if action_type.policy().may_auto_execute { 0.85 } else { 0.6 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_core::{AutopilotMode, CaseId, RunId, RunTrigger};

    #[test]
    fn actions_without_draft_requirement_produce_no_body() {
        let mut s = PipelineState::new(CaseId(1), RunId::new(), RunTrigger::Manual, None, AutopilotMode::Auto);
        s.action_type = ActionType::ResearchAgency;
        draft_response(&mut s);
        assert!(s.draft_body.is_none());
    }

    #[test]
    fn drafted_action_gets_subject_and_body() {
        let mut s = PipelineState::new(CaseId(1), RunId::new(), RunTrigger::Manual, None, AutopilotMode::Auto);
        s.action_type = ActionType::SendRebuttal;
        draft_response(&mut s);
        assert!(s.draft_subject.is_some());
        assert!(s.draft_body.is_some());
    }

    #[test]
    fn adjustment_instruction_is_appended() {
        let mut s = PipelineState::new(CaseId(1), RunId::new(), RunTrigger::Manual, None, AutopilotMode::Auto);
        s.action_type = ActionType::SendRebuttal;
        s.adjustment_instruction = Some("soften the tone".to_string());
        draft_response(&mut s);
        assert!(s.draft_body.unwrap().contains("soften the tone"));
    }
}
