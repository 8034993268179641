//! `decide_next_action` — the routing policy table (spec §4.3), applied in
//! order with first-match-wins semantics.

use case_core::{ActionType, Classification, DenialSubtype, PauseReason, RunTrigger};

use crate::state::PipelineState;

/// Default fee thresholds (spec §6 configuration). Currency-agnostic
/// integers, matching whatever unit the classifier reports `fee_amount` in.
#[derive(Debug, Clone, Copy)]
pub struct FeeThresholds {
    pub auto_approve_max: i64,
    pub negotiate_threshold: i64,
}

impl Default for FeeThresholds {
    fn default() -> Self {
        Self { auto_approve_max: 100, negotiate_threshold: 500 }
    }
}

/// Denial-strength keyword indicators (spec §4.3 step 10 fallback).
const STRONG_DENIAL_INDICATORS: &[&str] =
    &["statute", "investigation", "exempt", "sealed", "privacy", "law enforcement"];

/// Routing outcome: the chosen action plus whether it must be gated
/// regardless of the action's own static policy (fee tier, denial
/// strength) and the pause reason that should accompany a gate.
#[derive(Debug, Clone, Copy)]
pub struct RoutingDecision {
    pub action_type: ActionType,
    pub forced_gate: bool,
    pub pause_reason: Option<PauseReason>,
    /// True once this run's remaining work is just to record the decision —
    /// no draft, no execution (steps 1, 3, 4 of the routing table).
    pub completes_run: bool,
}

impl RoutingDecision {
    fn none(completes_run: bool) -> Self {
        Self { action_type: ActionType::None, forced_gate: false, pause_reason: None, completes_run }
    }

    fn action(action_type: ActionType) -> Self {
        let pause_reason = action_type.policy().default_pause_reason;
        Self { action_type, forced_gate: false, pause_reason, completes_run: false }
    }

    fn forced(mut self, pause_reason: Option<PauseReason>) -> Self {
        self.forced_gate = true;
        if pause_reason.is_some() {
            self.pause_reason = pause_reason;
        }
        self
    }
}

/// Apply the ten-step routing table to the pipeline state's classifier
/// output, writing the result (and reasoning trace entries) directly into
/// `state`.
pub fn decide_next_action(state: &mut PipelineState, thresholds: FeeThresholds) {
    let decision = route(state, thresholds);
    state.action_type = decision.action_type;
    state.forced_gate = decision.forced_gate;
    state.action_pause_reason = decision.pause_reason;
    state.is_complete = decision.completes_run;
}

fn route(state: &mut PipelineState, thresholds: FeeThresholds) -> RoutingDecision {
    // Step 1: classifier said no reply needed.
    if !state.requires_response {
        state.reason("requires_response = false; no action needed".to_string());
        return RoutingDecision::none(true);
    }

    // Step 2: timer-fired run, or classifier read the silence as NO_RESPONSE.
    // Deadline escalation is routed the same way as a followup trigger — it
    // is simply the scheduler insisting that it is time to act again.
    if matches!(state.trigger, RunTrigger::FollowupTrigger | RunTrigger::DeadlineEscalation)
        || state.classification == Some(Classification::NoResponse)
    {
        state.reason("followup trigger or NO_RESPONSE classification".to_string());
        return RoutingDecision::action(ActionType::SendFollowup);
    }

    let Some(classification) = state.classification else {
        state.reason("no classification available; gating for review".to_string());
        return RoutingDecision::action(ActionType::None).forced(Some(PauseReason::Unspecified));
    };

    match classification {
        // Step 3
        Classification::Acknowledgment | Classification::RecordsReady | Classification::Delivery => {
            state.reason(format!("{classification:?} requires no further action"));
            RoutingDecision::none(true)
        }
        // Step 4
        Classification::PortalRedirect => {
            state.reason("portal redirect; portal task recorded, run complete".to_string());
            RoutingDecision::none(true)
        }
        // Step 5
        Classification::WrongAgency => {
            state.reason("wrong agency; researching correct agency".to_string());
            RoutingDecision::action(ActionType::ResearchAgency)
        }
        // Step 6
        Classification::Hostile => {
            state.reason("hostile response; escalating to phone queue".to_string());
            RoutingDecision::action(ActionType::Escalate)
        }
        // Step 7
        Classification::PartialApproval => {
            state.reason("partial approval; drafting acknowledgement of partial records".to_string());
            RoutingDecision::action(ActionType::RespondPartialApproval)
        }
        // Step 8
        Classification::FeeQuote => route_fee_quote(state, thresholds),
        // Step 9
        Classification::ClarificationRequest => {
            state.reason("clarification requested by agency".to_string());
            RoutingDecision::action(ActionType::SendClarification)
        }
        // Step 10
        Classification::Denial => route_denial(state),
        Classification::NoResponse | Classification::Unknown => {
            state.reason(format!("unroutable classification {classification:?}; gating for review"));
            RoutingDecision::action(ActionType::None).forced(Some(PauseReason::Unspecified))
        }
    }
}

fn route_fee_quote(state: &mut PipelineState, thresholds: FeeThresholds) -> RoutingDecision {
    let Some(fee_amount) = state.fee_amount else {
        state.reason("FEE_QUOTE classification missing fee_amount; gating for review".to_string());
        return RoutingDecision::action(ActionType::None).forced(Some(PauseReason::FeeQuote));
    };

    if fee_amount <= thresholds.auto_approve_max {
        state.reason(format!("fee ${fee_amount} within auto-approve threshold"));
        RoutingDecision::action(ActionType::AcceptFee)
    } else if fee_amount <= thresholds.negotiate_threshold {
        state.reason(format!("fee ${fee_amount} requires supervised approval"));
        RoutingDecision::action(ActionType::AcceptFee).forced(Some(PauseReason::FeeQuote))
    } else {
        state.reason(format!("fee ${fee_amount} exceeds negotiate threshold"));
        RoutingDecision::action(ActionType::NegotiateFee).forced(Some(PauseReason::FeeQuote))
    }
}

fn route_denial(state: &mut PipelineState) -> RoutingDecision {
    // Open Question #1: subtype wins when non-null; keyword heuristic only
    // when the classifier supplied no subtype.
    match state.denial_subtype {
        Some(DenialSubtype::NoRecords) if !state.prior_agency_research => {
            state.reason("denial: no records, no prior research".to_string());
            RoutingDecision::action(ActionType::ResearchAgency)
        }
        Some(DenialSubtype::NoRecords) => {
            state.reason("denial: no records, prior research already exists".to_string());
            RoutingDecision::action(ActionType::ReformulateRequest)
        }
        Some(DenialSubtype::WrongAgency) => {
            state.reason("denial: wrong agency".to_string());
            RoutingDecision::action(ActionType::ResearchAgency)
        }
        Some(DenialSubtype::OverlyBroad) => {
            state.reason("denial: overly broad request".to_string());
            RoutingDecision::action(ActionType::ReformulateRequest)
        }
        Some(DenialSubtype::ExcessiveFees) => {
            state.reason("denial: excessive fees".to_string());
            RoutingDecision::action(ActionType::NegotiateFee).forced(Some(PauseReason::FeeQuote))
        }
        Some(DenialSubtype::RetentionExpired) => {
            state.reason("denial: retention expired".to_string());
            RoutingDecision::action(ActionType::Escalate)
        }
        Some(DenialSubtype::OngoingInvestigation | DenialSubtype::PrivacyExemption) => {
            state.reason("denial: ongoing investigation or privacy exemption".to_string());
            RoutingDecision::action(ActionType::SendRebuttal)
        }
        None => route_denial_by_strength(state),
    }
}

fn route_denial_by_strength(state: &mut PipelineState) -> RoutingDecision {
    let haystack = state.key_points.join(" ").to_lowercase();
    let strength = STRONG_DENIAL_INDICATORS.iter().filter(|kw| haystack.contains(*kw)).count();

    state.reason(format!("denial subtype unknown; keyword strength = {strength}"));

    match strength {
        0 => RoutingDecision::action(ActionType::SendRebuttal),
        1 => RoutingDecision::action(ActionType::SendRebuttal).forced(Some(PauseReason::Denial)),
        _ => RoutingDecision::action(ActionType::CloseCase),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use case_core::{AutopilotMode, CaseId, RunId};

    fn state() -> PipelineState {
        PipelineState::new(CaseId(1), RunId::new(), RunTrigger::InboundMessage, None, AutopilotMode::Auto)
    }

    #[test]
    fn no_response_required_completes_run() {
        let mut s = state();
        s.requires_response = false;
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::None);
        assert!(s.is_complete);
    }

    #[test]
    fn followup_trigger_sends_followup() {
        let mut s = state();
        s.trigger = RunTrigger::FollowupTrigger;
        s.classification = Some(Classification::Unknown);
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::SendFollowup);
    }

    #[test]
    fn portal_redirect_completes_without_draft() {
        let mut s = state();
        s.classification = Some(Classification::PortalRedirect);
        decide_next_action(&mut s, FeeThresholds::default());
        assert!(s.is_complete);
        assert_eq!(s.action_type, ActionType::None);
    }

    #[test]
    fn fee_at_auto_approve_boundary_is_auto_executable() {
        let mut s = state();
        s.classification = Some(Classification::FeeQuote);
        s.fee_amount = Some(100);
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::AcceptFee);
        assert!(!s.forced_gate);
    }

    #[test]
    fn fee_one_over_auto_approve_is_forced_gated() {
        let mut s = state();
        s.classification = Some(Classification::FeeQuote);
        s.fee_amount = Some(101);
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::AcceptFee);
        assert!(s.forced_gate);
    }

    #[test]
    fn fee_over_negotiate_threshold_negotiates() {
        let mut s = state();
        s.classification = Some(Classification::FeeQuote);
        s.fee_amount = Some(750);
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::NegotiateFee);
        assert!(s.forced_gate);
    }

    #[test]
    fn denial_subtype_wins_over_keyword_heuristic() {
        let mut s = state();
        s.classification = Some(Classification::Denial);
        s.denial_subtype = Some(DenialSubtype::ExcessiveFees);
        s.key_points = vec!["sealed per court order".to_string(), "ongoing investigation".to_string()];
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::NegotiateFee);
    }

    #[test]
    fn denial_weak_keyword_strength_auto_executable_rebuttal() {
        let mut s = state();
        s.classification = Some(Classification::Denial);
        s.key_points = vec!["Records are not available at this time".to_string()];
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::SendRebuttal);
        assert!(!s.forced_gate);
    }

    #[test]
    fn denial_strong_keyword_strength_closes_case() {
        let mut s = state();
        s.classification = Some(Classification::Denial);
        s.key_points = vec!["sealed per court order".to_string(), "ongoing investigation".to_string()];
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::CloseCase);
    }

    #[test]
    fn denial_medium_keyword_strength_gates_even_in_auto() {
        let mut s = state();
        s.classification = Some(Classification::Denial);
        s.key_points = vec!["this is exempt from release".to_string()];
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::SendRebuttal);
        assert!(s.forced_gate);
    }

    #[test]
    fn no_records_routes_by_prior_research() {
        let mut s = state();
        s.classification = Some(Classification::Denial);
        s.denial_subtype = Some(DenialSubtype::NoRecords);
        decide_next_action(&mut s, FeeThresholds::default());
        assert_eq!(s.action_type, ActionType::ResearchAgency);

        let mut s2 = state();
        s2.classification = Some(Classification::Denial);
        s2.denial_subtype = Some(DenialSubtype::NoRecords);
        s2.prior_agency_research = true;
        decide_next_action(&mut s2, FeeThresholds::default());
        assert_eq!(s2.action_type, ActionType::ReformulateRequest);
    }
}
