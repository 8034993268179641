//! `gate_or_execute` — the gating policy (spec §4.3).

use case_core::{ActionType, AutopilotMode, PauseReason};

/// Whether a routed action should be auto-executed or gated for human
/// decision, and why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    AutoExecute,
    Gate(Option<PauseReason>),
}

/// Apply the gating policy, in the order spec §4.3 declares it:
/// 1. Any safety-check risk flag gates unconditionally.
/// 2. The action's own static policy (`always_gates`) gates unconditionally.
/// 3. A routing-forced gate (fee tier, denial strength) gates regardless of
///    autopilot mode, including `AUTO`.
/// 4. `MANUAL` autopilot gates everything.
/// 5. `SUPERVISED` autopilot gates anything not on the action's
///    auto-execute allowlist.
/// 6. Otherwise, auto-execute.
#[must_use]
pub fn gate_or_execute(
    action_type: ActionType,
    autopilot_mode: AutopilotMode,
    risk_flags: &[String],
    forced_gate: bool,
    pause_reason: Option<PauseReason>,
) -> GateDecision {
    let policy = action_type.policy();

    if !risk_flags.is_empty() {
        return GateDecision::Gate(pause_reason.or(Some(PauseReason::Unspecified)));
    }
    if policy.always_gates {
        return GateDecision::Gate(pause_reason.or(policy.default_pause_reason));
    }
    if forced_gate {
        return GateDecision::Gate(pause_reason.or(policy.default_pause_reason));
    }
    if autopilot_mode == AutopilotMode::Manual {
        return GateDecision::Gate(pause_reason.or(policy.default_pause_reason));
    }
    if autopilot_mode == AutopilotMode::Supervised && !policy.may_auto_execute {
        return GateDecision::Gate(pause_reason.or(policy.default_pause_reason));
    }

    GateDecision::AutoExecute
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_flags_always_gate() {
        let decision = gate_or_execute(
            ActionType::SendFollowup,
            AutopilotMode::Auto,
            &["forbidden phrase detected".to_string()],
            false,
            None,
        );
        assert!(matches!(decision, GateDecision::Gate(_)));
    }

    #[test]
    fn negotiate_fee_always_gates_even_in_auto() {
        let decision = gate_or_execute(ActionType::NegotiateFee, AutopilotMode::Auto, &[], false, None);
        assert_eq!(decision, GateDecision::Gate(Some(case_core::PauseReason::FeeQuote)));
    }

    #[test]
    fn forced_gate_applies_in_auto_mode() {
        let decision = gate_or_execute(ActionType::AcceptFee, AutopilotMode::Auto, &[], true, None);
        assert!(matches!(decision, GateDecision::Gate(_)));
    }

    #[test]
    fn manual_mode_gates_everything() {
        let decision = gate_or_execute(ActionType::SendFollowup, AutopilotMode::Manual, &[], false, None);
        assert!(matches!(decision, GateDecision::Gate(_)));
    }

    #[test]
    fn supervised_gates_actions_outside_allowlist() {
        let decision = gate_or_execute(ActionType::ReformulateRequest, AutopilotMode::Supervised, &[], false, None);
        assert!(matches!(decision, GateDecision::Gate(_)));
    }

    #[test]
    fn auto_mode_auto_executes_eligible_action() {
        let decision = gate_or_execute(ActionType::SendFollowup, AutopilotMode::Auto, &[], false, None);
        assert_eq!(decision, GateDecision::AutoExecute);
    }
}
