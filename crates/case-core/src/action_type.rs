//! The closed set of actions the Decision Pipeline may recommend, and the
//! static policy table describing each one (spec §4.3).

use serde::{Deserialize, Serialize};

use crate::case::PauseReason;

/// The closed, normalized action set a proposal may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    SendRebuttal,
    AcceptFee,
    NegotiateFee,
    SendClarification,
    SendFollowup,
    SendInitialRequest,
    RespondPartialApproval,
    CloseCase,
    ResearchAgency,
    ReformulateRequest,
    SubmitPortal,
    Escalate,
    None,
}

/// Static policy describing an [`ActionType`]'s drafting and gating
/// requirements. One row per action, declared in [`ActionType::policy`].
#[derive(Debug, Clone, Copy)]
pub struct ActionPolicy {
    pub requires_draft: bool,
    pub may_auto_execute: bool,
    pub always_gates: bool,
    pub default_pause_reason: Option<PauseReason>,
}

impl ActionType {
    /// The static per-action policy table referenced by `gate_or_execute`.
    #[must_use]
    pub fn policy(self) -> ActionPolicy {
        use ActionType::{
            AcceptFee, CloseCase, Escalate, NegotiateFee, None as NoAction, ReformulateRequest,
            RespondPartialApproval, ResearchAgency, SendClarification, SendFollowup,
            SendInitialRequest, SendRebuttal, SubmitPortal,
        };
        match self {
            SendInitialRequest => ActionPolicy {
                requires_draft: true,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: None,
            },
            SendFollowup => ActionPolicy {
                requires_draft: true,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: None,
            },
            AcceptFee => ActionPolicy {
                requires_draft: true,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: Some(PauseReason::FeeQuote),
            },
            NegotiateFee => ActionPolicy {
                requires_draft: true,
                may_auto_execute: false,
                always_gates: true,
                default_pause_reason: Some(PauseReason::FeeQuote),
            },
            SendClarification => ActionPolicy {
                requires_draft: true,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: Some(PauseReason::ClarificationNeeded),
            },
            SendRebuttal => ActionPolicy {
                requires_draft: true,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: Some(PauseReason::Denial),
            },
            RespondPartialApproval => ActionPolicy {
                requires_draft: true,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: None,
            },
            CloseCase => ActionPolicy {
                requires_draft: false,
                may_auto_execute: false,
                always_gates: true,
                default_pause_reason: Some(PauseReason::Denial),
            },
            ResearchAgency => ActionPolicy {
                requires_draft: false,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: Some(PauseReason::WrongAgency),
            },
            ReformulateRequest => ActionPolicy {
                requires_draft: true,
                may_auto_execute: false,
                always_gates: true,
                default_pause_reason: Some(PauseReason::Denial),
            },
            SubmitPortal => ActionPolicy {
                requires_draft: false,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: None,
            },
            Escalate => ActionPolicy {
                requires_draft: false,
                may_auto_execute: false,
                always_gates: true,
                default_pause_reason: Some(PauseReason::Hostile),
            },
            NoAction => ActionPolicy {
                requires_draft: false,
                may_auto_execute: true,
                always_gates: false,
                default_pause_reason: None,
            },
        }
    }
}

/// Normalized classifier output. Supplied by the external LLM/classification
/// collaborator; the pipeline treats it as an opaque enum it routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    Acknowledgment,
    RecordsReady,
    Delivery,
    PortalRedirect,
    WrongAgency,
    Hostile,
    PartialApproval,
    FeeQuote,
    ClarificationRequest,
    Denial,
    NoResponse,
    Unknown,
}

/// Subtype attached to a `DENIAL` classification, when the classifier can
/// determine one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum DenialSubtype {
    NoRecords,
    WrongAgency,
    OverlyBroad,
    ExcessiveFees,
    RetentionExpired,
    OngoingInvestigation,
    PrivacyExemption,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_fee_always_gates() {
        assert!(ActionType::NegotiateFee.policy().always_gates);
        assert!(!ActionType::NegotiateFee.policy().may_auto_execute);
    }

    #[test]
    fn accept_fee_may_auto_execute_but_does_not_always_gate() {
        let p = ActionType::AcceptFee.policy();
        assert!(p.may_auto_execute);
        assert!(!p.always_gates);
    }

    #[test]
    fn close_case_has_no_draft() {
        assert!(!ActionType::CloseCase.policy().requires_draft);
    }
}
