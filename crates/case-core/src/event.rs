//! The [`CaseEvent`] taxonomy (spec §4.1) — the closed set of events the
//! reducer accepts.

use serde::{Deserialize, Serialize};

use crate::action_type::ActionType;
use crate::proposal::HumanDecision;
use crate::types::{ExecutionId, MessageId, PortalTaskId, ProposalId, RunId};

/// A single runtime event applied through the Runtime Transition (C3).
///
/// Each variant carries exactly the data the reducer needs to compute its
/// mutations — no more. The reducer is total over this enum; unknown event
/// shapes are a compile-time impossibility, and unknown *combinations* of a
/// known event with the current snapshot fail loudly via
/// `case_reducer::ReducerError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseEvent {
    CaseSent,
    PortalStarted,
    PortalCompleted { confirmation_number: Option<String> },
    PortalFailed { error: String },
    PortalTimedOut,
    PortalAborted,
    PortalTaskCreated { portal_task_id: PortalTaskId, portal_url: String, proposal_id: Option<ProposalId> },
    PortalStuck { portal_task_id: PortalTaskId },
    EmailSent { provider_message_id: Option<String> },
    EmailFailed { error: String },
    FeeQuoteReceived { fee_amount: i64 },
    AcknowledgmentReceived,
    CaseResponded { message_id: MessageId },
    CaseWrongAgency,
    CaseEscalated { reason: String },
    CaseReconciled,
    CaseCompleted,
    CaseCancelled { reason: String },
    RunClaimed { run_id: RunId },
    RunWaiting { run_id: RunId },
    RunCompleted { run_id: RunId },
    RunFailed { run_id: RunId, error: String },
    RunStaleCleaned { run_id: RunId },
    ProposalGated { proposal_id: ProposalId, action_type: ActionType },
    ProposalApproved { proposal_id: ProposalId, decision: HumanDecision },
    ProposalDismissed { proposal_id: ProposalId, decision: HumanDecision },
    ProposalExecuted { proposal_id: ProposalId, execution_id: ExecutionId },
    ProposalBlocked { proposal_id: ProposalId, reason: String },
    ProposalCancelled { proposal_id: ProposalId },
    StaleFlagsCleared,
    StuckPortalTaskFailed { portal_task_id: PortalTaskId },
}

impl CaseEvent {
    /// Stable string discriminant, used as the event-kind column and in log
    /// fields (never interpolated into a message string).
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CaseSent => "CASE_SENT",
            Self::PortalStarted => "PORTAL_STARTED",
            Self::PortalCompleted { .. } => "PORTAL_COMPLETED",
            Self::PortalFailed { .. } => "PORTAL_FAILED",
            Self::PortalTimedOut => "PORTAL_TIMED_OUT",
            Self::PortalAborted => "PORTAL_ABORTED",
            Self::PortalTaskCreated { .. } => "PORTAL_TASK_CREATED",
            Self::PortalStuck { .. } => "PORTAL_STUCK",
            Self::EmailSent { .. } => "EMAIL_SENT",
            Self::EmailFailed { .. } => "EMAIL_FAILED",
            Self::FeeQuoteReceived { .. } => "FEE_QUOTE_RECEIVED",
            Self::AcknowledgmentReceived => "ACKNOWLEDGMENT_RECEIVED",
            Self::CaseResponded { .. } => "CASE_RESPONDED",
            Self::CaseWrongAgency => "CASE_WRONG_AGENCY",
            Self::CaseEscalated { .. } => "CASE_ESCALATED",
            Self::CaseReconciled => "CASE_RECONCILED",
            Self::CaseCompleted => "CASE_COMPLETED",
            Self::CaseCancelled { .. } => "CASE_CANCELLED",
            Self::RunClaimed { .. } => "RUN_CLAIMED",
            Self::RunWaiting { .. } => "RUN_WAITING",
            Self::RunCompleted { .. } => "RUN_COMPLETED",
            Self::RunFailed { .. } => "RUN_FAILED",
            Self::RunStaleCleaned { .. } => "RUN_STALE_CLEANED",
            Self::ProposalGated { .. } => "PROPOSAL_GATED",
            Self::ProposalApproved { .. } => "PROPOSAL_APPROVED",
            Self::ProposalDismissed { .. } => "PROPOSAL_DISMISSED",
            Self::ProposalExecuted { .. } => "PROPOSAL_EXECUTED",
            Self::ProposalBlocked { .. } => "PROPOSAL_BLOCKED",
            Self::ProposalCancelled { .. } => "PROPOSAL_CANCELLED",
            Self::StaleFlagsCleared => "STALE_FLAGS_CLEARED",
            Self::StuckPortalTaskFailed { .. } => "STUCK_PORTAL_TASK_FAILED",
        }
    }
}
