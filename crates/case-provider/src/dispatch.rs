//! Request/response shapes for the C7 executor contract:
//! `send(proposal, executionKey) -> {providerMessageId, status}`.

use case_core::{ActionType, CaseId, ExecutionStatus, ProposalId, ThreadHeaders};

/// Everything a provider needs to attempt a single outbound send.
///
/// Built from a claimed [`case_core::Proposal`] plus whatever agency contact
/// information the case carries; providers never see the case or proposal
/// directly so that email/portal adapters stay decoupled from the store.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub case_id: CaseId,
    pub proposal_id: ProposalId,
    /// Idempotency token claimed atomically on the proposal (invariant I6).
    pub execution_key: String,
    pub action_type: ActionType,
    pub recipient_email: Option<String>,
    pub portal_url: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    /// RFC-5322 threading headers to preserve thread continuity.
    pub thread_headers: ThreadHeaders,
}

/// The result of a single send attempt.
///
/// `status` must be one of `SENT | FAILED | PENDING_HUMAN` per the executor
/// contract; `FAILED` is normally surfaced as an `Err(ProviderError)` instead,
/// so providers construct this type only for the two non-error outcomes.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub provider_message_id: Option<String>,
    pub status: ExecutionStatus,
}

impl SendOutcome {
    /// A successful send with the provider's message identifier.
    #[must_use]
    pub fn sent(provider_message_id: impl Into<String>) -> Self {
        Self {
            provider_message_id: Some(provider_message_id.into()),
            status: ExecutionStatus::Sent,
        }
    }

    /// The provider cannot complete the send unattended (e.g. a portal with
    /// no automated adapter) and has instead handed the work to a human.
    #[must_use]
    pub fn pending_human() -> Self {
        Self {
            provider_message_id: None,
            status: ExecutionStatus::PendingHuman,
        }
    }
}
