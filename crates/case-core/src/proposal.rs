//! The [`Proposal`] entity: a decision artifact recommending a next action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action_type::ActionType;
use crate::case::PauseReason;
use crate::types::{CaseId, MessageId, ProposalId, RunId};

/// Lifecycle status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Draft,
    PendingApproval,
    Approved,
    DecisionReceived,
    PendingPortal,
    Blocked,
    Executed,
    Dismissed,
    Superseded,
    Failed,
}

impl ProposalStatus {
    /// Invariant I5 / P2: the "active proposal set" — at most one proposal
    /// per case may be in one of these statuses at a time.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::PendingApproval | Self::Blocked | Self::DecisionReceived | Self::PendingPortal
        )
    }
}

/// A human decision posted against a pending proposal.
///
/// Canonical JSON shape per spec §9 Open Question #2 — no legacy
/// `VARCHAR(50)` column is recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionAction {
    Approve,
    Adjust,
    Dismiss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HumanDecision {
    pub action: DecisionAction,
    pub instruction: Option<String>,
    pub reason: Option<String>,
    pub decided_by: String,
    pub decided_at: DateTime<Utc>,
}

/// A decision artifact recommending the single next action for a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Proposal {
    pub id: ProposalId,
    pub case_id: CaseId,
    pub run_id: RunId,
    /// Deterministic unique idempotency string:
    /// `{case}:{trigger_message}:{action_type}:{attempt}`.
    pub proposal_key: String,
    /// Set only once the executor claims this proposal for a side effect.
    pub execution_key: Option<String>,
    pub action_type: ActionType,
    pub trigger_message_id: Option<MessageId>,
    pub draft_subject: Option<String>,
    pub draft_body: Option<String>,
    pub reasoning: Vec<String>,
    pub confidence: Option<f64>,
    pub risk_flags: Vec<String>,
    pub warnings: Vec<String>,
    pub can_auto_execute: bool,
    pub requires_human: bool,
    pub pause_reason: Option<PauseReason>,
    pub status: ProposalStatus,
    pub human_decision: Option<HumanDecision>,
    /// The checkpointed pipeline state, persisted at gating time so a
    /// `resume` run can rehydrate and re-enter the graph (spec §9).
    pub pipeline_state: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Deterministic `proposal_key` builder, matching spec §3's format.
    #[must_use]
    pub fn build_key(
        case_id: CaseId,
        trigger_message_id: Option<MessageId>,
        action_type: ActionType,
        attempt: u32,
    ) -> String {
        let trigger = trigger_message_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        format!("{case_id}:{trigger}:{action_type:?}:{attempt}")
    }
}
