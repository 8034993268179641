//! The [`Execution`] entity: a single side-effect attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action_type::ActionType;
use crate::types::{CaseId, ExecutionId, ProposalId, RunId};

/// Which channel an execution goes out over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Email,
    Portal,
    None,
}

/// Lifecycle status of an execution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Queued,
    Sent,
    Skipped,
    Failed,
    PendingHuman,
}

/// A single side-effect attempt (outbound email, portal submission).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Execution {
    pub id: ExecutionId,
    pub case_id: CaseId,
    pub proposal_id: ProposalId,
    pub run_id: RunId,
    /// Uniqueness token claimed atomically from the proposal (invariant I6).
    pub execution_key: String,
    pub action_type: ActionType,
    pub status: ExecutionStatus,
    pub provider: ProviderKind,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
