//! The [`PortalTask`] entity: human work item for an unautomatable portal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CaseId, ExecutionId, PortalTaskId, ProposalId};

/// Lifecycle status of a portal task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PortalTaskStatus {
    Pending,
    InProgress,
    Completed,
    /// Pending for more than 24h — set by the stuck-portal-task reaper.
    Stuck,
    Failed,
    Cancelled,
}

/// A human work item generated when the system cannot automate a portal
/// submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PortalTask {
    pub id: PortalTaskId,
    pub case_id: CaseId,
    pub proposal_id: Option<ProposalId>,
    pub execution_id: Option<ExecutionId>,
    pub portal_url: String,
    pub content: Option<String>,
    pub instructions: Option<String>,
    pub status: PortalTaskStatus,
    pub assignee: Option<String>,
    pub confirmation_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PortalTask {
    /// Whether this task has sat in `Pending` long enough for the reaper to
    /// flag it as stuck (spec §4.7, default threshold 24h).
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        self.status == PortalTaskStatus::Pending && now - self.created_at >= threshold
    }
}
