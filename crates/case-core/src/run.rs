//! The [`Run`] entity: a single invocation of the Decision Pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::AutopilotMode;
use crate::types::{CaseId, MessageId, RunId};

/// What caused a run to be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    InitialRequest,
    InboundMessage,
    FollowupTrigger,
    Resume,
    Manual,
    DeadlineEscalation,
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Created,
    Queued,
    Running,
    Paused,
    Waiting,
    Completed,
    Failed,
    SkippedLocked,
    /// Defensively cancelled because another run for the same case was
    /// claimed first (spec §4.1 `RUN_CLAIMED` safety net).
    Cancelled,
}

impl RunStatus {
    /// Invariant I4 / I7: the "active set" — at most one run per case may be
    /// in one of these statuses at a time.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Created | Self::Queued | Self::Running | Self::Paused | Self::Waiting
        )
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::SkippedLocked | Self::Cancelled
        )
    }
}

/// A single invocation of the Decision Pipeline for a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Run {
    pub id: RunId,
    pub case_id: CaseId,
    pub trigger: RunTrigger,
    pub triggering_message_id: Option<MessageId>,
    /// Idempotency token for timer-fired runs (e.g. `followup:{caseId}:{n}:{date}`).
    pub scheduled_key: Option<String>,
    pub status: RunStatus,
    pub autopilot_mode: AutopilotMode,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub heartbeat_at: DateTime<Utc>,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Run {
    /// True once the heartbeat has aged past `T_reap` without renewal —
    /// used by the stale-run reaper (spec §4.4 step 8).
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, reap_after: chrono::Duration) -> bool {
        self.status == RunStatus::Running && now - self.heartbeat_at >= reap_after
    }
}
