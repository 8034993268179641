//! The [`FollowupSchedule`] entity: the per-case followup timer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::CaseId;

/// Lifecycle status of a case's followup schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum FollowupStatus {
    Scheduled,
    Processing,
    Sent,
    Paused,
    MaxReached,
    Cancelled,
    Failed,
}

/// One followup timer per case (unique on `case_id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FollowupSchedule {
    pub case_id: CaseId,
    pub next_followup_date: DateTime<Utc>,
    pub followup_count: u32,
    pub status: FollowupStatus,
    /// Idempotency token for a single fire:
    /// `followup:{caseId}:{followup_count}:{date}`.
    pub scheduled_key: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl FollowupSchedule {
    #[must_use]
    pub fn scheduled_key_for(case_id: CaseId, followup_count: u32, date: DateTime<Utc>) -> String {
        format!("followup:{case_id}:{followup_count}:{}", date.timestamp())
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == FollowupStatus::Scheduled && self.next_followup_date <= now
    }

    #[must_use]
    pub fn has_reached_max(&self, max_followups: u32) -> bool {
        self.followup_count >= max_followups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_boundary() {
        let now = Utc::now();
        let sched = FollowupSchedule {
            case_id: CaseId(1),
            next_followup_date: now,
            followup_count: 0,
            status: FollowupStatus::Scheduled,
            scheduled_key: None,
            updated_at: now,
        };
        assert!(sched.is_due(now));
    }

    #[test]
    fn max_reached_boundary() {
        let now = Utc::now();
        let sched = FollowupSchedule {
            case_id: CaseId(1),
            next_followup_date: now,
            followup_count: 3,
            status: FollowupStatus::Scheduled,
            scheduled_key: None,
            updated_at: now,
        };
        assert!(sched.has_reached_max(3));
        assert!(!sched.has_reached_max(4));
    }
}
