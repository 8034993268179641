//! The [`Case`] entity and its lifecycle enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::CaseId;

/// How a case was (or will be) submitted to the agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum SubmissionChannel {
    Email,
    Portal,
    Both,
    Manual,
}

/// Lifecycle status of a case.
///
/// `review_set()` and `terminal_set()` below are the canonical definitions
/// referenced throughout the runtime transition and reducer safety nets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    ReadyToSend,
    PortalInProgress,
    Sent,
    AwaitingResponse,
    Responded,
    NeedsHumanReview,
    NeedsHumanFeeApproval,
    NeedsContactInfo,
    NeedsPhoneCall,
    Completed,
    Cancelled,
}

impl CaseStatus {
    /// Statuses that require a human (the glossary's "review set").
    #[must_use]
    pub fn is_review(self) -> bool {
        matches!(
            self,
            Self::NeedsHumanReview
                | Self::NeedsHumanFeeApproval
                | Self::NeedsContactInfo
                | Self::NeedsPhoneCall
        )
    }

    /// Terminal statuses: no active runs, no active proposals, followups cancelled.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Statuses under which outbound work is still active (neither terminal
    /// nor awaiting human review) — followups are left unchanged here.
    #[must_use]
    pub fn is_active_work(self) -> bool {
        !self.is_review() && !self.is_terminal()
    }

    /// Statuses after which any active proposal must be dismissed (spec §4.1
    /// proposal-alignment safety net).
    #[must_use]
    pub fn dismisses_proposals(self) -> bool {
        matches!(
            self,
            Self::Sent | Self::AwaitingResponse | Self::Responded | Self::Completed | Self::Cancelled
        )
    }
}

/// Why a case is paused for human review. Drives UI grouping and cron
/// escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    Unspecified,
    FeeQuote,
    Denial,
    WrongAgency,
    Hostile,
    ClarificationNeeded,
    PortalStuck,
    RunFailure,
    ContactInfoNeeded,
    PhoneCallNeeded,
}

/// Policy knob controlling how much the pipeline may auto-execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "UPPERCASE")]
pub enum AutopilotMode {
    Auto,
    Supervised,
    Manual,
}

/// A single agency contact method (email address or portal URL).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AgencyIdentity {
    pub name: String,
    pub jurisdiction: Option<String>,
    pub agency_email: Option<String>,
    pub portal_url: Option<String>,
}

/// The unit of work: a long-lived FOIA request workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Case {
    pub id: CaseId,
    pub submission_channel: SubmissionChannel,
    pub agency: AgencyIdentity,
    pub requested_records: Vec<String>,
    pub status: CaseStatus,
    pub substatus: Option<String>,
    pub requires_human: bool,
    pub pause_reason: Option<PauseReason>,
    pub next_due_at: Option<DateTime<Utc>>,
    pub autopilot_mode: AutopilotMode,
    #[serde(default)]
    pub constraints: Value,
    #[serde(default)]
    pub scope_items: Value,
    pub send_date: Option<DateTime<Utc>>,
    pub last_response_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    /// Invariant I1: every case has either an email or a portal URL.
    #[must_use]
    pub fn has_contact_method(&self) -> bool {
        self.agency.agency_email.is_some() || self.agency.portal_url.is_some()
    }

    /// Invariant I2: `status ∈ review-set ⇒ requires_human ∧ pause_reason ≠ ∅`.
    #[must_use]
    pub fn satisfies_review_invariant(&self) -> bool {
        if self.status.is_review() {
            self.requires_human && self.pause_reason.is_some()
        } else {
            true
        }
    }
}
