//! The reducer's output types: [`Mutations`] (intended writes) and
//! [`Projection`] (post-event summary), per spec §4.1.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action_type::ActionType;
use crate::case::{CaseStatus, PauseReason};
use crate::execution::ExecutionStatus;
use crate::followup::FollowupStatus;
use crate::portal_task::PortalTaskStatus;
use crate::proposal::ProposalStatus;
use crate::run::RunStatus;
use crate::types::{ExecutionId, PortalTaskId, ProposalId, RunId};

/// A field that the reducer either leaves untouched or overwrites.
/// Mirrors the pipeline state's "scalars are last-write-wins; `undefined`
/// preserves prior value" rule from spec §4.3, reused here for the
/// reducer's own mutation fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Set(T),
}

impl<T> Patch<T> {
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Set(v) => Some(v),
            Self::Unchanged => None,
        }
    }
}

/// Intended writes to the `cases` row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseMutation {
    pub status: Patch<CaseStatus>,
    pub substatus: Patch<Option<String>>,
    pub requires_human: Patch<bool>,
    pub pause_reason: Patch<Option<PauseReason>>,
    pub next_due_at: Patch<Option<DateTime<Utc>>>,
    pub send_date: Patch<Option<DateTime<Utc>>>,
    pub last_response_date: Patch<Option<DateTime<Utc>>>,
}

/// Intended writes to a single `agent_runs` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMutation {
    pub run_id: RunId,
    pub status: Patch<RunStatus>,
    pub ended_at: Patch<DateTime<Utc>>,
}

/// Intended writes to a single `proposals` row. An explicit entry here wins
/// over the blanket `proposals_dismiss_all`/`proposals_dismiss_portal` flags
/// (spec §4.1 tie-break rule).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalMutation {
    pub proposal_id: ProposalId,
    pub status: Patch<ProposalStatus>,
}

/// Intended writes to a single `executions` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionMutation {
    pub execution_id: ExecutionId,
    pub status: Patch<ExecutionStatus>,
    pub provider_message_id: Patch<Option<String>>,
    pub error: Patch<Option<String>>,
}

/// Intended writes to a single `portal_tasks` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalTaskMutation {
    pub portal_task_id: PortalTaskId,
    pub status: Patch<PortalTaskStatus>,
    pub confirmation_number: Patch<Option<String>>,
}

/// Intended write to the case's `follow_up_schedule` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupMutation {
    pub status: Patch<FollowupStatus>,
}

/// The full set of intended writes produced by one reducer application.
/// [`crate::error::CoreError`] is never part of this value — a reducer
/// failure short-circuits before any `Mutations` is produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mutations {
    pub case: CaseMutation,
    pub runs: Vec<RunMutation>,
    pub proposals: Vec<ProposalMutation>,
    pub executions: Vec<ExecutionMutation>,
    pub portal_tasks: Vec<PortalTaskMutation>,
    pub followup: Option<FollowupMutation>,
    /// Dismiss every proposal in the active set (spec §4.1 proposal
    /// alignment safety net), except one with an explicit entry above.
    pub proposals_dismiss_all: bool,
    /// Dismiss only proposals currently `PENDING_PORTAL`.
    pub proposals_dismiss_portal: bool,
    /// Cancel every other active run for this case (defensive safety net on
    /// `RUN_CLAIMED`).
    pub agent_runs_cancel_others: Option<RunId>,
    /// Set when a `RUN_STALE_CLEANED` event's failure was purely a run
    /// failure (not a case-level problem) — clears `requires_human` rather
    /// than leaving it set by the review-set safety net.
    pub clear_requires_human_after_stale_run: bool,
}

/// A summary of the post-event state, returned to the caller (and stored
/// verbatim in the ledger row for idempotent replay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    pub case_status: CaseStatus,
    pub requires_human: bool,
    pub pause_reason: Option<PauseReason>,
    pub active_run_id: Option<RunId>,
    pub active_proposal_id: Option<ProposalId>,
    pub last_action_type: Option<ActionType>,
}
