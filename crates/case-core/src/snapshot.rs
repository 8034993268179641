//! [`CaseSnapshot`]: the reducer's sole input besides the event itself.

use serde::{Deserialize, Serialize};

use crate::case::Case;
use crate::followup::FollowupSchedule;
use crate::portal_task::PortalTask;
use crate::proposal::Proposal;
use crate::run::Run;

/// A consistent, `FOR UPDATE`-locked view of a case and everything the
/// reducer needs to compute its mutations. Loaded by the Runtime Transition
/// (C3) inside the enclosing database transaction; never constructed by the
/// reducer itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseSnapshot {
    pub case: Case,
    pub active_run: Option<Run>,
    pub proposals: Vec<Proposal>,
    pub portal_tasks: Vec<PortalTask>,
    pub followup: Option<FollowupSchedule>,
}

impl CaseSnapshot {
    #[must_use]
    pub fn active_proposal(&self) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.status.is_active())
    }
}
