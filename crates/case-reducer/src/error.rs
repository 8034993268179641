use case_core::{CaseId, ProposalId, RunId};
use thiserror::Error;

/// Reducer failures. The reducer never panics; an invalid `(snapshot,
/// event)` combination — or, per spec §4.1, a genuinely unknown event — is
/// always a typed error so the Runtime Transition can abort the enclosing
/// transaction cleanly.
#[derive(Debug, Error)]
pub enum ReducerError {
    #[error("case {case_id}: no active run to apply run event to")]
    NoActiveRun { case_id: CaseId },

    #[error("case {case_id}: run {run_id} is not the active run")]
    RunMismatch { case_id: CaseId, run_id: RunId },

    #[error("case {case_id}: proposal {proposal_id} not found in snapshot")]
    ProposalNotFound { case_id: CaseId, proposal_id: ProposalId },

    #[error(
        "case {case_id}: StaleFlagsCleared is invalid while case status is in the review set"
    )]
    InvalidStaleFlagsClear { case_id: CaseId },

    #[error("case {case_id}: event is not valid for current case status {status:?}")]
    IllegalTransition { case_id: CaseId, status: case_core::CaseStatus },
}
