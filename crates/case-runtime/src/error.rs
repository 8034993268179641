//! Failure modes surfaced across C3/C4: store/reducer/pipeline errors pass
//! through via `#[from]`, plus the domain errors the HTTP layer needs to
//! map onto spec §6's status codes (409 for a conflicting decision or an
//! already-active run, 404 for an unknown case/proposal).

use case_core::{CaseId, ProposalId, ProposalStatus};
use case_pipeline::PipelineError;
use case_reducer::ReducerError;
use case_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("reducer error: {0}")]
    Reducer(#[from] ReducerError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("case {0} not found")]
    CaseNotFound(CaseId),

    #[error("case {0} has already reached a terminal status")]
    CaseTerminal(CaseId),

    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),

    #[error("proposal {proposal_id} is not awaiting a decision (status {status:?})")]
    ProposalAlreadyDecided { proposal_id: ProposalId, status: ProposalStatus },

    #[error("a run is already active for this case")]
    ActiveRunExists,

    #[error("no provider registered under the name {0:?}")]
    ProviderNotFound(String),
}

impl RuntimeError {
    /// Whether the caller should surface this as a 409 Conflict rather than
    /// a 500 — spec §6: "concurrent decision on same proposal -> 409".
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ActiveRunExists | Self::CaseTerminal(_) | Self::ProposalAlreadyDecided { .. }
        )
    }

    /// Whether the caller should surface this as a 404 Not Found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CaseNotFound(_) | Self::ProposalNotFound(_))
    }
}
