use thiserror::Error;

/// Errors surfaced by [`crate::ProposalExecutor::execute`] that are not
/// themselves a provider failure (those are captured as
/// [`ExecutionOutcome::Failed`](crate::ExecutionOutcome::Failed) instead).
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Store(#[from] case_store::StoreError),
}
