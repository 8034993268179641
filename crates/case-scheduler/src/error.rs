use case_runtime::RuntimeError;
use case_store::StoreError;
use thiserror::Error;

/// Failure modes surfaced by a single sweep tick. A job returning `Err`
/// does not stop the processor; the tick is logged and counted, and the
/// next tick tries again (spec §4.7's sweeps are retried, not aborted).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}
