use thiserror::Error;

/// Pipeline failures. Per spec §7, nodes never panic or throw — a node
/// that cannot proceed appends to `state.errors` and the pipeline
/// terminates with a `RUN_FAILED`-shaped outcome instead. This error type
/// exists only for the checkpoint (de)serialization boundary, which is the
/// one place a typed `Result` is the right shape.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to (de)serialize pipeline checkpoint: {0}")]
    Checkpoint(#[from] serde_json::Error),

    #[error("cannot resume: proposal has no checkpointed pipeline_state")]
    MissingCheckpoint,
}
