use thiserror::Error;

/// Top-level error type shared by crates that have no more specific error of
/// their own. Most crates (`case-reducer`, `case-store`, `case-pipeline`,
/// `case-runtime`, `case-executor`, `case-server`) define a narrower error
/// enum and convert into or out of this one at their boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
