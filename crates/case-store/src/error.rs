use thiserror::Error;

/// Errors from the case store and its distributed lock.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("case {0} not found")]
    CaseNotFound(case_core::CaseId),

    #[error("lock contention: {0}")]
    LockContention(String),

    #[error("lock expired: {0}")]
    LockExpired(String),

    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}
