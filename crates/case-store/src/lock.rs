use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// A held distributed lock. Dropping without explicit release is allowed
/// (the lock will expire after its TTL), but explicit release is preferred.
///
/// This is the mechanism behind spec §5's "(b) a database advisory lock
/// keyed by `hash(case_id)` acquired before pipeline execution" — it
/// prevents two long-running pipeline invocations for the same case from
/// overlapping even if the `agent_runs` partial unique index momentarily
/// allows it (e.g. during a crash-recovery race).
#[async_trait]
pub trait LockGuard: Send + Sync {
    /// Extend the lock's TTL.
    async fn extend(&self, duration: Duration) -> Result<(), StoreError>;

    /// Explicitly release the lock.
    async fn release(self: Box<Self>) -> Result<(), StoreError>;

    /// Check if the lock is still held by this guard.
    async fn is_held(&self) -> Result<bool, StoreError>;
}

/// Trait for acquiring distributed locks keyed by name (case id hash, or a
/// scheduler job name for the leader-lease sweeps).
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Try to acquire a lock with the given name and TTL.
    /// Returns `None` if the lock is already held by another owner.
    async fn try_acquire(
        &self,
        name: &str,
        ttl: Duration,
    ) -> Result<Option<Box<dyn LockGuard>>, StoreError>;

    /// Acquire a lock, polling until `timeout` elapses.
    async fn acquire(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify object safety of both traits.
    fn _assert_dyn_lock_guard(_: &dyn LockGuard) {}
    fn _assert_dyn_distributed_lock(_: &dyn DistributedLock) {}
}
