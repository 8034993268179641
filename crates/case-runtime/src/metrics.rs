//! Process-local counters for the Run Engine, mirroring the gateway's
//! metrics shape: one `AtomicU64` per outcome, relaxed ordering throughout,
//! and a point-in-time `snapshot()` for exporters.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RuntimeMetrics {
    /// Every call into [`crate::engine::dispatch`], regardless of outcome.
    pub runs_dispatched: AtomicU64,
    /// Runs whose pipeline invocation reached a terminal outcome.
    pub runs_completed: AtomicU64,
    /// Runs that errored out of the pipeline or a downstream store call.
    pub runs_failed: AtomicU64,
    /// Dispatches that conceded because the advisory lock was already held.
    pub runs_skipped_locked: AtomicU64,
    /// Dispatches that deduplicated against an already-active run.
    pub runs_active_run_exists: AtomicU64,
    /// Runs reclaimed by the stale-run reaper.
    pub runs_stale_reaped: AtomicU64,
    /// Executions that reached a provider and were accepted.
    pub executions_sent: AtomicU64,
    /// Executions with no provider to call (internal actions).
    pub executions_skipped: AtomicU64,
    /// Executions that exhausted retries and were pushed to the DLQ.
    pub executions_failed: AtomicU64,
    /// Auto-executable proposals held back by the outbound rate limit.
    pub executions_rate_limited: AtomicU64,
}

impl RuntimeMetrics {
    pub fn increment_runs_dispatched(&self) {
        self.runs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runs_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runs_skipped_locked(&self) {
        self.runs_skipped_locked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runs_active_run_exists(&self) {
        self.runs_active_run_exists.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_runs_stale_reaped(&self) {
        self.runs_stale_reaped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_executions_sent(&self) {
        self.executions_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_executions_skipped(&self) {
        self.executions_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_executions_failed(&self) {
        self.executions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_executions_rate_limited(&self) {
        self.executions_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    /// A consistent point-in-time view for exporters. Each field is read
    /// independently, so this is a snapshot, not a transaction.
    #[must_use]
    pub fn snapshot(&self) -> RuntimeMetricsSnapshot {
        RuntimeMetricsSnapshot {
            runs_dispatched: self.runs_dispatched.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            runs_skipped_locked: self.runs_skipped_locked.load(Ordering::Relaxed),
            runs_active_run_exists: self.runs_active_run_exists.load(Ordering::Relaxed),
            runs_stale_reaped: self.runs_stale_reaped.load(Ordering::Relaxed),
            executions_sent: self.executions_sent.load(Ordering::Relaxed),
            executions_skipped: self.executions_skipped.load(Ordering::Relaxed),
            executions_failed: self.executions_failed.load(Ordering::Relaxed),
            executions_rate_limited: self.executions_rate_limited.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RuntimeMetricsSnapshot {
    pub runs_dispatched: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub runs_skipped_locked: u64,
    pub runs_active_run_exists: u64,
    pub runs_stale_reaped: u64,
    pub executions_sent: u64,
    pub executions_skipped: u64,
    pub executions_failed: u64,
    pub executions_rate_limited: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = RuntimeMetrics::default();
        assert_eq!(metrics.snapshot().runs_dispatched, 0);
    }

    #[test]
    fn increments_are_reflected_in_snapshot() {
        let metrics = RuntimeMetrics::default();
        metrics.increment_runs_dispatched();
        metrics.increment_runs_dispatched();
        metrics.increment_executions_sent();
        let snap = metrics.snapshot();
        assert_eq!(snap.runs_dispatched, 2);
        assert_eq!(snap.executions_sent, 1);
    }
}
