//! Process-local counters for the five sweeps, one `AtomicU64` per outcome
//! in the same shape as [`case_runtime::RuntimeMetrics`].

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    pub followups_dispatched: AtomicU64,
    pub followups_escalated: AtomicU64,
    pub followups_errored: AtomicU64,
    pub stale_runs_reaped: AtomicU64,
    pub portal_tasks_marked_stuck: AtomicU64,
    pub deadline_escalations_dispatched: AtomicU64,
    pub ledger_rows_pruned: AtomicU64,
    /// Any sweep tick that returned an `Err` rather than completing.
    pub sweep_errors: AtomicU64,
}

impl SchedulerMetrics {
    pub fn increment_followups_dispatched(&self) {
        self.followups_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_followups_escalated(&self) {
        self.followups_escalated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_followups_errored(&self) {
        self.followups_errored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stale_runs_reaped_by(&self, count: u64) {
        self.stale_runs_reaped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_portal_tasks_marked_stuck(&self) {
        self.portal_tasks_marked_stuck.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deadline_escalations_dispatched(&self) {
        self.deadline_escalations_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_ledger_rows_pruned(&self, count: u64) {
        self.ledger_rows_pruned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_sweep_errors(&self) {
        self.sweep_errors.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> SchedulerMetricsSnapshot {
        SchedulerMetricsSnapshot {
            followups_dispatched: self.followups_dispatched.load(Ordering::Relaxed),
            followups_escalated: self.followups_escalated.load(Ordering::Relaxed),
            followups_errored: self.followups_errored.load(Ordering::Relaxed),
            stale_runs_reaped: self.stale_runs_reaped.load(Ordering::Relaxed),
            portal_tasks_marked_stuck: self.portal_tasks_marked_stuck.load(Ordering::Relaxed),
            deadline_escalations_dispatched: self.deadline_escalations_dispatched.load(Ordering::Relaxed),
            ledger_rows_pruned: self.ledger_rows_pruned.load(Ordering::Relaxed),
            sweep_errors: self.sweep_errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct SchedulerMetricsSnapshot {
    pub followups_dispatched: u64,
    pub followups_escalated: u64,
    pub followups_errored: u64,
    pub stale_runs_reaped: u64,
    pub portal_tasks_marked_stuck: u64,
    pub deadline_escalations_dispatched: u64,
    pub ledger_rows_pruned: u64,
    pub sweep_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(SchedulerMetrics::default().snapshot().followups_dispatched, 0);
    }

    #[test]
    fn increments_are_reflected_in_snapshot() {
        let metrics = SchedulerMetrics::default();
        metrics.increment_followups_dispatched();
        metrics.increment_stale_runs_reaped_by(3);
        let snap = metrics.snapshot();
        assert_eq!(snap.followups_dispatched, 1);
        assert_eq!(snap.stale_runs_reaped, 3);
    }
}
