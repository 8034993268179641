//! Tunables for the five sweeps (spec §4.7's cadence table).

use std::time::Duration;

#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct SchedulerConfig {
    /// How often to scan `FollowupSchedule` for due rows (default: 5 min).
    pub followup_check_interval: Duration,
    /// How often to run the stale-run reaper (default: 30 s). The reclaim
    /// threshold itself lives on `case_runtime::RuntimeConfig::reap_after`.
    pub stale_run_check_interval: Duration,
    /// How often to scan for stuck portal tasks (default: 30 min).
    pub portal_stuck_check_interval: Duration,
    /// A `Pending` portal task older than this is marked `Stuck` (default: 24h).
    pub portal_stuck_threshold: Duration,
    /// How often to run the deadline sweep (default: daily).
    pub deadline_check_interval: Duration,
    /// How often to run the retention pruner (default: daily).
    pub retention_check_interval: Duration,
    /// Ledger rows older than this are pruned (default: 90 days).
    pub ledger_retention: Duration,
    /// `followup_cadence_days[followup_count]` gives the number of days
    /// until the next followup after the current one fires; the last
    /// entry repeats once `followup_count` runs past the list's end.
    pub followup_cadence_days: Vec<i64>,
    /// A followup schedule at or past this count is no longer advanced;
    /// the case is escalated to the phone queue instead (default: 3).
    pub max_followups: u32,
    /// Whether each sweep is enabled. All default to `true`; a deployment
    /// running the scheduler out-of-process from the dispatcher (or not
    /// at all, e.g. in a read replica) can disable individual sweeps.
    pub enable_followup_dispatch: bool,
    pub enable_stale_run_reaper: bool,
    pub enable_portal_stuck_reaper: bool,
    pub enable_deadline_sweep: bool,
    pub enable_retention_prune: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            followup_check_interval: Duration::from_secs(5 * 60),
            stale_run_check_interval: Duration::from_secs(30),
            portal_stuck_check_interval: Duration::from_secs(30 * 60),
            portal_stuck_threshold: Duration::from_secs(24 * 60 * 60),
            deadline_check_interval: Duration::from_secs(24 * 60 * 60),
            retention_check_interval: Duration::from_secs(24 * 60 * 60),
            ledger_retention: Duration::from_secs(90 * 24 * 60 * 60),
            followup_cadence_days: vec![7, 14, 21],
            max_followups: 3,
            enable_followup_dispatch: true,
            enable_stale_run_reaper: true,
            enable_portal_stuck_reaper: true,
            enable_deadline_sweep: true,
            enable_retention_prune: true,
        }
    }
}

impl SchedulerConfig {
    /// Days until the next followup after `followup_count` has just fired.
    #[must_use]
    pub fn cadence_days_for(&self, followup_count: u32) -> i64 {
        let idx = (followup_count as usize).min(self.followup_cadence_days.len().saturating_sub(1));
        self.followup_cadence_days.get(idx).copied().unwrap_or(7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_repeats_last_entry_past_the_list() {
        let config = SchedulerConfig::default();
        assert_eq!(config.cadence_days_for(0), 7);
        assert_eq!(config.cadence_days_for(1), 14);
        assert_eq!(config.cadence_days_for(2), 21);
        assert_eq!(config.cadence_days_for(5), 21);
    }

    #[test]
    fn defaults_match_the_cadence_table() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_followups, 3);
        assert_eq!(config.followup_check_interval, Duration::from_secs(300));
        assert_eq!(config.portal_stuck_threshold, Duration::from_secs(86_400));
    }
}
