//! Tunables for the Run Engine (spec §6's configuration defaults).
//!
//! `reap_after` follows the canonical config table (§6) and the literal
//! "now - 60 s" threshold in §4.4 step 8, not the "120 s" figure given in
//! that section's invariant prose — the two disagree and the config table
//! plus the worked example win.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// `T_lock`: how long a claimed run holds its advisory lock and lock
    /// row before it is eligible for reclamation.
    pub lock_ttl: Duration,
    /// `T_reap`: how long a running run may go without a heartbeat before
    /// the stale-run reaper fails it.
    pub reap_after: Duration,
    /// Cadence at which a dispatched run renews its heartbeat.
    pub heartbeat_interval: Duration,
    /// How long `DistributedLock::acquire` polls before giving up when used
    /// in a blocking context (the decision endpoint; dispatch uses
    /// `try_acquire` and never blocks).
    pub lock_acquire_timeout: Duration,
    /// Outbound rate limit window and ceiling per case (spec §4.6).
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(120),
            reap_after: Duration::from_secs(60),
            heartbeat_interval: Duration::from_secs(10),
            lock_acquire_timeout: Duration::from_secs(5),
            rate_limit_max: 3,
            rate_limit_window: Duration::from_secs(3600),
        }
    }
}
