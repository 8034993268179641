//! Runtime Transition (C3) + Run Engine (C4): the single-flight dispatcher
//! that sits between the HTTP/scheduler layer and the pure
//! [`case_reducer`]/[`case_pipeline`] logic.
//!
//! [`transition::apply_event`] is the one place any caller is allowed to
//! write a [`case_core::CaseEvent`] into the ledger; [`engine::dispatch`]
//! and [`decision::post_decision`] are the two entrypoints that drive a run
//! from claim through to a terminal `RUN_*` event.

pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod execution;
pub mod metrics;
mod outcome;
pub mod routing;
#[cfg(test)]
mod support;
pub mod transition;

use std::sync::Arc;

pub use config::RuntimeConfig;
pub use decision::post_decision;
pub use engine::{dispatch, reap_stale_runs, DispatchOutcome};
pub use error::RuntimeError;
pub use metrics::{RuntimeMetrics, RuntimeMetricsSnapshot};

/// A [`case_store::CaseStore`] shared across the dispatcher and its spawned
/// heartbeat task.
pub type SharedStore = Arc<dyn case_store::CaseStore>;

/// A [`case_store::DistributedLock`] shared the same way.
pub type SharedLock = Arc<dyn case_store::DistributedLock>;

/// Deterministic advisory-lock name for a case — hashed the same way
/// regardless of backend so the Postgres advisory-lock adapter and the
/// in-memory test lock agree on identity.
#[must_use]
pub fn lock_name_for(case_id: case_core::CaseId) -> String {
    format!("case:{case_id}")
}
