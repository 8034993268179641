//! The HTTP API (C9): the inbound stimulus surface spec §6 describes,
//! layered over [`case_runtime`]'s dispatch/decision entrypoints and
//! [`case_scheduler`]'s background sweeps.

pub mod api;
pub mod config;
pub mod error;
pub mod providers;
pub mod telemetry;
