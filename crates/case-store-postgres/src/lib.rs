//! `PostgreSQL`-backed [`case_store::CaseStore`] and [`case_store::DistributedLock`].

pub mod config;
pub mod lock;
pub mod migrations;
pub mod store;

pub use config::PostgresConfig;
pub use lock::{PostgresDistributedLock, PostgresLockGuard};
pub use store::PostgresCaseStore;
