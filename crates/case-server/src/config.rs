//! TOML configuration, one section per concern (spec §6's configuration
//! table), mirrored here as `serde`-deserializable structs and converted
//! into each crate's own config type at startup — none of the upstream
//! config structs derive `Deserialize` themselves.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration loaded from `case-runtime.toml`. Every section
/// is `#[serde(default)]` so a partial (or absent) file still produces a
/// complete, runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CaseRuntimeConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub runtime: RuntimeConfigToml,
    pub executor: ExecutorConfigToml,
    pub pipeline: PipelineConfigToml,
    pub scheduler: SchedulerConfigToml,
    pub email: EmailConfigToml,
    pub portal: PortalConfigToml,
    pub telemetry: TelemetryConfig,
}

impl CaseRuntimeConfig {
    /// Load from `path` if it exists, otherwise fall back to an
    /// all-defaults configuration.
    pub fn load(path: &str) -> Result<Self, ServerError> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, shutdown_timeout_seconds: 30 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// When no `postgres` section is present (or the crate is built
    /// without the `postgres` feature), the server runs against an
    /// in-process store — suitable for development and tests, not for
    /// a multi-replica deployment since locks and runs aren't shared.
    pub backend: StoreBackend,
    pub url: String,
    pub pool_size: u32,
    pub ssl_mode: Option<String>,
    pub ssl_root_cert: Option<String>,
    pub ssl_cert: Option<String>,
    pub ssl_key: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: "postgres://localhost:5432/cases".to_string(),
            pool_size: 5,
            ssl_mode: None,
            ssl_root_cert: None,
            ssl_cert: None,
            ssl_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[cfg(feature = "postgres")]
impl From<&StoreConfig> for case_store_postgres::PostgresConfig {
    fn from(c: &StoreConfig) -> Self {
        Self {
            url: c.url.clone(),
            pool_size: c.pool_size,
            ssl_mode: c.ssl_mode.clone(),
            ssl_root_cert: c.ssl_root_cert.clone(),
            ssl_cert: c.ssl_cert.clone(),
            ssl_key: c.ssl_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfigToml {
    pub lock_ttl_seconds: u64,
    pub reap_after_seconds: u64,
    pub heartbeat_interval_seconds: u64,
    pub lock_acquire_timeout_seconds: u64,
    pub rate_limit_max: u32,
    pub rate_limit_window_seconds: u64,
}

impl Default for RuntimeConfigToml {
    fn default() -> Self {
        let d = case_runtime::RuntimeConfig::default();
        Self {
            lock_ttl_seconds: d.lock_ttl.as_secs(),
            reap_after_seconds: d.reap_after.as_secs(),
            heartbeat_interval_seconds: d.heartbeat_interval.as_secs(),
            lock_acquire_timeout_seconds: d.lock_acquire_timeout.as_secs(),
            rate_limit_max: d.rate_limit_max,
            rate_limit_window_seconds: d.rate_limit_window.as_secs(),
        }
    }
}

impl From<&RuntimeConfigToml> for case_runtime::RuntimeConfig {
    fn from(c: &RuntimeConfigToml) -> Self {
        Self {
            lock_ttl: Duration::from_secs(c.lock_ttl_seconds),
            reap_after: Duration::from_secs(c.reap_after_seconds),
            heartbeat_interval: Duration::from_secs(c.heartbeat_interval_seconds),
            lock_acquire_timeout: Duration::from_secs(c.lock_acquire_timeout_seconds),
            rate_limit_max: c.rate_limit_max,
            rate_limit_window: Duration::from_secs(c.rate_limit_window_seconds),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfigToml {
    pub max_retries: u32,
    pub execution_timeout_seconds: u64,
    pub max_concurrent: usize,
    pub rate_limit_max: u32,
    pub rate_limit_window_seconds: u64,
}

impl Default for ExecutorConfigToml {
    fn default() -> Self {
        let d = case_executor::ExecutorConfig::default();
        Self {
            max_retries: d.max_retries,
            execution_timeout_seconds: d.execution_timeout.as_secs(),
            max_concurrent: d.max_concurrent,
            rate_limit_max: d.rate_limit_max,
            rate_limit_window_seconds: d.rate_limit_window.as_secs(),
        }
    }
}

impl From<&ExecutorConfigToml> for case_executor::ExecutorConfig {
    fn from(c: &ExecutorConfigToml) -> Self {
        Self {
            max_retries: c.max_retries,
            retry_strategy: case_executor::RetryStrategy::default(),
            execution_timeout: Duration::from_secs(c.execution_timeout_seconds),
            max_concurrent: c.max_concurrent,
            rate_limit_max: c.rate_limit_max,
            rate_limit_window: Duration::from_secs(c.rate_limit_window_seconds),
        }
    }
}

/// Fee-threshold knobs; the safety policy's forbidden-phrase and
/// word-limit tables have no public setters upstream and are always the
/// built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfigToml {
    pub auto_approve_max: i64,
    pub negotiate_threshold: i64,
}

impl Default for PipelineConfigToml {
    fn default() -> Self {
        let d = case_pipeline::FeeThresholds::default();
        Self { auto_approve_max: d.auto_approve_max, negotiate_threshold: d.negotiate_threshold }
    }
}

impl From<&PipelineConfigToml> for case_pipeline::FeeThresholds {
    fn from(c: &PipelineConfigToml) -> Self {
        Self { auto_approve_max: c.auto_approve_max, negotiate_threshold: c.negotiate_threshold }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfigToml {
    pub followup_check_interval_seconds: u64,
    pub stale_run_check_interval_seconds: u64,
    pub portal_stuck_check_interval_seconds: u64,
    pub portal_stuck_threshold_seconds: u64,
    pub deadline_check_interval_seconds: u64,
    pub retention_check_interval_seconds: u64,
    pub ledger_retention_seconds: u64,
    pub followup_cadence_days: Vec<i64>,
    pub max_followups: u32,
    pub enable_followup_dispatch: bool,
    pub enable_stale_run_reaper: bool,
    pub enable_portal_stuck_reaper: bool,
    pub enable_deadline_sweep: bool,
    pub enable_retention_prune: bool,
}

impl Default for SchedulerConfigToml {
    fn default() -> Self {
        let d = case_scheduler::SchedulerConfig::default();
        Self {
            followup_check_interval_seconds: d.followup_check_interval.as_secs(),
            stale_run_check_interval_seconds: d.stale_run_check_interval.as_secs(),
            portal_stuck_check_interval_seconds: d.portal_stuck_check_interval.as_secs(),
            portal_stuck_threshold_seconds: d.portal_stuck_threshold.as_secs(),
            deadline_check_interval_seconds: d.deadline_check_interval.as_secs(),
            retention_check_interval_seconds: d.retention_check_interval.as_secs(),
            ledger_retention_seconds: d.ledger_retention.as_secs(),
            followup_cadence_days: d.followup_cadence_days,
            max_followups: d.max_followups,
            enable_followup_dispatch: d.enable_followup_dispatch,
            enable_stale_run_reaper: d.enable_stale_run_reaper,
            enable_portal_stuck_reaper: d.enable_portal_stuck_reaper,
            enable_deadline_sweep: d.enable_deadline_sweep,
            enable_retention_prune: d.enable_retention_prune,
        }
    }
}

impl From<&SchedulerConfigToml> for case_scheduler::SchedulerConfig {
    fn from(c: &SchedulerConfigToml) -> Self {
        Self {
            followup_check_interval: Duration::from_secs(c.followup_check_interval_seconds),
            stale_run_check_interval: Duration::from_secs(c.stale_run_check_interval_seconds),
            portal_stuck_check_interval: Duration::from_secs(c.portal_stuck_check_interval_seconds),
            portal_stuck_threshold: Duration::from_secs(c.portal_stuck_threshold_seconds),
            deadline_check_interval: Duration::from_secs(c.deadline_check_interval_seconds),
            retention_check_interval: Duration::from_secs(c.retention_check_interval_seconds),
            ledger_retention: Duration::from_secs(c.ledger_retention_seconds),
            followup_cadence_days: c.followup_cadence_days.clone(),
            max_followups: c.max_followups,
            enable_followup_dispatch: c.enable_followup_dispatch,
            enable_stale_run_reaper: c.enable_stale_run_reaper,
            enable_portal_stuck_reaper: c.enable_portal_stuck_reaper,
            enable_deadline_sweep: c.enable_deadline_sweep,
            enable_retention_prune: c.enable_retention_prune,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailConfigToml {
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<bool>,
    pub from_address: Option<String>,
}

impl EmailConfigToml {
    #[must_use]
    pub fn to_smtp_config(&self) -> case_email::SmtpConfig {
        let mut config = case_email::SmtpConfig::new(
            self.smtp_host.clone().unwrap_or_else(|| "localhost".to_string()),
            self.from_address.clone().unwrap_or_else(|| "noreply@localhost".to_string()),
        );
        if let Some(port) = self.smtp_port {
            config = config.with_port(port);
        }
        if let Some(tls) = self.tls {
            config = config.with_tls(tls);
        }
        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            config = config.with_credentials(user.clone(), pass.clone());
        }
        config
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortalConfigToml {
    pub automation_hosts: HashSet<String>,
    pub request_timeout_seconds: Option<u64>,
}

impl From<&PortalConfigToml> for case_portal::PortalConfig {
    fn from(c: &PortalConfigToml) -> Self {
        let mut config = Self { automation_hosts: c.automation_hosts.clone(), ..Default::default() };
        if let Some(secs) = c.request_timeout_seconds {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}

/// OpenTelemetry export settings for traces and metrics.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub service_name: String,
    pub sample_ratio: f64,
    pub protocol: String,
    pub timeout_seconds: u64,
    pub resource_attributes: std::collections::HashMap<String, String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:4317".to_string(),
            service_name: "case-runtime".to_string(),
            sample_ratio: 1.0,
            protocol: "grpc".to_string(),
            timeout_seconds: 10,
            resource_attributes: std::collections::HashMap::new(),
        }
    }
}
