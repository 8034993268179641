use std::time::Duration;

use crate::retry::RetryStrategy;

/// Configuration for the [`ProposalExecutor`](crate::ProposalExecutor).
///
/// Controls retry behaviour, concurrency limits, per-send timeouts, and the
/// per-case outbound rate limit (spec §4.6).
///
/// # Examples
///
/// ```
/// use case_executor::ExecutorConfig;
///
/// let config = ExecutorConfig::default();
/// assert_eq!(config.max_retries, 3);
/// assert_eq!(config.max_concurrent, 10);
/// assert_eq!(config.rate_limit_max, 3);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of retry attempts before a send is written to the DLQ.
    pub max_retries: u32,
    /// Strategy used to compute the delay between retries.
    pub retry_strategy: RetryStrategy,
    /// Maximum wall-clock time allowed for a single provider send call.
    pub execution_timeout: Duration,
    /// Maximum number of sends that may execute concurrently. Enforced via a
    /// [`tokio::sync::Semaphore`].
    pub max_concurrent: usize,
    /// Maximum outbound executions allowed per case within `rate_limit_window`.
    pub rate_limit_max: u32,
    /// Sliding window over which `rate_limit_max` is enforced.
    pub rate_limit_window: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_strategy: RetryStrategy::default(),
            execution_timeout: Duration::from_secs(30),
            max_concurrent: 10,
            rate_limit_max: 3,
            rate_limit_window: Duration::from_secs(3600),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ExecutorConfig::default();
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.execution_timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_concurrent, 10);
        assert_eq!(cfg.rate_limit_max, 3);
        assert_eq!(cfg.rate_limit_window, Duration::from_secs(3600));
    }

    #[test]
    fn config_custom_values() {
        let cfg = ExecutorConfig {
            max_retries: 5,
            retry_strategy: RetryStrategy::Constant {
                delay: Duration::from_secs(1),
            },
            execution_timeout: Duration::from_secs(60),
            max_concurrent: 50,
            rate_limit_max: 10,
            rate_limit_window: Duration::from_secs(60),
        };
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.execution_timeout, Duration::from_secs(60));
        assert_eq!(cfg.max_concurrent, 50);
    }
}
