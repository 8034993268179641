use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use case_provider::{DynProvider, OutboundMessage, ProviderError, SendOutcome};

use crate::config::ExecutorConfig;

/// The final, retry-exhausted result of a single [`ProposalExecutor::execute`]
/// call.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// The provider accepted the send.
    Sent(SendOutcome),
    /// Every retry attempt failed (or the error was non-retryable).
    Failed {
        code: String,
        message: String,
        retryable: bool,
        attempts: u32,
    },
}

/// Sends a claimed proposal's outbound message through a provider with retry
/// logic and bounded concurrency (C7).
///
/// The executor acquires a semaphore permit before each send so that at most
/// [`ExecutorConfig::max_concurrent`] sends run in parallel. Failed attempts
/// that yield a retryable error are retried up to [`ExecutorConfig::max_retries`]
/// times with delays computed by the configured
/// [`RetryStrategy`](crate::RetryStrategy). Exhausted retries or a
/// non-retryable error are the caller's signal to write the send to the dead
/// letter queue.
pub struct ProposalExecutor {
    config: ExecutorConfig,
    semaphore: Arc<Semaphore>,
}

impl ProposalExecutor {
    /// Create a new executor from the given configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use case_executor::{ExecutorConfig, ProposalExecutor};
    ///
    /// let executor = ProposalExecutor::new(ExecutorConfig::default());
    /// ```
    pub fn new(config: ExecutorConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self { config, semaphore }
    }

    /// Return a reference to the executor configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Send an outbound message through the given provider.
    ///
    /// Acquires a concurrency permit, then enters a retry loop. On a
    /// retryable error the executor sleeps for the duration prescribed by
    /// the retry strategy before attempting again. Non-retryable errors
    /// cause an immediate failure.
    #[instrument(skip(self, message, provider), fields(case_id = %message.case_id, execution_key = %message.execution_key, attempt))]
    pub async fn execute(&self, message: &OutboundMessage, provider: &dyn DynProvider) -> ExecutionOutcome {
        // Acquire a concurrency permit. This is cancel-safe: if the caller
        // drops the future while waiting, the permit is never acquired.
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore should never be closed");

        let mut last_error: Option<ProviderError> = None;

        for attempt in 0..=self.config.max_retries {
            tracing::Span::current().record("attempt", attempt);
            debug!(
                execution_key = %message.execution_key,
                attempt,
                max_retries = self.config.max_retries,
                "sending outbound message"
            );

            let result = tokio::time::timeout(self.config.execution_timeout, provider.send(message)).await;

            match result {
                Ok(Ok(outcome)) => {
                    debug!(execution_key = %message.execution_key, "send succeeded");
                    return ExecutionOutcome::Sent(outcome);
                }
                Ok(Err(err)) => {
                    if err.is_retryable() && attempt < self.config.max_retries {
                        let delay = self.config.retry_strategy.delay_for(attempt);
                        warn!(
                            execution_key = %message.execution_key,
                            attempt,
                            error = %err,
                            delay_ms = %delay.as_millis(),
                            "retryable error, will retry"
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(err);
                    } else {
                        warn!(
                            execution_key = %message.execution_key,
                            attempt,
                            error = %err,
                            retryable = err.is_retryable(),
                            "send failed"
                        );
                        return ExecutionOutcome::Failed {
                            code: error_code(&err),
                            message: err.to_string(),
                            retryable: err.is_retryable(),
                            attempts: attempt + 1,
                        };
                    }
                }
                Err(_elapsed) => {
                    let err = ProviderError::Timeout(self.config.execution_timeout);
                    if attempt < self.config.max_retries {
                        let delay = self.config.retry_strategy.delay_for(attempt);
                        warn!(
                            execution_key = %message.execution_key,
                            attempt,
                            timeout = ?self.config.execution_timeout,
                            delay_ms = %delay.as_millis(),
                            "send timed out, will retry"
                        );
                        tokio::time::sleep(delay).await;
                        last_error = Some(err);
                    } else {
                        warn!(
                            execution_key = %message.execution_key,
                            attempt,
                            "send timed out, no retries left"
                        );
                        return ExecutionOutcome::Failed {
                            code: error_code(&err),
                            message: err.to_string(),
                            retryable: true,
                            attempts: attempt + 1,
                        };
                    }
                }
            }
        }

        // Only reached if max_retries > 0 and every attempt was retryable.
        let err = last_error.expect("at least one error must have occurred");
        ExecutionOutcome::Failed {
            code: error_code(&err),
            message: err.to_string(),
            retryable: err.is_retryable(),
            attempts: self.config.max_retries + 1,
        }
    }
}

/// Map a [`ProviderError`] variant to a short error code string.
fn error_code(err: &ProviderError) -> String {
    match err {
        ProviderError::NotFound(_) => "NOT_FOUND".into(),
        ProviderError::ExecutionFailed(_) => "EXECUTION_FAILED".into(),
        ProviderError::Timeout(_) => "TIMEOUT".into(),
        ProviderError::Connection(_) => "CONNECTION".into(),
        ProviderError::Configuration(_) => "CONFIGURATION".into(),
        ProviderError::RateLimited => "RATE_LIMITED".into(),
        ProviderError::Serialization(_) => "SERIALIZATION".into(),
    }
}
