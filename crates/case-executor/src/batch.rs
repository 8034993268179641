use case_provider::{DynProvider, OutboundMessage};

use crate::executor::{ExecutionOutcome, ProposalExecutor};

/// Send a batch of outbound messages against a single provider.
///
/// The executor's internal semaphore ensures that no more than
/// [`ExecutorConfig::max_concurrent`](crate::ExecutorConfig::max_concurrent)
/// sends run in parallel.
///
/// Results are returned in the same order as the input `messages` slice.
///
/// # Examples
///
/// ```no_run
/// # use case_provider::OutboundMessage;
/// # use case_executor::{ExecutorConfig, ProposalExecutor, batch::execute_batch};
/// # async fn example(provider: &dyn case_provider::DynProvider) {
/// let executor = ProposalExecutor::new(ExecutorConfig::default());
/// let messages: Vec<OutboundMessage> = vec![];
/// let outcomes = execute_batch(&executor, &messages, provider).await;
/// assert_eq!(outcomes.len(), messages.len());
/// # }
/// ```
pub async fn execute_batch(
    executor: &ProposalExecutor,
    messages: &[OutboundMessage],
    provider: &dyn DynProvider,
) -> Vec<ExecutionOutcome> {
    // Sequential await is correct here: the semaphore still limits how many
    // *running* provider calls exist at once across all callers of the
    // executor. For true fan-out within a single batch call, spawn tasks.
    let mut outcomes = Vec::with_capacity(messages.len());
    let futs: Vec<_> = messages.iter().map(|message| executor.execute(message, provider)).collect();

    for fut in futs {
        outcomes.push(fut.await);
    }

    outcomes
}

#[cfg(test)]
#[allow(clippy::unnecessary_literal_bound)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use case_core::{ActionType, CaseId, ProposalId, ThreadHeaders};
    use case_provider::{ProviderError, SendOutcome};

    use crate::config::ExecutorConfig;
    use crate::retry::RetryStrategy;

    struct CountingProvider {
        count: AtomicU32,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                count: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl DynProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn send(&self, _message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(SendOutcome::sent("counting-id"))
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn test_message() -> OutboundMessage {
        OutboundMessage {
            case_id: CaseId(1),
            proposal_id: ProposalId::new(),
            execution_key: "exec-1".into(),
            action_type: ActionType::SendInitialRequest,
            recipient_email: Some("agency@example.gov".into()),
            portal_url: None,
            subject: Some("Records request".into()),
            body: Some("body".into()),
            thread_headers: ThreadHeaders::default(),
        }
    }

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            max_retries: 0,
            retry_strategy: RetryStrategy::Constant {
                delay: Duration::from_millis(1),
            },
            execution_timeout: Duration::from_secs(5),
            max_concurrent: 10,
            rate_limit_max: 3,
            rate_limit_window: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn batch_returns_all_outcomes() {
        let executor = ProposalExecutor::new(fast_config());
        let provider = CountingProvider::new();
        let messages: Vec<OutboundMessage> = (0..5).map(|_| test_message()).collect();

        let outcomes = execute_batch(&executor, &messages, &provider).await;

        assert_eq!(outcomes.len(), 5);
        for outcome in &outcomes {
            assert!(matches!(outcome, ExecutionOutcome::Sent(_)));
        }
        assert_eq!(provider.count.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn batch_empty_input() {
        let executor = ProposalExecutor::new(fast_config());
        let provider = CountingProvider::new();
        let outcomes = execute_batch(&executor, &[], &provider).await;
        assert!(outcomes.is_empty());
    }
}
