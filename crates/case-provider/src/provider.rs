use async_trait::async_trait;

use crate::dispatch::{OutboundMessage, SendOutcome};
use crate::error::ProviderError;

/// Strongly-typed provider trait with native `async fn`.
///
/// This trait is **not** object-safe because it uses native `async fn`
/// methods (which desugar to opaque `impl Future` return types). If you need
/// dynamic dispatch, use [`DynProvider`] instead -- every `Provider`
/// automatically implements `DynProvider` via a blanket implementation.
pub trait Provider: Send + Sync {
    /// Returns the unique name of this provider (`email`, `portal`, ...).
    fn name(&self) -> &str;

    /// Attempt a single send. Implements one half of the C7 executor
    /// contract; the caller is responsible for claiming `execution_key`
    /// before calling and for retry/DLQ bookkeeping around the result.
    fn send(
        &self,
        message: &OutboundMessage,
    ) -> impl std::future::Future<Output = Result<SendOutcome, ProviderError>> + Send;

    /// Perform a health check to verify the provider is operational.
    fn health_check(&self) -> impl std::future::Future<Output = Result<(), ProviderError>> + Send;
}

/// Object-safe provider trait for use behind `Arc<dyn DynProvider>`.
///
/// Uses [`macro@async_trait`] to enable dynamic dispatch of async methods.
/// You generally should not implement this trait directly -- instead
/// implement [`Provider`] and rely on the blanket implementation.
#[async_trait]
pub trait DynProvider: Send + Sync {
    /// Returns the unique name of this provider.
    fn name(&self) -> &str;

    /// Attempt a single send.
    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError>;

    /// Perform a health check to verify the provider is operational.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Blanket implementation: any type that implements [`Provider`] also
/// implements [`DynProvider`], bridging the static and dynamic dispatch
/// worlds.
#[async_trait]
impl<T: Provider + Sync> DynProvider for T {
    fn name(&self) -> &str {
        Provider::name(self)
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
        Provider::send(self, message).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Provider::health_check(self).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use case_core::{ActionType, CaseId, ProposalId, ThreadHeaders};

    use super::*;

    fn sample_message() -> OutboundMessage {
        OutboundMessage {
            case_id: CaseId(1),
            proposal_id: ProposalId::new(),
            execution_key: "exec-key".into(),
            action_type: ActionType::SendInitialRequest,
            recipient_email: Some("records@agency.gov".into()),
            portal_url: None,
            subject: Some("Records request".into()),
            body: Some("body".into()),
            thread_headers: ThreadHeaders::default(),
        }
    }

    /// A mock provider for testing the trait and blanket impl.
    struct MockProvider {
        provider_name: String,
        should_fail: bool,
    }

    impl MockProvider {
        fn new(name: &str, should_fail: bool) -> Self {
            Self {
                provider_name: name.to_owned(),
                should_fail,
            }
        }
    }

    impl Provider for MockProvider {
        fn name(&self) -> &str {
            &self.provider_name
        }

        async fn send(&self, _message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
            if self.should_fail {
                return Err(ProviderError::ExecutionFailed("mock failure".into()));
            }
            Ok(SendOutcome::sent("mock-provider-id"))
        }

        async fn health_check(&self) -> Result<(), ProviderError> {
            if self.should_fail {
                return Err(ProviderError::Connection("mock unhealthy".into()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn provider_send_success() {
        let provider = MockProvider::new("test", false);
        let outcome = Provider::send(&provider, &sample_message()).await.unwrap();
        assert_eq!(outcome.status, case_core::ExecutionStatus::Sent);
    }

    #[tokio::test]
    async fn provider_send_failure() {
        let provider = MockProvider::new("test", true);
        let err = Provider::send(&provider, &sample_message())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn blanket_dyn_provider_impl() {
        let provider: Arc<dyn DynProvider> = Arc::new(MockProvider::new("dyn-test", false));
        assert_eq!(provider.name(), "dyn-test");

        let outcome = provider.send(&sample_message()).await.unwrap();
        assert_eq!(outcome.status, case_core::ExecutionStatus::Sent);

        provider.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn dyn_provider_health_check_failure() {
        let provider: Arc<dyn DynProvider> = Arc::new(MockProvider::new("sick", true));
        let err = provider.health_check().await.unwrap_err();
        assert!(matches!(err, ProviderError::Connection(_)));
    }
}
