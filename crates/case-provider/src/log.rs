use tracing::info;

use crate::dispatch::{OutboundMessage, SendOutcome};
use crate::error::ProviderError;
use crate::provider::Provider;

/// A provider that logs the outbound message and returns a synthetic `SENT`
/// outcome without performing any external I/O.
///
/// Useful for local development and tests where you don't have (or need) a
/// real SMTP relay or portal endpoint.
pub struct LogProvider {
    name: String,
}

impl LogProvider {
    /// Create a new `LogProvider` with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Provider for LogProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
        info!(
            provider = %self.name,
            case_id = %message.case_id,
            proposal_id = %message.proposal_id,
            execution_key = %message.execution_key,
            action_type = ?message.action_type,
            "log provider sent message"
        );
        Ok(SendOutcome::sent(format!("log:{}", message.execution_key)))
    }

    #[allow(clippy::unused_async)]
    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use case_core::{ActionType, CaseId, ProposalId, ThreadHeaders};

    use super::*;

    fn sample_message() -> OutboundMessage {
        OutboundMessage {
            case_id: CaseId(1),
            proposal_id: ProposalId::new(),
            execution_key: "exec-1".into(),
            action_type: ActionType::SendInitialRequest,
            recipient_email: Some("records@agency.gov".into()),
            portal_url: None,
            subject: Some("Records request".into()),
            body: Some("body".into()),
            thread_headers: ThreadHeaders::default(),
        }
    }

    #[test]
    fn log_provider_name() {
        let provider = LogProvider::new("test-log");
        assert_eq!(Provider::name(&provider), "test-log");
    }

    #[tokio::test]
    async fn log_provider_send_returns_sent() {
        let provider = LogProvider::new("my-log");
        let outcome = Provider::send(&provider, &sample_message()).await.unwrap();
        assert_eq!(outcome.status, case_core::ExecutionStatus::Sent);
        assert_eq!(outcome.provider_message_id.as_deref(), Some("log:exec-1"));
    }

    #[tokio::test]
    async fn log_provider_health_check() {
        let provider = LogProvider::new("my-log");
        Provider::health_check(&provider).await.unwrap();
    }
}
