use case_provider::{OutboundMessage, Provider, ProviderError, SendOutcome};
use tracing::{debug, info, instrument};

use crate::backend::{EmailBackend, EmailMessage};
use crate::config::SmtpConfig;
use crate::smtp::SmtpBackend;

/// Email delivery provider (C7). Adapts an [`EmailBackend`] to the common
/// [`Provider`] contract used by the proposal executor.
pub struct EmailProvider {
    from_address: String,
    backend: Box<dyn EmailBackend>,
}

impl std::fmt::Debug for EmailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailProvider")
            .field("from_address", &self.from_address)
            .field("backend", &self.backend)
            .finish()
    }
}

impl EmailProvider {
    /// Create a new `EmailProvider` backed by SMTP, using the given config.
    ///
    /// Returns a [`ProviderError::Configuration`] if the SMTP transport
    /// cannot be built.
    pub fn new(config: &SmtpConfig) -> Result<Self, ProviderError> {
        let backend = SmtpBackend::new(config.clone())?;
        Ok(Self {
            from_address: config.from_address.clone(),
            backend: Box::new(backend),
        })
    }

    /// Create an `EmailProvider` with a pre-built backend (for testing).
    pub fn with_backend(from_address: impl Into<String>, backend: Box<dyn EmailBackend>) -> Self {
        Self {
            from_address: from_address.into(),
            backend,
        }
    }

    /// Create an `EmailProvider` with a pre-built SMTP transport (for testing).
    pub fn with_transport(
        config: &SmtpConfig,
        transport: lettre::AsyncSmtpTransport<lettre::Tokio1Executor>,
    ) -> Self {
        let backend = SmtpBackend::with_transport(config.clone(), transport);
        Self {
            from_address: config.from_address.clone(),
            backend: Box::new(backend),
        }
    }
}

impl Provider for EmailProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "email"
    }

    #[instrument(skip(self, message), fields(case_id = %message.case_id, execution_key = %message.execution_key, provider = "email"))]
    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
        let recipient = message
            .recipient_email
            .clone()
            .ok_or_else(|| ProviderError::Configuration("outbound message has no recipient email".to_owned()))?;

        let email_message = EmailMessage {
            from: self.from_address.clone(),
            to: recipient,
            subject: message.subject.clone().unwrap_or_default(),
            body: message.body.clone(),
            html_body: None,
            reply_to: None,
            thread_headers: message.thread_headers.clone(),
        };

        debug!(
            to = %email_message.to,
            subject = %email_message.subject,
            backend = self.backend.backend_name(),
            "sending email"
        );

        let result = self.backend.send(&email_message).await?;

        info!(
            to = %email_message.to,
            backend = self.backend.backend_name(),
            "email sent successfully"
        );

        Ok(SendOutcome::sent(result.message_id.unwrap_or_default()))
    }

    #[instrument(skip(self), fields(provider = "email"))]
    async fn health_check(&self) -> Result<(), ProviderError> {
        self.backend.health_check().await
    }
}
