use async_trait::async_trait;
use case_core::ThreadHeaders;
use case_provider::ProviderError;

/// A unified email message representation shared across all backends,
/// carrying the RFC-5322 threading headers that preserve thread continuity
/// across a case's correspondence (spec §4.6).
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: Option<String>,
    pub html_body: Option<String>,
    pub reply_to: Option<String>,
    pub thread_headers: ThreadHeaders,
}

/// Result of a successful email send operation.
#[derive(Debug, Clone)]
pub struct EmailResult {
    /// Provider-assigned message identifier (if available).
    pub message_id: Option<String>,
}

/// Trait for pluggable email delivery backends. `case-email` ships only an
/// SMTP implementation; the trait exists so tests can substitute a fake
/// backend without standing up a real SMTP relay.
#[async_trait]
pub trait EmailBackend: Send + Sync + std::fmt::Debug {
    async fn send(&self, message: &EmailMessage) -> Result<EmailResult, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;

    fn backend_name(&self) -> &'static str;
}
