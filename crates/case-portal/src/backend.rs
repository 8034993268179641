use async_trait::async_trait;
use case_provider::ProviderError;

/// A single portal submission attempt, stripped of anything a backend
/// doesn't need (the case/proposal themselves stay out of this crate).
#[derive(Debug, Clone)]
pub struct PortalSubmission {
    pub portal_url: String,
    pub content: Option<String>,
    pub instructions: Option<String>,
}

/// Result of a successful automated portal submission.
#[derive(Debug, Clone)]
pub struct PortalResult {
    /// Confirmation number the portal returned, if any.
    pub confirmation_number: Option<String>,
}

/// Trait for pluggable portal-automation backends. `case-portal` ships only
/// an HTTP-form backend; the trait exists so tests can substitute a fake
/// backend without reaching an agency's real portal.
#[async_trait]
pub trait PortalBackend: Send + Sync + std::fmt::Debug {
    async fn submit(&self, submission: &PortalSubmission) -> Result<PortalResult, ProviderError>;

    async fn health_check(&self, portal_url: &str) -> Result<(), ProviderError>;

    fn backend_name(&self) -> &'static str;
}
