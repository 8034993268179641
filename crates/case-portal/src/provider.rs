use case_provider::{OutboundMessage, Provider, ProviderError, SendOutcome};
use tracing::{debug, info, instrument, warn};

use crate::backend::{PortalBackend, PortalSubmission};
use crate::config::PortalConfig;
use crate::http::HttpPortalBackend;

/// Portal submission provider (C7). Attempts an automated HTTP submission
/// for portals this deployment has an integration for; everything else is
/// handed to a human by returning [`SendOutcome::pending_human`], which
/// `case-runtime` turns into a `PortalTask`.
pub struct PortalProvider {
    config: PortalConfig,
    backend: Box<dyn PortalBackend>,
}

impl std::fmt::Debug for PortalProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalProvider").field("config", &self.config).field("backend", &self.backend).finish()
    }
}

impl PortalProvider {
    /// Create a `PortalProvider` backed by [`HttpPortalBackend`].
    #[must_use]
    pub fn new(config: PortalConfig) -> Self {
        let backend = HttpPortalBackend::new(config.request_timeout);
        Self { config, backend: Box::new(backend) }
    }

    /// Create a `PortalProvider` with a pre-built backend (for testing).
    #[must_use]
    pub fn with_backend(config: PortalConfig, backend: Box<dyn PortalBackend>) -> Self {
        Self { config, backend }
    }
}

impl Provider for PortalProvider {
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "portal"
    }

    #[instrument(skip(self, message), fields(case_id = %message.case_id, execution_key = %message.execution_key, provider = "portal"))]
    async fn send(&self, message: &OutboundMessage) -> Result<SendOutcome, ProviderError> {
        let portal_url = message
            .portal_url
            .clone()
            .ok_or_else(|| ProviderError::Configuration("outbound message has no portal url".to_owned()))?;

        if !self.config.is_automated(&portal_url) {
            debug!(%portal_url, "no automation integration for this portal; routing to a human");
            return Ok(SendOutcome::pending_human());
        }

        let submission = PortalSubmission {
            portal_url: portal_url.clone(),
            content: message.body.clone(),
            instructions: None,
        };

        match self.backend.submit(&submission).await {
            Ok(result) => {
                info!(%portal_url, backend = self.backend.backend_name(), "portal submission completed");
                Ok(SendOutcome::sent(result.confirmation_number.unwrap_or_default()))
            }
            Err(err) if err.is_retryable() => Err(err),
            Err(err) => {
                // A non-retryable automation failure (e.g. the portal
                // changed its form) still has a human fallback; degrade to
                // a PortalTask instead of failing the execution outright.
                warn!(%portal_url, error = %err, "automated portal submission failed; falling back to a human");
                Ok(SendOutcome::pending_human())
            }
        }
    }

    #[instrument(skip(self), fields(provider = "portal"))]
    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
