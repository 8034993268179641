use std::time::Duration;

use async_trait::async_trait;
use case_provider::ProviderError;
use reqwest::Client;
use serde::Deserialize;

use crate::backend::{PortalBackend, PortalResult, PortalSubmission};

/// Submits by POSTing a JSON payload directly to the portal's URL, the way
/// the few portal vendors with a public submission endpoint (e.g. NextRequest's
/// API mode) accept requests.
#[derive(Debug)]
pub struct HttpPortalBackend {
    client: Client,
}

impl HttpPortalBackend {
    #[must_use]
    pub fn new(request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Deserialize, Default)]
struct SubmissionResponse {
    confirmation_number: Option<String>,
}

#[async_trait]
impl PortalBackend for HttpPortalBackend {
    async fn submit(&self, submission: &PortalSubmission) -> Result<PortalResult, ProviderError> {
        let payload = serde_json::json!({
            "content": submission.content,
            "instructions": submission.instructions,
        });

        let response = self.client.post(&submission.portal_url).json(&payload).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(Duration::from_secs(0))
            } else if e.is_connect() {
                ProviderError::Connection(e.to_string())
            } else {
                ProviderError::ExecutionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::ExecutionFailed(format!("portal responded with {status}")));
        }

        let body: SubmissionResponse = response.json().await.unwrap_or_default();
        Ok(PortalResult { confirmation_number: body.confirmation_number })
    }

    async fn health_check(&self, portal_url: &str) -> Result<(), ProviderError> {
        self.client.head(portal_url).send().await.map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
