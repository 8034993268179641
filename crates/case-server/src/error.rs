//! Failure modes surfaced at the HTTP boundary: [`case_runtime::RuntimeError`]
//! passes through via `#[from]`, plus the request-shape errors only this
//! layer can detect (an unparseable path segment, a decision action the
//! reducer has no route for).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use case_core::MessageId;
use case_runtime::RuntimeError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the inbound stimulus / decision / webhook endpoints.
///
/// Every variant carries (or derives) a `correlation_id` — the run id when
/// one exists, otherwise a fresh id minted for the request — so a caller
/// can hand the id back to an operator triaging logs (spec §7).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("store error: {0}")]
    Store(#[from] case_store::StoreError),

    #[error("message {0:?} not found for this case")]
    MessageNotFound(MessageId),

    #[error("no provider registered under the name {0:?}")]
    ProviderNotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ServerError {
    /// 409 for an active run, a bad decision action, or a stale (already
    /// decided) proposal; 404 for an unknown case or proposal; 500 for
    /// everything else.
    fn status(&self) -> StatusCode {
        match self {
            Self::Runtime(e) if e.is_conflict() => StatusCode::CONFLICT,
            Self::Runtime(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::MessageNotFound(_) => StatusCode::NOT_FOUND,
            Self::Runtime(_) | Self::Store(_) | Self::ProviderNotFound(_) | Self::Io(_) | Self::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let correlation_id = Uuid::now_v7();
        let body = serde_json::json!({
            "error": self.to_string(),
            "correlation_id": correlation_id,
        });
        (status, axum::Json(body)).into_response()
    }
}
