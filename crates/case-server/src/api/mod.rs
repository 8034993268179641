pub mod cases;
pub mod dlq;
pub mod health;
pub mod openapi;
pub mod proposals;
pub mod schemas;
pub mod webhooks;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use case_executor::dlq::DeadLetterSink;
use case_executor::ProposalExecutor;
use case_pipeline::{Classifier, FeeThresholds, SafetyPolicy};
use case_provider::ProviderRegistry;
use case_runtime::{RuntimeConfig, RuntimeMetrics, SharedLock, SharedStore};
use case_scheduler::SchedulerMetrics;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::openapi::ApiDoc;

/// Everything a handler needs to drive [`case_runtime::dispatch`],
/// [`case_runtime::post_decision`], or a scheduler metrics read.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub lock: SharedLock,
    pub executor: Arc<ProposalExecutor>,
    pub providers: Arc<ProviderRegistry>,
    pub dlq: Arc<dyn DeadLetterSink>,
    pub dlq_queue: Arc<case_executor::dlq::DeadLetterQueue>,
    pub classifier: Arc<dyn Classifier>,
    pub thresholds: FeeThresholds,
    pub safety_policy: Arc<SafetyPolicy>,
    pub runtime_config: RuntimeConfig,
    pub runtime_metrics: Arc<RuntimeMetrics>,
    pub scheduler_metrics: Arc<SchedulerMetrics>,
}

/// Build the Axum router: inbound stimulus endpoints, the decision
/// endpoint, webhook ingestion, health/metrics, DLQ inspection, and the
/// Swagger UI.
pub fn router(state: AppState) -> Router {
    let app = Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .route("/cases/{case_id}/run-initial", post(cases::run_initial))
        .route("/cases/{case_id}/run-inbound", post(cases::run_inbound))
        .route("/proposals/{proposal_id}/decision", post(proposals::decision))
        .route("/webhooks/inbound", post(webhooks::inbound))
        .route("/v1/executions/dlq", get(dlq::list_dlq))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    app
}
