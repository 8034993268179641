use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Request, StatusCode};
use tower::ServiceExt;

use case_core::{
    AgencyIdentity, AutopilotMode, Case, CaseId, CaseStatus, DecisionAction, ProposalStatus,
    RunTrigger, SubmissionChannel,
};
use case_executor::dlq::DeadLetterQueue;
use case_executor::{ExecutorConfig, ProposalExecutor};
use case_pipeline::{ClassifierOutput, FixedClassifier, SafetyPolicy};
use case_provider::{LogProvider, ProviderRegistry};
use case_runtime::{RuntimeConfig, RuntimeMetrics};
use case_scheduler::SchedulerMetrics;
use case_store::{DistributedLock, InMemoryCaseStore, LockGuard, StoreError};
use case_server::api::{self, AppState};
use chrono::Utc;

// -- In-memory lock double -------------------------------------------------
//
// `case-store` ships the Postgres advisory-lock backend only; this mirrors
// the fixture `case-runtime` and `case-scheduler` build their own unit tests
// on.

#[derive(Default)]
struct InMemoryLock {
    held: Arc<Mutex<HashSet<String>>>,
}

impl InMemoryLock {
    fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn try_acquire(&self, name: &str, _ttl: Duration) -> Result<Option<Box<dyn LockGuard>>, StoreError> {
        let mut held = self.held.lock().expect("lock mutex poisoned");
        if held.insert(name.to_string()) {
            Ok(Some(Box::new(InMemoryLockGuard { name: name.to_string(), held: self.held.clone() })))
        } else {
            Ok(None)
        }
    }

    async fn acquire(&self, name: &str, ttl: Duration, timeout: Duration) -> Result<Box<dyn LockGuard>, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_acquire(name, ttl).await? {
                return Ok(guard);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(StoreError::Timeout(timeout));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

struct InMemoryLockGuard {
    name: String,
    held: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl LockGuard for InMemoryLockGuard {
    async fn extend(&self, _duration: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.held.lock().expect("lock mutex poisoned").remove(&self.name);
        Ok(())
    }

    async fn is_held(&self) -> Result<bool, StoreError> {
        Ok(self.held.lock().expect("lock mutex poisoned").contains(&self.name))
    }
}

// -- Helpers ----------------------------------------------------------------

fn base_case(id: i64, autopilot_mode: AutopilotMode, status: CaseStatus) -> Case {
    let now = Utc::now();
    Case {
        id: CaseId(id),
        submission_channel: SubmissionChannel::Email,
        agency: AgencyIdentity {
            name: "Test Agency".into(),
            jurisdiction: None,
            agency_email: Some("foia@agency.gov".into()),
            portal_url: None,
        },
        requested_records: vec![],
        status,
        substatus: None,
        requires_human: false,
        pause_reason: None,
        next_due_at: None,
        autopilot_mode,
        constraints: serde_json::Value::Null,
        scope_items: serde_json::Value::Null,
        send_date: None,
        last_response_date: None,
        created_at: now,
        updated_at: now,
    }
}

fn registry() -> ProviderRegistry {
    let mut reg = ProviderRegistry::new();
    reg.register(Arc::new(LogProvider::new("email")));
    reg.register(Arc::new(LogProvider::new("portal")));
    reg
}

fn build_state(store: Arc<InMemoryCaseStore>) -> AppState {
    let dlq = Arc::new(DeadLetterQueue::new());
    AppState {
        store,
        lock: Arc::new(InMemoryLock::new()),
        executor: Arc::new(ProposalExecutor::new(ExecutorConfig::default())),
        providers: Arc::new(registry()),
        dlq: dlq.clone() as Arc<dyn case_executor::dlq::DeadLetterSink>,
        dlq_queue: dlq,
        classifier: Arc::new(FixedClassifier(ClassifierOutput::default())),
        thresholds: case_pipeline::FeeThresholds::default(),
        safety_policy: Arc::new(SafetyPolicy::default()),
        runtime_config: RuntimeConfig::default(),
        runtime_metrics: Arc::new(RuntimeMetrics::default()),
        scheduler_metrics: Arc::new(SchedulerMetrics::default()),
    }
}

fn build_app(state: AppState) -> axum::Router {
    api::router(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// -- Health / metrics ---------------------------------------------------------

#[tokio::test]
async fn health_returns_200() {
    let store = Arc::new(InMemoryCaseStore::new());
    let app = build_app(build_state(store));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["runtime"].is_object());
    assert!(json["scheduler"].is_object());
}

#[tokio::test]
async fn metrics_returns_same_shape_as_health() {
    let store = Arc::new(InMemoryCaseStore::new());
    let app = build_app(build_state(store));

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["runtime"]["runs_dispatched"], 0);
    assert_eq!(json["scheduler"]["followups_dispatched"], 0);
}

// -- run-initial / run-inbound ------------------------------------------------

#[tokio::test]
async fn run_initial_dispatches_and_returns_202() {
    let store = Arc::new(InMemoryCaseStore::new());
    let case = base_case(1, AutopilotMode::Auto, CaseStatus::ReadyToSend);
    let case_id = store.insert_case(case).await.unwrap();
    let app = build_app(build_state(store));

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(format!("/cases/{}/run-initial", case_id.0))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "dispatched");
}

#[tokio::test]
async fn run_initial_unknown_case_returns_404() {
    let store = Arc::new(InMemoryCaseStore::new());
    let app = build_app(build_state(store));

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/cases/999/run-initial")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn run_initial_active_run_exists_returns_409() {
    let store = Arc::new(InMemoryCaseStore::new());
    let case = base_case(2, AutopilotMode::Auto, CaseStatus::AwaitingResponse);
    let case_id = store.insert_case(case).await.unwrap();
    store
        .create_run(case_id, RunTrigger::InboundMessage, None, None, AutopilotMode::Auto, RuntimeConfig::default().lock_ttl)
        .await
        .unwrap();

    let app = build_app(build_state(store));

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(format!("/cases/{}/run-initial", case_id.0))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["status"], "active_run_exists");
}

#[tokio::test]
async fn run_inbound_unknown_message_returns_404() {
    let store = Arc::new(InMemoryCaseStore::new());
    let case = base_case(3, AutopilotMode::Auto, CaseStatus::AwaitingResponse);
    let case_id = store.insert_case(case).await.unwrap();
    let app = build_app(build_state(store));

    let body = serde_json::json!({ "message_id": uuid::Uuid::new_v4() });
    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(format!("/cases/{}/run-inbound", case_id.0))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- webhooks ------------------------------------------------------------------

#[tokio::test]
async fn webhook_inbound_ingests_message_and_dispatches() {
    let store = Arc::new(InMemoryCaseStore::new());
    let case = base_case(4, AutopilotMode::Auto, CaseStatus::AwaitingResponse);
    let case_id = store.insert_case(case).await.unwrap();
    let app = build_app(build_state(store));

    let body = serde_json::json!({
        "case_id": case_id.0,
        "provider_message_id": "agency-msg-1",
        "subject": "Re: your FOIA request",
        "body": "We found responsive records.",
    });

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/webhooks/inbound")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert!(json["message_id"].is_string());
    assert_eq!(json["dispatch"]["status"], "dispatched");
}

#[tokio::test]
async fn webhook_inbound_replay_is_not_redispatched() {
    let store = Arc::new(InMemoryCaseStore::new());
    let case = base_case(5, AutopilotMode::Auto, CaseStatus::AwaitingResponse);
    let case_id = store.insert_case(case).await.unwrap();
    let state = build_state(store);

    let body = serde_json::json!({
        "case_id": case_id.0,
        "provider_message_id": "agency-msg-replay",
        "subject": "Re: your FOIA request",
        "body": "We found responsive records.",
    });

    let first = build_app(state.clone())
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/webhooks/inbound")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let first_json = body_json(first).await;
    let message_id = first_json["message_id"].clone();

    // A provider's at-least-once webhook retry redelivers the same payload.
    let replay = build_app(state)
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/webhooks/inbound")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(replay.status(), StatusCode::OK);
    let replay_json = body_json(replay).await;
    assert_eq!(replay_json["message_id"], message_id);
    assert_eq!(replay_json["dispatch"]["status"], "already_processed");
}

#[tokio::test]
async fn webhook_inbound_unknown_case_returns_404() {
    let store = Arc::new(InMemoryCaseStore::new());
    let app = build_app(build_state(store));

    let body = serde_json::json!({
        "case_id": 999,
        "body": "hello",
    });

    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri("/webhooks/inbound")
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- decision ------------------------------------------------------------------

/// Drives a fresh case through `dispatch` under `AutopilotMode::Manual`
/// (which always gates) directly against the store, bypassing HTTP, then
/// returns the pending proposal id for the decision-endpoint tests to post
/// against.
async fn gated_proposal(store: &Arc<InMemoryCaseStore>, case_id: i64) -> case_core::ProposalId {
    let case = base_case(case_id, AutopilotMode::Manual, CaseStatus::ReadyToSend);
    let id = store.insert_case(case).await.unwrap();

    let shared_store: case_runtime::SharedStore = store.clone();
    let lock: case_runtime::SharedLock = Arc::new(InMemoryLock::new());
    let executor = ProposalExecutor::new(ExecutorConfig::default());
    let providers = registry();
    let dlq = DeadLetterQueue::new();
    let classifier = FixedClassifier(ClassifierOutput::default());
    let metrics = RuntimeMetrics::default();
    let config = RuntimeConfig::default();

    case_runtime::dispatch(
        &shared_store,
        &lock,
        &executor,
        &providers,
        &dlq,
        &classifier,
        case_pipeline::FeeThresholds::default(),
        &SafetyPolicy::default(),
        &metrics,
        &config,
        id,
        RunTrigger::InitialRequest,
        None,
        None,
    )
    .await
    .unwrap();

    let snapshot = case_runtime::transition::load_snapshot(shared_store.as_ref(), id).await.unwrap();
    let proposal = snapshot.active_proposal().expect("manual mode gates the proposal");
    assert_eq!(proposal.status, ProposalStatus::PendingApproval);
    proposal.id
}

#[tokio::test]
async fn decision_approve_returns_202_with_run_id() {
    let store = Arc::new(InMemoryCaseStore::new());
    let proposal_id = gated_proposal(&store, 10).await;
    let app = build_app(build_state(store));

    let body = serde_json::json!({ "action": "approve" });
    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(format!("/proposals/{}/decision", proposal_id.0))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert!(json["run_id"].is_string());
}

#[tokio::test]
async fn decision_on_already_decided_proposal_returns_409() {
    let store = Arc::new(InMemoryCaseStore::new());
    let proposal_id = gated_proposal(&store, 11).await;
    let state = build_state(store);
    let app = build_app(state.clone());

    let dismiss = serde_json::json!({ "action": "dismiss" });
    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(format!("/proposals/{}/decision", proposal_id.0))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&dismiss).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Rebuild the router since `oneshot` consumes it.
    let app2 = build_app(state);
    let approve = serde_json::json!({ "action": "approve" });
    let response = app2
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(format!("/proposals/{}/decision", proposal_id.0))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&approve).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn decision_on_unknown_proposal_returns_404() {
    let store = Arc::new(InMemoryCaseStore::new());
    let app = build_app(build_state(store));

    let body = serde_json::json!({ "action": "approve" });
    let response = app
        .oneshot(
            Request::builder()
                .method(http::Method::POST)
                .uri(format!("/proposals/{}/decision", uuid::Uuid::new_v4()))
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -- DLQ -------------------------------------------------------------------

#[tokio::test]
async fn dlq_list_is_empty_with_no_failures() {
    let store = Arc::new(InMemoryCaseStore::new());
    let app = build_app(build_state(store));

    let response = app
        .oneshot(Request::builder().uri("/v1/executions/dlq").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["count"], 0);
    assert!(json["entries"].as_array().unwrap().is_empty());
}

// -- OpenAPI / Swagger ----------------------------------------------------------

#[tokio::test]
async fn swagger_ui_returns_200() {
    let store = Arc::new(InMemoryCaseStore::new());
    let app = build_app(build_state(store));

    let response = app
        .oneshot(Request::builder().uri("/swagger-ui/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_json_lists_expected_paths_and_schemas() {
    let store = Arc::new(InMemoryCaseStore::new());
    let app = build_app(build_state(store));

    let response = app
        .oneshot(Request::builder().uri("/api-doc/openapi.json").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let spec = body_json(response).await;

    assert!(spec["openapi"].as_str().unwrap().starts_with("3.1"));

    let paths = spec["paths"].as_object().unwrap();
    assert!(paths.contains_key("/health"));
    assert!(paths.contains_key("/metrics"));
    assert!(paths.contains_key("/cases/{case_id}/run-initial"));
    assert!(paths.contains_key("/cases/{case_id}/run-inbound"));
    assert!(paths.contains_key("/proposals/{proposal_id}/decision"));
    assert!(paths.contains_key("/webhooks/inbound"));
    assert!(paths.contains_key("/v1/executions/dlq"));

    let schemas = spec["components"]["schemas"].as_object().unwrap();
    assert!(schemas.contains_key("DispatchResult"));
    assert!(schemas.contains_key("HealthResponse"));
    assert!(schemas.contains_key("ErrorResponse"));
    assert!(schemas.contains_key("DlqListResponse"));
}
