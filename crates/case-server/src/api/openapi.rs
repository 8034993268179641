use case_core::{AutopilotMode, DecisionAction, MessageId, ProposalId, Run, RunId, RunStatus, RunTrigger};

use super::dlq::DlqListResponse;
use super::schemas::{
    DecisionRequest, DecisionResponse, DispatchResult, DlqEntryResponse, ErrorResponse,
    HealthResponse, RunInboundRequest, RunInitialRequest, RuntimeMetricsResponse,
    SchedulerMetricsResponse, WebhookInboundRequest, WebhookInboundResponse,
};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "Case Runtime Core API",
        version = "0.1.0",
        description = "HTTP API for dispatching FOIA case runs, recording human decisions on proposals, and ingesting inbound correspondence.",
        license(name = "MIT")
    ),
    tags(
        (name = "Cases", description = "Run dispatch entrypoints"),
        (name = "Proposals", description = "Human-in-the-loop decisions on proposed actions"),
        (name = "Webhooks", description = "Inbound correspondence ingestion"),
        (name = "Health", description = "Service health and metrics"),
        (name = "Executions", description = "Outbound execution inspection"),
    ),
    paths(
        super::cases::run_initial,
        super::cases::run_inbound,
        super::proposals::decision,
        super::webhooks::inbound,
        super::health::health,
        super::health::metrics,
        super::dlq::list_dlq,
    ),
    components(schemas(
        Run, RunId, RunStatus, RunTrigger, AutopilotMode, MessageId, ProposalId, DecisionAction,
        RunInitialRequest, RunInboundRequest, DispatchResult,
        DecisionRequest, DecisionResponse,
        WebhookInboundRequest, WebhookInboundResponse,
        HealthResponse, RuntimeMetricsResponse, SchedulerMetricsResponse,
        DlqEntryResponse, DlqListResponse,
        ErrorResponse,
    ))
)]
pub struct ApiDoc;
