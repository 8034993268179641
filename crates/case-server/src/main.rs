use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use case_executor::dlq::DeadLetterQueue;
use case_executor::ProposalExecutor;
use case_pipeline::{Classifier, ClassifierOutput, FixedClassifier, SafetyPolicy};
use case_runtime::{RuntimeConfig, RuntimeMetrics};
use case_scheduler::{SchedulerConfig, SchedulerContext, SchedulerMetrics, SchedulerProcessor};
use case_server::api::{self, AppState};
use case_server::config::CaseRuntimeConfig;
use case_server::providers;
use case_server::telemetry;

/// Case runtime HTTP server: dispatches FOIA case runs, records human
/// decisions, and ingests inbound correspondence.
#[derive(Parser, Debug)]
#[command(name = "case-server", about = "Standalone HTTP server for the case runtime")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "case-runtime.toml")]
    config: String,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = CaseRuntimeConfig::load(&cli.config)?;
    let guard = telemetry::init(&config.telemetry);

    let (store, lock) = providers::build_store(&config).await?;
    let provider_registry = Arc::new(providers::build_provider_registry(&config)?);
    let executor = Arc::new(ProposalExecutor::new((&config.executor).into()));
    let dlq = Arc::new(DeadLetterQueue::new());
    // Explicitly out of scope per the runtime's own mandate: real LLM
    // classification. `FixedClassifier` mirrors spec-mandated degrade-to-
    // gate-for-human behavior (ClassifierOutput::default()) rather than
    // stubbing a classifier that could silently auto-approve.
    let classifier: Arc<dyn Classifier> = Arc::new(FixedClassifier(ClassifierOutput::default()));
    let thresholds: case_pipeline::FeeThresholds = (&config.pipeline).into();
    let safety_policy = Arc::new(SafetyPolicy::default());
    let runtime_config: RuntimeConfig = (&config.runtime).into();
    let runtime_metrics = Arc::new(RuntimeMetrics::default());
    let scheduler_config: SchedulerConfig = (&config.scheduler).into();
    let scheduler_metrics = Arc::new(SchedulerMetrics::default());

    let scheduler_ctx = SchedulerContext {
        store: Arc::clone(&store),
        lock: Arc::clone(&lock),
        executor: Arc::clone(&executor),
        providers: Arc::clone(&provider_registry),
        dlq: dlq.clone() as Arc<dyn case_executor::dlq::DeadLetterSink>,
        classifier: Arc::clone(&classifier),
        thresholds,
        safety_policy: Arc::clone(&safety_policy),
        runtime_config: runtime_config.clone(),
        runtime_metrics: Arc::clone(&runtime_metrics),
        scheduler_config,
        scheduler_metrics: Arc::clone(&scheduler_metrics),
    };
    let (mut scheduler, scheduler_shutdown_tx) = SchedulerProcessor::new(scheduler_ctx);
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run().await;
    });

    let state = AppState {
        store,
        lock,
        executor,
        providers: provider_registry,
        dlq: dlq.clone() as Arc<dyn case_executor::dlq::DeadLetterSink>,
        dlq_queue: dlq,
        classifier,
        thresholds,
        safety_policy,
        runtime_config,
        runtime_metrics,
        scheduler_metrics,
    };
    let app = api::router(state);

    let host = cli.host.unwrap_or(config.server.host);
    let port = cli.port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "case-server listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("shutting down scheduler");
    let _ = scheduler_shutdown_tx.send(()).await;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    if tokio::time::timeout(shutdown_timeout, scheduler_handle).await.is_err() {
        tracing::warn!(
            timeout_secs = config.server.shutdown_timeout_seconds,
            "scheduler shutdown timeout exceeded"
        );
    }

    guard.shutdown();
    info!("case-server shut down");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM, then return to trigger graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("received SIGINT"); }
        () = terminate => { info!("received SIGTERM"); }
    }
}
