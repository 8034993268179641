//! Tracing subscriber setup: `fmt` always, OpenTelemetry export on top of it
//! when both the `otel` cargo feature is compiled in and the runtime
//! [`TelemetryConfig`] enables it.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::TelemetryConfig;

/// Opaque handle returned by [`init`]. Call [`TelemetryGuard::shutdown`]
/// during server shutdown to flush any pending spans.
pub struct TelemetryGuard {
    #[cfg(feature = "otel")]
    provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn shutdown(self) {
        #[cfg(feature = "otel")]
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                tracing::warn!(error = %e, "OpenTelemetry tracer provider shutdown failed");
            }
        }
    }
}

/// Install the tracing subscriber. Never panics: an exporter that fails to
/// build falls back to fmt-only tracing with an error logged.
pub fn init(config: &TelemetryConfig) -> TelemetryGuard {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer();

    #[cfg(feature = "otel")]
    {
        if config.enabled {
            return otel::init(config, env_filter, fmt_layer);
        }
    }
    #[cfg(not(feature = "otel"))]
    {
        if config.enabled {
            tracing::warn!("telemetry.enabled = true but case-server was built without the otel feature");
        }
    }

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
    TelemetryGuard {
        #[cfg(feature = "otel")]
        provider: None,
    }
}

#[cfg(feature = "otel")]
mod otel {
    use std::time::Duration;

    use opentelemetry::trace::TracerProvider;
    use opentelemetry::{global, KeyValue};
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::propagation::TraceContextPropagator;
    use opentelemetry_sdk::trace::{BatchSpanProcessor, Sampler, SdkTracerProvider};
    use opentelemetry_sdk::Resource;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Registry};

    use super::TelemetryGuard;
    use crate::config::TelemetryConfig;

    pub(super) fn init(
        config: &TelemetryConfig,
        env_filter: EnvFilter,
        fmt_layer: tracing_subscriber::fmt::Layer<Registry>,
    ) -> TelemetryGuard {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let exporter = match build_exporter(config) {
            Ok(exporter) => exporter,
            Err(e) => {
                tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();
                tracing::error!(
                    error = %e,
                    endpoint = %config.endpoint,
                    protocol = %config.protocol,
                    "failed to build OTLP exporter, falling back to fmt-only tracing"
                );
                return TelemetryGuard { provider: None };
            }
        };

        let mut resource_kvs = vec![
            KeyValue::new("service.name", config.service_name.clone()),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("process.pid", std::process::id().to_string()),
        ];
        for (k, v) in &config.resource_attributes {
            resource_kvs.push(KeyValue::new(k.clone(), v.clone()));
        }
        let resource = Resource::builder().with_attributes(resource_kvs).build();

        let sampler = if (config.sample_ratio - 1.0).abs() < f64::EPSILON {
            Sampler::AlwaysOn
        } else if config.sample_ratio <= 0.0 {
            Sampler::AlwaysOff
        } else {
            Sampler::TraceIdRatioBased(config.sample_ratio)
        };

        let provider = SdkTracerProvider::builder()
            .with_span_processor(BatchSpanProcessor::builder(exporter).build())
            .with_sampler(sampler)
            .with_resource(resource)
            .build();

        global::set_tracer_provider(provider.clone());

        let tracer = provider.tracer("case-runtime");
        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        tracing_subscriber::registry().with(env_filter).with(fmt_layer).with(otel_layer).init();

        tracing::info!(
            endpoint = %config.endpoint,
            protocol = %config.protocol,
            sample_ratio = config.sample_ratio,
            "OpenTelemetry tracing enabled"
        );

        TelemetryGuard { provider: Some(provider) }
    }

    fn build_exporter(
        config: &TelemetryConfig,
    ) -> Result<opentelemetry_otlp::SpanExporter, opentelemetry::trace::TraceError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        match config.protocol.as_str() {
            "http" => opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(&config.endpoint)
                .with_timeout(timeout)
                .build(),
            other => {
                if other != "grpc" {
                    tracing::warn!(protocol = %other, "unknown telemetry protocol, defaulting to gRPC");
                }
                opentelemetry_otlp::SpanExporter::builder()
                    .with_tonic()
                    .with_endpoint(&config.endpoint)
                    .with_timeout(timeout)
                    .build()
            }
        }
    }
}
