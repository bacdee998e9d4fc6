//! Logging and distributed tracing configuration.

use answer_engine_core::{Error, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace as sdktrace, Resource};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Service name reported to the OTLP collector.
pub const SERVICE_NAME: &str = "answer-engine";

/// Configure stdout logging (plain or JSON) and, when
/// `OTEL_EXPORTER_OTLP_ENDPOINT` is set, OpenTelemetry export.
pub fn configure_tracing(json: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,answer_engine=debug".into()),
    );

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()));

    if let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        let provider = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(
                opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint.clone()),
            )
            .with_trace_config(
                sdktrace::config().with_resource(Resource::new(vec![KeyValue::new(
                    "service.name",
                    SERVICE_NAME,
                )])),
            )
            .install_batch(runtime::Tokio)
            .map_err(|e| Error::governance(format!("Failed to install OTLP pipeline: {}", e)))?;

        opentelemetry::global::set_tracer_provider(provider.clone());

        registry
            .with(otel_layer(&provider))
            .try_init()
            .map_err(|e| Error::governance(format!("Failed to install subscriber: {}", e)))?;
        tracing::info!(endpoint = %endpoint, "OpenTelemetry tracing enabled");
    } else {
        registry
            .try_init()
            .map_err(|e| Error::governance(format!("Failed to install subscriber: {}", e)))?;
    }

    Ok(())
}

/// Bridge `tracing` spans into spans of `provider`.
fn otel_layer<S>(provider: &sdktrace::TracerProvider) -> OpenTelemetryLayer<S, sdktrace::Tracer>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME))
}
