//! Metrics implementation using Prometheus.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use answer_engine_core::{Error, Result};

/// Initialize Prometheus recorder and return the handle.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .map_err(|e| Error::governance(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// Helper to track HTTP request metrics (latency, count).
pub fn track_request(method: &str, path: &str, status: u16, latency_sec: f64) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(latency_sec);
}

/// Track one adapter invocation. `outcome` is `success` or `failure`.
pub fn track_adapter_call(source: &str, outcome: &str, latency_sec: f64) {
    metrics::counter!(
        "source_adapter_calls_total",
        "source" => source.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);

    metrics::histogram!("source_adapter_duration_seconds", "source" => source.to_string())
        .record(latency_sec);
}

/// Track how an intent was decided (`provider` or `heuristic`).
pub fn track_classification(path: &'static str) {
    metrics::counter!("intent_classifications_total", "path" => path).increment(1);
}

/// Track a finished answer request (`complete`, `error` or `aborted`).
pub fn track_answer(outcome: &'static str) {
    metrics::counter!("answer_requests_total", "outcome" => outcome).increment(1);
}
