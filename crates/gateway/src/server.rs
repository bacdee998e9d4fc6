//! Axum-based HTTP server for the gateway.

use axum::{
    body::Body,
    extract::{Json, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use metrics_exporter_prometheus::PrometheusHandle;

use answer_engine_core::{
    config::ServerConfig,
    types::{AnswerRequest, IntentDecision, ReasoningMode, ResearchDirective},
    Error, Result,
};
use answer_engine_governance::track_request;
use answer_engine_protocol::{StreamEncoder, DEFAULT_MAX_FRAME_BYTES, PROTOCOL_VERSION};

use crate::pipeline::AnswerPipeline;

/// Response header naming the wire protocol version.
pub const PROTOCOL_HEADER: &str = "x-answer-protocol";

/// Longest accepted query, in characters.
const MAX_QUERY_CHARS: usize = 4000;

/// Shared application state.
pub struct AppState {
    pub pipeline: Arc<AnswerPipeline>,
    /// Largest control frame payload written to an answer stream.
    pub max_frame_bytes: usize,
}

/// Gateway server.
pub struct GatewayServer {
    config: ServerConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl GatewayServer {
    /// Create a new gateway server.
    pub fn new(config: ServerConfig, pipeline: Arc<AnswerPipeline>) -> Self {
        Self {
            config,
            state: Arc::new(AppState {
                pipeline,
                max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            }),
            metrics_handle: None,
        }
    }

    /// Limit control frame payloads in answer streams.
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.state = Arc::new(AppState {
            pipeline: self.state.pipeline.clone(),
            max_frame_bytes,
        });
        self
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/v1/answer", post(answer_handler))
            .route("/v1/intent", post(intent_handler))
            .with_state(self.state.clone());

        if self.config.enable_metrics {
            if let Some(handle) = &self.metrics_handle {
                let handle = handle.clone();
                router = router.route("/metrics", get(move || async move { handle.render() }));
            }
        }

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
                    .expose_headers([header::HeaderName::from_static(PROTOCOL_HEADER)]),
            );
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::gateway(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::gateway(format!("Server error: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Answer request body.
#[derive(Debug, Deserialize)]
pub struct AnswerBody {
    pub query: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl AnswerBody {
    /// Validate into a pipeline request with a fresh trace ID.
    fn into_request(self) -> Result<AnswerRequest> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(Error::invalid_request("query is empty"));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(Error::invalid_request(format!(
                "query longer than {} characters",
                MAX_QUERY_CHARS
            )));
        }
        let mode = match self.mode.as_deref() {
            Some(mode) => mode.parse::<ReasoningMode>()?,
            None => ReasoningMode::Auto,
        };

        let mut request = AnswerRequest::new(query).with_mode(mode);
        request.user_id = self.user_id;
        request.conversation_id = self.conversation_id;
        Ok(request)
    }
}

/// Intent-only request.
#[derive(Debug, Deserialize)]
pub struct IntentBody {
    pub query: String,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Intent response.
#[derive(Debug, Serialize)]
pub struct IntentResponse {
    pub trace_id: String,
    pub intent: IntentDecision,
    pub directive: ResearchDirective,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

fn error_response(error: &Error) -> Response {
    let status = match error {
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        protocol: PROTOCOL_VERSION.to_string(),
    })
}

/// Streaming answer handler.
///
/// The body is the encoded frame stream; it ends after the terminal frame.
async fn answer_handler(State(state): State<Arc<AppState>>, Json(body): Json<AnswerBody>) -> Response {
    let started = Instant::now();
    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected answer request");
            track_request("POST", "/v1/answer", 400, started.elapsed().as_secs_f64());
            return error_response(&e);
        }
    };

    tracing::info!(trace_id = %request.trace_id, mode = %request.mode, "Streaming answer");
    let trace_id = request.trace_id.clone();

    let frames = state.pipeline.stream(request);
    let encoder = StreamEncoder::with_max_frame_bytes(state.max_frame_bytes);
    let body = Body::from_stream(encoder.encode_stream(frames));
    track_request("POST", "/v1/answer", 200, started.elapsed().as_secs_f64());

    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PROTOCOL_HEADER, HeaderValue::from_static(PROTOCOL_VERSION));
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        headers.insert("x-trace-id", value);
    }
    response
}

/// Intent classification handler (for debugging/testing).
async fn intent_handler(State(state): State<Arc<AppState>>, Json(body): Json<IntentBody>) -> Response {
    let mode = match body.mode.as_deref().map(str::parse::<ReasoningMode>).transpose() {
        Ok(mode) => mode.unwrap_or_default(),
        Err(e) => return error_response(&e),
    };
    if body.query.trim().is_empty() {
        return error_response(&Error::invalid_request("query is empty"));
    }

    let request = AnswerRequest::new(body.query.trim()).with_mode(mode);
    let (intent, directive) = state.pipeline.decide(&request).await;

    Json(IntentResponse {
        trace_id: request.trace_id,
        intent,
        directive,
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_body_validation() {
        let body = |query: &str, mode: Option<&str>| AnswerBody {
            query: query.into(),
            mode: mode.map(Into::into),
            user_id: None,
            conversation_id: None,
        };

        let request = body("  what is rust  ", Some("on")).into_request().unwrap();
        assert_eq!(request.query, "what is rust");
        assert_eq!(request.mode, ReasoningMode::On);

        assert!(body("   ", None).into_request().is_err());
        assert!(body("q", Some("maybe")).into_request().is_err());
        assert!(body(&"x".repeat(MAX_QUERY_CHARS + 1), None).into_request().is_err());
    }

    #[test]
    fn test_error_status() {
        let response = error_response(&Error::invalid_request("bad"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = error_response(&Error::internal("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
