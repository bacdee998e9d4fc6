//! Streaming generation source.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint with
//! `stream: true` and turns the server-sent events into a `TokenStream` of
//! content deltas.

use async_trait::async_trait;
use futures::StreamExt;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

use answer_engine_core::{
    config::GenerationConfig,
    traits::{ChatMessage, GenerationSource, TokenStream},
    Error, Result,
};

/// Longest provider error body quoted in an error.
const MAX_ERROR_BODY_CHARS: usize = 256;

// =============================================================================
// SSE parsing
// =============================================================================

/// One decoded server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A content delta.
    Delta(String),
    /// The provider reported an error mid-stream.
    Failed(String),
    /// `[DONE]`.
    Done,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Splits a byte stream into SSE events.
///
/// Bytes are buffered until a blank line closes the event, so multi-byte
/// characters split across network chunks are never decoded half-way.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, sep)) = find_event_end(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + sep).collect();
            events.extend(parse_event(&String::from_utf8_lossy(&raw[..end])));
        }
        events
    }

    /// Events left in the buffer when the body ends without a blank line.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        let raw = std::mem::take(&mut self.buffer);
        parse_event(&String::from_utf8_lossy(&raw))
    }
}

/// Position and length of the first event separator.
fn find_event_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_event(event: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();

    for line in event.lines() {
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        if data.is_empty() {
            continue;
        }
        if data == "[DONE]" {
            events.push(SseEvent::Done);
            continue;
        }

        let chunk: ChatChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unparsable SSE data line");
                continue;
            }
        };
        if let Some(error) = chunk.error {
            events.push(SseEvent::Failed(error.message));
            continue;
        }
        events.extend(
            chunk
                .choices
                .into_iter()
                .filter_map(|c| c.delta.content)
                .filter(|c| !c.is_empty())
                .map(SseEvent::Delta),
        );
    }
    events
}

// =============================================================================
// Generation source
// =============================================================================

/// OpenAI-compatible streaming chat completion.
pub struct OpenAiStreamingSource {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<Secret<String>>,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiStreamingSource {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::generation("generation api key missing"))
    }
}

#[async_trait]
impl GenerationSource for OpenAiStreamingSource {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": true,
        });

        tracing::debug!(model = %self.model, messages = messages.len(), "Starting generation");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::generation(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(Error::generation(format!(
                "provider returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let mut bytes = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut parser = SseParser::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(Error::generation(format!("stream error: {}", e)));
                        return;
                    }
                };

                for event in parser.push(&chunk) {
                    match event {
                        SseEvent::Delta(text) => yield Ok(text),
                        SseEvent::Failed(message) => {
                            yield Err(Error::generation(message));
                            return;
                        }
                        SseEvent::Done => return,
                    }
                }
            }

            // Body ended without [DONE]; keep whatever the tail holds.
            for event in parser.finish() {
                match event {
                    SseEvent::Delta(text) => yield Ok(text),
                    SseEvent::Failed(message) => {
                        yield Err(Error::generation(message));
                        return;
                    }
                    SseEvent::Done => return,
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
