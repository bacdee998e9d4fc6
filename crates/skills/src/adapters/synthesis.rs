//! Pre-synthesized answers from an online chat-completions provider.
//!
//! Speaks the OpenAI-compatible `/chat/completions` shape with a top-level
//! `citations` url list, as Perplexity's `sonar` models return it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use answer_engine_core::types::{Citation, SourceId, SourcePayload, SourceType};
use answer_engine_core::{AdapterError, AdapterOutput, SourceAdapter};

use crate::network::{host_of, is_valid_url, send_json, ProviderEndpoint};

pub const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
pub const DEFAULT_MODEL: &str = "sonar";

const SYSTEM_PROMPT: &str = "Answer the question concisely and factually. Cite sources.";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Online synthesis provider.
pub struct SynthesisAdapter {
    endpoint: ProviderEndpoint,
    model: String,
}

impl SynthesisAdapter {
    pub fn new(endpoint: ProviderEndpoint, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for SynthesisAdapter {
    fn id(&self) -> SourceId {
        SourceId::Synthesis
    }

    fn timeout(&self) -> Duration {
        self.endpoint.timeout
    }

    async fn invoke(&self, query: &str, max_results: usize) -> Result<AdapterOutput, AdapterError> {
        let key = self.endpoint.require_key("synthesis")?;
        let url = self.endpoint.url("/chat/completions")?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatTurn {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatTurn {
                    role: "user",
                    content: query,
                },
            ],
        };

        let response: ChatResponse =
            send_json(self.endpoint.http.post(url).bearer_auth(key).json(&body)).await?;
        normalize(response, max_results)
    }
}

pub(crate) fn normalize(response: ChatResponse, max_results: usize) -> Result<AdapterOutput, AdapterError> {
    let answer = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AdapterError::MalformedPayload("no answer in completion".into()))?;

    let citations = response
        .citations
        .into_iter()
        .filter(|u| is_valid_url(u))
        .take(max_results)
        .map(|url| {
            let title = host_of(&url).unwrap_or_else(|| url.clone());
            Citation::new(url, title, String::new(), SourceType::Web)
        })
        .collect();

    Ok(AdapterOutput {
        payload: SourcePayload::Synthesis { answer },
        citations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_answer_and_citations() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "cmpl-1",
            "model": "sonar",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": " Rust 1.0 shipped in May 2015. "}}],
            "citations": ["https://blog.rust-lang.org/2015/05/15/Rust-1.0.html", "not-a-url"]
        }))
        .unwrap();

        let output = normalize(response, 5).unwrap();
        assert_eq!(
            output.payload,
            SourcePayload::Synthesis {
                answer: "Rust 1.0 shipped in May 2015.".into()
            }
        );
        assert_eq!(output.citations.len(), 1);
        assert_eq!(output.citations[0].title, "blog.rust-lang.org");
    }

    #[test]
    fn test_empty_completion_is_malformed() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(normalize(response, 5), Err(AdapterError::MalformedPayload(_))));
    }
}
