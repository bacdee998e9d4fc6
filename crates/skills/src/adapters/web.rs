//! Web search via Exa.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use answer_engine_core::types::{Citation, SourceId, SourcePayload, SourceType, WebHit};
use answer_engine_core::{AdapterError, AdapterOutput, SourceAdapter};

use super::SNIPPET_CHARS;
use crate::network::{host_of, is_valid_url, send_json, truncate_chars, ProviderEndpoint};

pub const DEFAULT_BASE_URL: &str = "https://api.exa.ai";

/// Page text requested per hit.
const MAX_TEXT_CHARS: u32 = 2000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    #[serde(rename = "type")]
    search_type: &'static str,
    contents: ExaContents,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaContents {
    text: ExaTextConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaTextConfig {
    max_characters: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
}

/// General web search.
pub struct ExaWebAdapter {
    endpoint: ProviderEndpoint,
}

impl ExaWebAdapter {
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl SourceAdapter for ExaWebAdapter {
    fn id(&self) -> SourceId {
        SourceId::Web
    }

    fn timeout(&self) -> Duration {
        self.endpoint.timeout
    }

    async fn invoke(&self, query: &str, max_results: usize) -> Result<AdapterOutput, AdapterError> {
        let key = self.endpoint.require_key("exa")?;
        let url = self.endpoint.url("/search")?;

        let body = ExaSearchRequest {
            query,
            num_results: max_results.max(1),
            search_type: "auto",
            contents: ExaContents {
                text: ExaTextConfig {
                    max_characters: MAX_TEXT_CHARS,
                },
            },
        };

        let response: ExaSearchResponse = send_json(
            self.endpoint
                .http
                .post(url)
                .header("x-api-key", key)
                .json(&body),
        )
        .await?;

        Ok(normalize(response, max_results))
    }
}

pub(crate) fn normalize(response: ExaSearchResponse, max_results: usize) -> AdapterOutput {
    let mut hits = Vec::new();
    let mut citations = Vec::new();

    for result in response.results.into_iter().filter(|r| is_valid_url(&r.url)) {
        if hits.len() >= max_results {
            break;
        }
        let title = result
            .title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| host_of(&result.url))
            .unwrap_or_else(|| result.url.clone());
        let text = result.text.unwrap_or_default();

        let mut citation = Citation::new(
            result.url.clone(),
            title.clone(),
            truncate_chars(&text, SNIPPET_CHARS),
            SourceType::Web,
        );
        if let Some(date) = result.published_date {
            citation = citation.with_published_date(date);
        }

        citations.push(citation);
        hits.push(WebHit {
            title,
            url: result.url,
            text,
        });
    }

    AdapterOutput {
        payload: SourcePayload::Web { hits },
        citations,
    }
}
