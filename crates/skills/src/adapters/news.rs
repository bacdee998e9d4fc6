//! News search via NewsAPI.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use answer_engine_core::types::{Article, Citation, SourceId, SourcePayload, SourceType};
use answer_engine_core::{AdapterError, AdapterOutput, SourceAdapter};

use super::SNIPPET_CHARS;
use crate::network::{is_valid_url, send_json, truncate_chars, ProviderEndpoint};

pub const DEFAULT_BASE_URL: &str = "https://newsapi.org";

/// NewsAPI marks deleted articles with this title.
const REMOVED_TITLE: &str = "[Removed]";

#[derive(Debug, Deserialize)]
pub(crate) struct NewsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsArticle {
    #[serde(default)]
    source: Option<NewsOutlet>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsOutlet {
    #[serde(default)]
    name: Option<String>,
}

/// Recent news coverage, newest first.
pub struct NewsApiAdapter {
    endpoint: ProviderEndpoint,
}

impl NewsApiAdapter {
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl SourceAdapter for NewsApiAdapter {
    fn id(&self) -> SourceId {
        SourceId::News
    }

    fn timeout(&self) -> Duration {
        self.endpoint.timeout
    }

    async fn invoke(&self, query: &str, max_results: usize) -> Result<AdapterOutput, AdapterError> {
        let key = self.endpoint.require_key("newsapi")?;
        let mut url = self.endpoint.url("/v2/everything")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("pageSize", &max_results.max(1).to_string())
            .append_pair("sortBy", "publishedAt")
            .append_pair("language", "en");

        let response: NewsResponse =
            send_json(self.endpoint.http.get(url).header("X-Api-Key", key)).await?;
        normalize(response, max_results)
    }
}

pub(crate) fn normalize(response: NewsResponse, max_results: usize) -> Result<AdapterOutput, AdapterError> {
    if response.status.as_deref() == Some("error") {
        return Err(AdapterError::MalformedPayload(
            response.message.unwrap_or_else(|| "newsapi reported an error".into()),
        ));
    }

    let mut articles = Vec::new();
    let mut citations = Vec::new();

    for item in response.articles {
        if articles.len() >= max_results {
            break;
        }
        let Some(url) = item.url.filter(|u| is_valid_url(u)) else {
            continue;
        };
        let Some(title) = item
            .title
            .filter(|t| !t.trim().is_empty() && t != REMOVED_TITLE)
        else {
            continue;
        };
        let description = item.description.unwrap_or_default();

        let mut citation = Citation::new(
            url.clone(),
            title.clone(),
            truncate_chars(&description, SNIPPET_CHARS),
            SourceType::News,
        );
        if let Some(date) = item.published_at.clone() {
            citation = citation.with_published_date(date);
        }
        citations.push(citation);

        articles.push(Article {
            title,
            url,
            description,
            outlet: item.source.and_then(|s| s.name),
            published_at: item.published_at,
        });
    }

    Ok(AdapterOutput {
        payload: SourcePayload::News { articles },
        citations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_articles() {
        let response: NewsResponse = serde_json::from_value(json!({
            "status": "ok",
            "totalResults": 3,
            "articles": [
                {
                    "source": {"id": null, "name": "Reuters"},
                    "title": "Central bank holds rates",
                    "description": "Policy makers voted...",
                    "url": "https://www.reuters.com/markets/rates",
                    "publishedAt": "2026-10-15T09:00:00Z"
                },
                {"source": {"name": "Gone"}, "title": "[Removed]", "url": "https://removed.com"},
                {"title": "No link", "url": null}
            ]
        }))
        .unwrap();

        let output = normalize(response, 5).unwrap();
        assert_eq!(output.citations.len(), 1);
        assert_eq!(output.citations[0].published_date.as_deref(), Some("2026-10-15T09:00:00Z"));

        let SourcePayload::News { articles } = output.payload else {
            panic!("expected news payload");
        };
        assert_eq!(articles[0].outlet.as_deref(), Some("Reuters"));
    }

    #[test]
    fn test_error_status() {
        let response: NewsResponse = serde_json::from_value(json!({
            "status": "error",
            "code": "apiKeyInvalid",
            "message": "Your API key is invalid."
        }))
        .unwrap();
        let err = normalize(response, 5).unwrap_err();
        assert_eq!(err, AdapterError::MalformedPayload("Your API key is invalid.".into()));
    }
}
