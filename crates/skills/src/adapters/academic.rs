//! Academic search via the Semantic Scholar Graph API.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use answer_engine_core::types::{Citation, Paper, SourceId, SourcePayload, SourceType};
use answer_engine_core::{AdapterError, AdapterOutput, SourceAdapter};

use super::SNIPPET_CHARS;
use crate::network::{is_valid_url, send_json, truncate_chars, ProviderEndpoint};

pub const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org";

const FIELDS: &str = "title,url,abstract,year,authors,publicationDate";

/// Authors listed per paper.
const MAX_AUTHORS: usize = 5;

#[derive(Debug, Deserialize)]
pub(crate) struct PaperSearchResponse {
    #[serde(default)]
    data: Vec<PaperRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaperRecord {
    #[serde(default)]
    paper_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    authors: Vec<AuthorRecord>,
    #[serde(default)]
    publication_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorRecord {
    #[serde(default)]
    name: Option<String>,
}

/// Scholarly papers. Works without a key at a lower rate limit.
pub struct SemanticScholarAdapter {
    endpoint: ProviderEndpoint,
}

impl SemanticScholarAdapter {
    pub fn new(endpoint: ProviderEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn id(&self) -> SourceId {
        SourceId::Academic
    }

    fn timeout(&self) -> Duration {
        self.endpoint.timeout
    }

    async fn invoke(&self, query: &str, max_results: usize) -> Result<AdapterOutput, AdapterError> {
        let mut url = self.endpoint.url("/graph/v1/paper/search")?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &max_results.max(1).to_string())
            .append_pair("fields", FIELDS);

        let mut request = self.endpoint.http.get(url);
        if let Some(key) = self.endpoint.optional_key() {
            request = request.header("x-api-key", key);
        }

        let response: PaperSearchResponse = send_json(request).await?;
        Ok(normalize(response, max_results))
    }
}

fn paper_url(record: &PaperRecord) -> Option<String> {
    record
        .url
        .clone()
        .or_else(|| {
            record
                .paper_id
                .as_ref()
                .map(|id| format!("https://www.semanticscholar.org/paper/{}", id))
        })
        .filter(|u| is_valid_url(u))
}

pub(crate) fn normalize(response: PaperSearchResponse, max_results: usize) -> AdapterOutput {
    let mut papers = Vec::new();
    let mut citations = Vec::new();

    for record in response.data {
        if papers.len() >= max_results {
            break;
        }
        let Some(url) = paper_url(&record) else {
            continue;
        };
        let Some(title) = record.title.filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        let abstract_text = record.abstract_text.unwrap_or_default();

        let mut citation = Citation::new(
            url.clone(),
            title.clone(),
            truncate_chars(&abstract_text, SNIPPET_CHARS),
            SourceType::Academic,
        );
        if let Some(date) = record
            .publication_date
            .or_else(|| record.year.map(|y| y.to_string()))
        {
            citation = citation.with_published_date(date);
        }
        citations.push(citation);

        papers.push(Paper {
            title,
            url,
            abstract_text,
            year: record.year,
            authors: record
                .authors
                .into_iter()
                .filter_map(|a| a.name)
                .take(MAX_AUTHORS)
                .collect(),
        });
    }

    AdapterOutput {
        payload: SourcePayload::Academic { papers },
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_papers() {
        let response: PaperSearchResponse = serde_json::from_value(json!({
            "total": 3,
            "data": [
                {
                    "paperId": "abc123",
                    "title": "Attention Is All You Need",
                    "url": null,
                    "abstract": "The dominant sequence transduction models...",
                    "year": 2017,
                    "authors": [{"name": "Ashish Vaswani"}, {"name": "Noam Shazeer"}]
                },
                {"paperId": "def", "title": "", "year": 2020},
                {"title": "No identifiers at all"}
            ]
        }))
        .unwrap();

        let output = normalize(response, 5);
        assert_eq!(output.citations.len(), 1);
        let citation = &output.citations[0];
        assert_eq!(citation.url, "https://www.semanticscholar.org/paper/abc123");
        assert_eq!(citation.source_type, SourceType::Academic);
        assert_eq!(citation.published_date.as_deref(), Some("2017"));

        let SourcePayload::Academic { papers } = output.payload else {
            panic!("expected academic payload");
        };
        assert_eq!(papers[0].authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(papers[0].year, Some(2017));
    }

    #[test]
    fn test_missing_data_is_empty() {
        let response: PaperSearchResponse = serde_json::from_value(json!({"total": 0})).unwrap();
        let output = normalize(response, 5);
        assert!(output.citations.is_empty());
    }
}
