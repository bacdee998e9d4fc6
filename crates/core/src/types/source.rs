use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::citation::Citation;

// =============================================================================
// Source Identifiers
// =============================================================================

/// Identifier of a source adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// General web search.
    Web,
    /// Scholarly paper search.
    Academic,
    /// News article search.
    News,
    /// Answer engine that returns prose plus cited links.
    Synthesis,
}

impl SourceId {
    /// Every known source.
    pub const ALL: [SourceId; 4] = [Self::Web, Self::Academic, Self::News, Self::Synthesis];

    /// Stable string form used in logs, metrics and payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Academic => "academic",
            Self::News => "news",
            Self::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::AdapterNotFound(s.to_string()))
    }
}

// =============================================================================
// Source Plan
// =============================================================================

/// Shape the generated answer is expected to take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerShape {
    /// One or two paragraphs.
    Brief,
    /// A normal explanatory answer.
    #[default]
    Explanatory,
    /// A side-by-side comparison.
    Comparative,
    /// A long, sectioned report.
    Report,
}

/// Concrete list of adapter invocations for one query.
///
/// `sources` is an ordered set: the order is the adapter priority used when
/// merging citations, and an id appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourcePlan {
    /// Participating adapters, highest priority first.
    pub sources: Vec<SourceId>,
    /// Query sent to each adapter.
    pub per_source_query: BTreeMap<SourceId, String>,
    /// Expected answer shape.
    pub expected_answer_shape: AnswerShape,
    /// Result limit passed to each adapter.
    pub max_results: usize,
}

impl SourcePlan {
    /// Create an empty plan.
    pub fn new(expected_answer_shape: AnswerShape, max_results: usize) -> Self {
        Self {
            sources: Vec::new(),
            per_source_query: BTreeMap::new(),
            expected_answer_shape,
            max_results,
        }
    }

    /// Append a source; duplicates keep their first position and query.
    pub fn with_source(mut self, source: SourceId, query: impl Into<String>) -> Self {
        if !self.sources.contains(&source) {
            self.sources.push(source);
            self.per_source_query.insert(source, query.into());
        }
        self
    }

    /// Whether the plan has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Query for a source, if the source is in the plan.
    pub fn query_for(&self, source: SourceId) -> Option<&str> {
        self.per_source_query.get(&source).map(String::as_str)
    }

    /// Priority index of a source (0 is highest).
    pub fn priority_of(&self, source: SourceId) -> Option<usize> {
        self.sources.iter().position(|s| *s == source)
    }

    /// Sub-plan restricted to `keep`, preserving plan order.
    pub fn narrowed_to(&self, keep: &[SourceId]) -> SourcePlan {
        let mut plan = SourcePlan::new(self.expected_answer_shape, self.max_results);
        for source in self.sources.iter().filter(|s| keep.contains(s)) {
            if let Some(query) = self.query_for(*source) {
                plan = plan.with_source(*source, query);
            }
        }
        plan
    }
}

// =============================================================================
// Source Results
// =============================================================================

/// A web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub url: String,
    pub text: String,
}

/// A scholarly paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub url: String,
    pub abstract_text: String,
    pub year: Option<i32>,
    pub authors: Vec<String>,
}

/// A news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub description: String,
    pub outlet: Option<String>,
    pub published_at: Option<String>,
}

/// Normalized payload of one adapter, tagged by the adapter that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "data", rename_all = "snake_case")]
pub enum SourcePayload {
    Web { hits: Vec<WebHit> },
    Academic { papers: Vec<Paper> },
    News { articles: Vec<Article> },
    Synthesis { answer: String },
}

impl SourcePayload {
    /// Adapter this payload belongs to.
    pub fn source(&self) -> SourceId {
        match self {
            Self::Web { .. } => SourceId::Web,
            Self::Academic { .. } => SourceId::Academic,
            Self::News { .. } => SourceId::News,
            Self::Synthesis { .. } => SourceId::Synthesis,
        }
    }

    /// Plain-text rendering used as generation context.
    pub fn text(&self) -> String {
        match self {
            Self::Web { hits } => hits
                .iter()
                .map(|h| format!("{}: {}", h.title, h.text))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Academic { papers } => papers
                .iter()
                .map(|p| match p.year {
                    Some(year) => format!("{} ({}): {}", p.title, year, p.abstract_text),
                    None => format!("{}: {}", p.title, p.abstract_text),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Self::News { articles } => articles
                .iter()
                .map(|a| match &a.outlet {
                    Some(outlet) => format!("{} [{}]: {}", a.title, outlet, a.description),
                    None => format!("{}: {}", a.title, a.description),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Synthesis { answer } => answer.clone(),
        }
    }
}

/// Outcome of one adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceResult {
    /// Adapter that produced the result.
    pub source: SourceId,
    /// Normalized payload, absent on failure.
    pub data: Option<SourcePayload>,
    /// Citations in the adapter's own ranking order.
    pub citations: Vec<Citation>,
    /// Failure reason, if any.
    pub error: Option<String>,
    /// Wall time of the invocation.
    pub elapsed_ms: u64,
}

impl SourceResult {
    /// Successful result.
    pub fn success(source: SourceId, data: SourcePayload, citations: Vec<Citation>) -> Self {
        Self {
            source,
            data: Some(data),
            citations,
            error: None,
            elapsed_ms: 0,
        }
    }

    /// Failed result.
    pub fn failure(source: SourceId, reason: impl Into<String>) -> Self {
        Self {
            source,
            data: None,
            citations: Vec::new(),
            error: Some(reason.into()),
            elapsed_ms: 0,
        }
    }

    /// Record elapsed time.
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Whether the invocation succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_is_ordered_set() {
        let plan = SourcePlan::new(AnswerShape::Brief, 3)
            .with_source(SourceId::Academic, "papers on x")
            .with_source(SourceId::Web, "x")
            .with_source(SourceId::Academic, "ignored");

        assert_eq!(plan.sources, vec![SourceId::Academic, SourceId::Web]);
        assert_eq!(plan.query_for(SourceId::Academic), Some("papers on x"));
        assert_eq!(plan.priority_of(SourceId::Web), Some(1));
        assert_eq!(plan.priority_of(SourceId::News), None);
    }

    #[test]
    fn test_narrowed_plan_keeps_order_and_queries() {
        let plan = SourcePlan::new(AnswerShape::Report, 8)
            .with_source(SourceId::News, "n")
            .with_source(SourceId::Web, "w")
            .with_source(SourceId::Synthesis, "s");

        let narrowed = plan.narrowed_to(&[SourceId::Synthesis, SourceId::News]);
        assert_eq!(narrowed.sources, vec![SourceId::News, SourceId::Synthesis]);
        assert_eq!(narrowed.query_for(SourceId::Synthesis), Some("s"));
        assert_eq!(narrowed.max_results, 8);
        assert_eq!(narrowed.expected_answer_shape, AnswerShape::Report);
    }

    #[test]
    fn test_source_id_round_trip() {
        for id in SourceId::ALL {
            assert_eq!(id.as_str().parse::<SourceId>().unwrap(), id);
        }
        assert!("telepathy".parse::<SourceId>().is_err());
    }

    #[test]
    fn test_payload_tagging() {
        let payload = SourcePayload::Synthesis {
            answer: "Rust is a systems language.".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["source"], "synthesis");
        assert_eq!(payload.source(), SourceId::Synthesis);
        assert_eq!(payload.text(), "Rust is a systems language.");
    }
}
