//! Intent classification.
//!
//! A single fast completion call with a JSON-schema constrained answer. Any
//! provider failure (error, timeout, unparsable output) falls back to a local
//! keyword heuristic that never asks for research.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use answer_engine_core::{
    config::ClassifierConfig,
    traits::{IntentClassifier, LlmClient},
    types::{category, IntentDecision},
};
use answer_engine_governance::track_classification;

/// Keyword patterns checked in order; first match decides the category.
const HEURISTIC_PATTERNS: &[(&str, &str)] = &[
    (
        category::CONVERSATIONAL,
        r"(?i)^\s*(hi|hello|hey|thanks|thank you|good (morning|afternoon|evening))\b",
    ),
    (
        category::NEWS,
        r"(?i)\b(latest|today|yesterday|this week|breaking|news|headlines?|election|announced)\b",
    ),
    (
        category::ACADEMIC,
        r"(?i)\b(paper|papers|study|studies|arxiv|journal|peer[- ]reviewed|meta-analysis|theorem|clinical trial)\b",
    ),
];

// =============================================================================
// Heuristic Classifier
// =============================================================================

/// Local keyword classifier.
///
/// Only picks a category; `needs_research` is always false so a provider
/// outage never triggers research on its own.
pub struct HeuristicClassifier {
    patterns: Vec<(&'static str, Regex)>,
}

impl HeuristicClassifier {
    pub fn new() -> Self {
        let patterns = HEURISTIC_PATTERNS
            .iter()
            .filter_map(|(cat, pattern)| match Regex::new(pattern) {
                Ok(re) => Some((*cat, re)),
                Err(e) => {
                    tracing::warn!(category = %cat, error = %e, "Invalid heuristic pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn classify(&self, query: &str) -> IntentDecision {
        let category = self
            .patterns
            .iter()
            .find(|(_, re)| re.is_match(query))
            .map(|(cat, _)| *cat)
            .unwrap_or(category::GENERAL);
        IntentDecision::no_research(category)
    }
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Provider-backed Classifier
// =============================================================================

/// Classifier calling a fast completion provider, with heuristic fallback.
pub struct LlmIntentClassifier {
    llm: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
    heuristic: HeuristicClassifier,
}

impl LlmIntentClassifier {
    /// Create a classifier; `None` means heuristics only.
    pub fn new(llm: Option<Arc<dyn LlmClient>>, timeout: Duration) -> Self {
        Self {
            llm,
            timeout,
            heuristic: HeuristicClassifier::new(),
        }
    }

    pub fn from_config(llm: Option<Arc<dyn LlmClient>>, config: &ClassifierConfig) -> Self {
        Self::new(llm, Duration::from_millis(config.timeout_ms))
    }

    fn prompt(query: &str) -> String {
        let schema = serde_json::to_string(&schemars::schema_for!(IntentDecision)).unwrap_or_default();
        format!(
            "Decide whether answering the question below needs fresh external research.\n\
            Categories: general, academic, news, conversational.\n\
            Respond with ONLY a JSON object matching this schema:\n{}\n\n\
            Question: {}",
            schema, query
        )
    }

    async fn classify_with_provider(&self, llm: &dyn LlmClient, query: &str) -> Option<IntentDecision> {
        let response = match tokio::time::timeout(self.timeout, llm.complete(&Self::prompt(query))).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Intent classification failed; using heuristic");
                return None;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Intent classification timed out; using heuristic"
                );
                return None;
            }
        };

        let parsed = parse_decision(&response.content);
        if parsed.is_none() {
            tracing::warn!(
                content_len = response.content.len(),
                "Unparsable classifier output; using heuristic"
            );
        }
        parsed
    }
}

/// The first JSON object in `raw`, tolerating code fences and prose around it.
fn parse_decision(raw: &str) -> Option<IntentDecision> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    let mut decision: IntentDecision = serde_json::from_str(&raw[start..=end]).ok()?;
    decision.category = decision.category.trim().to_lowercase();
    if decision.category.is_empty() {
        decision.category = category::GENERAL.to_string();
    }
    Some(decision)
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, query: &str) -> IntentDecision {
        if let Some(llm) = &self.llm {
            if let Some(decision) = self.classify_with_provider(llm.as_ref(), query).await {
                track_classification("provider");
                tracing::debug!(
                    needs_research = decision.needs_research,
                    depth = ?decision.depth,
                    category = %decision.category,
                    "Intent classified"
                );
                return decision;
            }
        }

        track_classification("heuristic");
        self.heuristic.classify(query)
    }
}
