//! Source plan building.
//!
//! Turns an intent decision into the concrete list of adapter invocations.
//! Adapter selection is a pure function of the query and intent; the
//! optional search-phrase refinement is the only provider call, and it falls
//! back to the raw query on any failure.

use std::sync::Arc;
use std::time::Duration;

use answer_engine_core::{
    traits::LlmClient,
    types::{category, AnswerShape, IntentDecision, ResearchDepth, SourceId, SourcePlan},
};

/// Words that mark a comparison question.
const COMPARATIVE_MARKERS: &[&str] = &[" vs ", " vs. ", " versus ", "compare", "difference between", "differences between"];

/// Queries up to this many words count as short.
const SHORT_QUERY_WORDS: usize = 8;

/// Builds a [`SourcePlan`] from a query and its intent.
pub struct PlanBuilder {
    available: Vec<SourceId>,
    refiner: Option<Arc<dyn LlmClient>>,
    refine_timeout: Duration,
}

impl PlanBuilder {
    /// Create a builder selecting among the `available` adapters.
    pub fn new(available: Vec<SourceId>) -> Self {
        Self {
            available,
            refiner: None,
            refine_timeout: Duration::from_millis(800),
        }
    }

    /// Refine search phrases with a fast completion client.
    pub fn with_refiner(mut self, llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        self.refiner = Some(llm);
        self.refine_timeout = timeout;
        self
    }

    /// Adapters preferred for a category, highest priority first.
    pub fn preferred_sources(intent: &IntentDecision) -> Vec<SourceId> {
        if intent.is_category(category::ACADEMIC) {
            vec![SourceId::Academic, SourceId::Web, SourceId::Synthesis]
        } else if intent.is_category(category::NEWS) {
            vec![SourceId::News, SourceId::Web, SourceId::Synthesis]
        } else {
            vec![SourceId::Web, SourceId::Synthesis]
        }
    }

    /// Expected answer shape from depth and query wording.
    pub fn answer_shape(query: &str, depth: ResearchDepth) -> AnswerShape {
        let padded = format!(" {} ", query.to_lowercase());
        if COMPARATIVE_MARKERS.iter().any(|m| padded.contains(m)) {
            AnswerShape::Comparative
        } else if depth == ResearchDepth::Comprehensive {
            AnswerShape::Report
        } else if depth == ResearchDepth::Quick && query.split_whitespace().count() <= SHORT_QUERY_WORDS {
            AnswerShape::Brief
        } else {
            AnswerShape::Explanatory
        }
    }

    /// Build the plan with `search_phrase` for search adapters and the raw
    /// query for the synthesis adapter.
    ///
    /// An intent without research yields an empty plan. With research the
    /// plan is never empty: if none of the preferred adapters is available,
    /// web is kept.
    pub fn plan_with_phrase(&self, query: &str, search_phrase: &str, intent: &IntentDecision) -> SourcePlan {
        let mut plan = SourcePlan::new(
            Self::answer_shape(query, intent.depth),
            intent.depth.results_per_source(),
        );
        if !intent.needs_research {
            return plan;
        }

        for source in Self::preferred_sources(intent)
            .into_iter()
            .filter(|s| self.available.contains(s))
        {
            let phrase = match source {
                SourceId::Synthesis => query,
                _ => search_phrase,
            };
            plan = plan.with_source(source, phrase);
        }

        if plan.is_empty() {
            tracing::warn!(
                category = %intent.category,
                "No preferred adapter available; falling back to web"
            );
            plan = plan.with_source(SourceId::Web, search_phrase);
        }
        plan
    }

    /// Build the plan without refinement.
    pub fn plan(&self, query: &str, intent: &IntentDecision) -> SourcePlan {
        self.plan_with_phrase(query, query, intent)
    }

    /// Build the plan, refining the search phrase when a refiner is set.
    pub async fn build(&self, query: &str, intent: &IntentDecision) -> SourcePlan {
        if !intent.needs_research {
            return self.plan(query, intent);
        }
        let phrase = self.refine(query).await;
        self.plan_with_phrase(query, &phrase, intent)
    }

    /// Search phrase for `query`; the raw query on any failure.
    async fn refine(&self, query: &str) -> String {
        let Some(llm) = &self.refiner else {
            return query.to_string();
        };

        let prompt = format!(
            "Rewrite the question below as a short web search query.\n\
            Return ONLY the query, on one line, without quotes.\n\
            Question: {}",
            query
        );

        match tokio::time::timeout(self.refine_timeout, llm.complete(&prompt)).await {
            Ok(Ok(response)) => match clean_phrase(&response.content) {
                Some(phrase) => {
                    tracing::debug!(phrase = %phrase, "Refined search phrase");
                    phrase
                }
                None => {
                    tracing::warn!("Refiner returned an empty phrase; using raw query");
                    query.to_string()
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Query refinement failed; using raw query");
                query.to_string()
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.refine_timeout.as_millis() as u64,
                    "Query refinement timed out; using raw query"
                );
                query.to_string()
            }
        }
    }
}

fn clean_phrase(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let phrase = line.trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();
    (!phrase.is_empty()).then(|| phrase.to_string())
}
