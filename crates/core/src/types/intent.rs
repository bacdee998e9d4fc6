use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Intent Types (L0 Classifier Output)
// =============================================================================

/// Well-known query categories produced by the classifier.
pub mod category {
    /// Anything without a more specific category.
    pub const GENERAL: &str = "general";
    /// Papers, studies, scientific questions.
    pub const ACADEMIC: &str = "academic";
    /// Current events.
    pub const NEWS: &str = "news";
    /// Greetings, chit-chat, creative writing.
    pub const CONVERSATIONAL: &str = "conversational";
}

/// How much research effort a query deserves.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    /// A couple of sources, short answer.
    #[default]
    Quick,
    /// The usual amount of research.
    Standard,
    /// Broad research, long-form answer.
    Comprehensive,
}

impl ResearchDepth {
    /// Maximum number of results requested from each source at this depth.
    pub fn results_per_source(self) -> usize {
        match self {
            Self::Quick => 3,
            Self::Standard => 5,
            Self::Comprehensive => 8,
        }
    }
}

/// Intent classification result, produced once per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IntentDecision {
    /// Whether the query needs external research.
    pub needs_research: bool,
    /// Research depth.
    pub depth: ResearchDepth,
    /// Free-form category (see [`category`]).
    pub category: String,
}

impl IntentDecision {
    /// A decision that skips research.
    pub fn no_research(category: impl Into<String>) -> Self {
        Self {
            needs_research: false,
            depth: ResearchDepth::Quick,
            category: category.into(),
        }
    }

    /// A decision that requires research at the given depth.
    pub fn research(depth: ResearchDepth, category: impl Into<String>) -> Self {
        Self {
            needs_research: true,
            depth,
            category: category.into(),
        }
    }

    /// Check whether the category matches (case-insensitive).
    pub fn is_category(&self, category: &str) -> bool {
        self.category.eq_ignore_ascii_case(category)
    }
}

impl Default for IntentDecision {
    fn default() -> Self {
        Self::no_research(category::GENERAL)
    }
}

// =============================================================================
// Reasoning Mode
// =============================================================================

/// Caller override for web research.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    /// Defer to the classifier.
    #[default]
    Auto,
    /// Always research.
    On,
    /// Never research.
    Off,
}

impl fmt::Display for ReasoningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Auto => "auto",
            Self::On => "on",
            Self::Off => "off",
        };
        f.write_str(s)
    }
}

impl FromStr for ReasoningMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "on" | "true" => Ok(Self::On),
            "off" | "false" => Ok(Self::Off),
            other => Err(crate::Error::invalid_request(format!(
                "unknown reasoning mode '{}'",
                other
            ))),
        }
    }
}

/// Resolved research directive after reconciling mode and intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchDirective {
    /// Whether to run the research fan-out.
    pub use_web_search: bool,
    /// Depth to research at.
    pub depth: ResearchDepth,
}
