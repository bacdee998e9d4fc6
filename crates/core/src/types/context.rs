use serde::{Deserialize, Serialize};

use super::citation::Citation;

/// Merged research context handed to the generation source.
///
/// Derived per request and discarded after the generation call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizedContext {
    /// Concatenated, budgeted source text.
    pub summary: String,
    /// Deduplicated citations, first-seen order, capped.
    pub citations: Vec<Citation>,
    /// Short standalone facts.
    pub key_facts: Vec<String>,
}

impl SynthesizedContext {
    /// Whether there is nothing to ground the answer on.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.citations.is_empty() && self.key_facts.is_empty()
    }
}
