//! Research synthesis.
//!
//! Merges adapter results into one bounded generation context. Output is a
//! pure function of the plan and the result set: results are reordered by
//! plan priority first, so completion order never leaks into the context.

use std::collections::HashSet;

use answer_engine_core::{
    config::ResearchConfig,
    traits::ChatMessage,
    types::{AnswerShape, Citation, SourcePayload, SourcePlan, SourceResult, SynthesizedContext},
};

/// Longest key fact.
const MAX_FACT_CHARS: usize = 240;

/// Merges results into a [`SynthesizedContext`].
#[derive(Debug, Clone)]
pub struct Synthesizer {
    max_citations: usize,
    per_source_char_budget: usize,
    max_key_facts: usize,
}

impl Synthesizer {
    pub fn new(max_citations: usize, per_source_char_budget: usize, max_key_facts: usize) -> Self {
        Self {
            max_citations,
            per_source_char_budget,
            max_key_facts,
        }
    }

    pub fn from_config(config: &ResearchConfig) -> Self {
        Self::new(
            config.max_citations,
            config.per_source_char_budget,
            config.max_key_facts,
        )
    }

    /// Synthesize the context for `plan` from `results`.
    pub fn synthesize(&self, plan: &SourcePlan, results: &[SourceResult]) -> SynthesizedContext {
        let mut ordered: Vec<&SourceResult> = results.iter().filter(|r| r.is_success()).collect();
        ordered.sort_by_key(|r| (plan.priority_of(r.source).unwrap_or(usize::MAX), r.source));

        let summary = ordered
            .iter()
            .filter_map(|r| r.data.as_ref())
            .filter_map(|payload| {
                let full = payload.text();
                let text = truncate_at_char(&full, self.per_source_char_budget);
                (!text.trim().is_empty()).then(|| format!("[{}]\n{}", payload.source(), text))
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let citations = self.merge_citations(&ordered);
        let key_facts = self.key_facts(&ordered, &citations);

        SynthesizedContext {
            summary,
            citations,
            key_facts,
        }
    }

    /// Deduplicate by url, first occurrence in plan order wins, then cap.
    fn merge_citations(&self, ordered: &[&SourceResult]) -> Vec<Citation> {
        let mut seen = HashSet::new();
        ordered
            .iter()
            .flat_map(|r| r.citations.iter())
            .filter(|c| seen.insert(c.url.as_str()))
            .take(self.max_citations)
            .cloned()
            .collect()
    }

    /// Lead sentence of the synthesis answer, then the lead sentence of each
    /// kept citation's snippet.
    fn key_facts(&self, ordered: &[&SourceResult], citations: &[Citation]) -> Vec<String> {
        let answer_lead = ordered.iter().find_map(|r| match &r.data {
            Some(SourcePayload::Synthesis { answer }) => first_sentence(answer),
            _ => None,
        });

        let mut seen = HashSet::new();
        answer_lead
            .into_iter()
            .chain(citations.iter().filter_map(|c| first_sentence(&c.snippet)))
            .filter(|fact| seen.insert(fact.to_lowercase()))
            .take(self.max_key_facts)
            .collect()
    }
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::from_config(&ResearchConfig::default())
    }
}

/// At most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_at_char(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

fn first_sentence(text: &str) -> Option<String> {
    let text = text.trim();
    let end = text
        .char_indices()
        .find(|&(i, c)| {
            matches!(c, '.' | '!' | '?')
                && text[i + c.len_utf8()..].chars().next().map_or(true, char::is_whitespace)
        })
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(text.len());
    let sentence = truncate_at_char(text[..end].trim(), MAX_FACT_CHARS).trim();
    (!sentence.is_empty()).then(|| sentence.to_string())
}

fn shape_instruction(shape: AnswerShape) -> &'static str {
    match shape {
        AnswerShape::Brief => "Answer in one or two short paragraphs.",
        AnswerShape::Explanatory => "Give a clear explanatory answer.",
        AnswerShape::Comparative => "Compare the options side by side and end with a recommendation.",
        AnswerShape::Report => "Write a structured report with headed sections.",
    }
}

/// Messages for the generation source.
pub fn generation_messages(query: &str, context: &SynthesizedContext, shape: AnswerShape) -> Vec<ChatMessage> {
    let mut system = format!(
        "You are a helpful answer engine. {}",
        shape_instruction(shape)
    );

    if context.is_empty() {
        system.push_str(" Answer from your own knowledge.");
    } else {
        system.push_str(" Ground the answer in the research below and cite sources as [n].\n\n");
        if !context.key_facts.is_empty() {
            system.push_str("Key facts:\n");
            for fact in &context.key_facts {
                system.push_str(&format!("- {}\n", fact));
            }
            system.push('\n');
        }
        if !context.summary.is_empty() {
            system.push_str("Research:\n");
            system.push_str(&context.summary);
            system.push_str("\n\n");
        }
        if !context.citations.is_empty() {
            system.push_str("Sources:\n");
            for (i, citation) in context.citations.iter().enumerate() {
                system.push_str(&format!("[{}] {} - {}\n", i + 1, citation.title, citation.url));
            }
        }
    }

    vec![ChatMessage::system(system), ChatMessage::user(query)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_engine_core::types::{SourceId, SourceType, WebHit};

    fn plan() -> SourcePlan {
        SourcePlan::new(AnswerShape::Explanatory, 5)
            .with_source(SourceId::Web, "q")
            .with_source(SourceId::Synthesis, "q")
    }

    fn web_result(text: &str) -> SourceResult {
        SourceResult::success(
            SourceId::Web,
            SourcePayload::Web {
                hits: vec![WebHit {
                    title: "Hit".into(),
                    url: "https://a.com".into(),
                    text: text.into(),
                }],
            },
            vec![Citation::new("https://a.com", "A", "Web snippet. More.", SourceType::Web)],
        )
    }

    fn synthesis_result() -> SourceResult {
        SourceResult::success(
            SourceId::Synthesis,
            SourcePayload::Synthesis {
                answer: "Answer lead sentence. Second sentence.".into(),
            },
            vec![
                Citation::new("https://a.com", "A again", "Other snippet", SourceType::Web),
                Citation::new("https://b.com", "B", "", SourceType::Web),
            ],
        )
    }

    #[test]
    fn test_order_independent() {
        let synthesizer = Synthesizer::default();
        let forward = synthesizer.synthesize(&plan(), &[web_result("w"), synthesis_result()]);
        let reverse = synthesizer.synthesize(&plan(), &[synthesis_result(), web_result("w")]);
        assert_eq!(forward, reverse);
        assert_eq!(forward.citations[0].title, "A");
        assert!(forward.summary.starts_with("[web]"));
    }

    #[test]
    fn test_key_facts() {
        let context = Synthesizer::default().synthesize(&plan(), &[synthesis_result(), web_result("w")]);
        assert_eq!(context.key_facts, vec!["Answer lead sentence.", "Web snippet."]);
    }

    #[test]
    fn test_budget_and_cap() {
        let synthesizer = Synthesizer::new(1, 4, 6);
        let context = synthesizer.synthesize(&plan(), &[web_result("ééééééé"), synthesis_result()]);
        assert_eq!(context.citations.len(), 1);
        assert!(context.summary.contains("Hit:"));
        assert!(!context.summary.contains("ééé"));
    }

    #[test]
    fn test_summary_truncated_per_source() {
        let synthesizer = Synthesizer::new(8, 10, 6);
        let context = synthesizer.synthesize(&plan(), &[synthesis_result(), web_result("abcdefghij")]);
        assert_eq!(context.summary, "[web]\nHit: abcde\n\n[synthesis]\nAnswer lea");
    }

    #[test]
    fn test_failed_results_ignored() {
        let context = Synthesizer::default().synthesize(
            &plan(),
            &[SourceResult::failure(SourceId::Web, "timed out after 10 ms")],
        );
        assert!(context.is_empty());
    }

    #[test]
    fn test_first_sentence() {
        assert_eq!(first_sentence("Version 1.5 shipped. Then more.").as_deref(), Some("Version 1.5 shipped."));
        assert_eq!(first_sentence("  no terminator").as_deref(), Some("no terminator"));
        assert_eq!(first_sentence("   "), None);
    }

    #[test]
    fn test_messages_include_numbered_sources() {
        let context = Synthesizer::default().synthesize(&plan(), &[web_result("w")]);
        let messages = generation_messages("what?", &context, AnswerShape::Brief);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("[1] A - https://a.com"));
        assert_eq!(messages[1].content, "what?");
    }
}
