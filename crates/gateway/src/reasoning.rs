//! Reasoning-mode resolution.

use answer_engine_core::types::{IntentDecision, ReasoningMode, ResearchDepth, ResearchDirective};

/// Reconcile a caller override with the classifier's recommendation.
///
/// `On` and `Off` always win. Forcing research on a query the classifier
/// would not research uses `Standard` depth.
pub fn resolve(mode: ReasoningMode, intent: &IntentDecision) -> ResearchDirective {
    match mode {
        ReasoningMode::Auto => ResearchDirective {
            use_web_search: intent.needs_research,
            depth: intent.depth,
        },
        ReasoningMode::On => ResearchDirective {
            use_web_search: true,
            depth: if intent.needs_research {
                intent.depth
            } else {
                ResearchDepth::Standard
            },
        },
        ReasoningMode::Off => ResearchDirective {
            use_web_search: false,
            depth: ResearchDepth::Quick,
        },
    }
}

/// The intent the plan builder sees once the directive is applied.
pub fn effective_intent(intent: &IntentDecision, directive: &ResearchDirective) -> IntentDecision {
    IntentDecision {
        needs_research: directive.use_web_search,
        depth: directive.depth,
        category: intent.category.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_engine_core::types::category;

    #[test]
    fn test_auto_defers() {
        let intent = IntentDecision::research(ResearchDepth::Comprehensive, category::NEWS);
        let directive = resolve(ReasoningMode::Auto, &intent);
        assert!(directive.use_web_search);
        assert_eq!(directive.depth, ResearchDepth::Comprehensive);
        assert!(!resolve(ReasoningMode::Auto, &IntentDecision::default()).use_web_search);
    }

    #[test]
    fn test_explicit_override_wins() {
        let research = IntentDecision::research(ResearchDepth::Comprehensive, category::GENERAL);
        let skip = IntentDecision::no_research(category::GENERAL);

        assert!(!resolve(ReasoningMode::Off, &research).use_web_search);
        assert_eq!(resolve(ReasoningMode::Off, &research).depth, ResearchDepth::Quick);

        let forced = resolve(ReasoningMode::On, &skip);
        assert!(forced.use_web_search);
        assert_eq!(forced.depth, ResearchDepth::Standard);
        assert_eq!(resolve(ReasoningMode::On, &research).depth, ResearchDepth::Comprehensive);
    }

    #[test]
    fn test_effective_intent_keeps_category() {
        let intent = IntentDecision::no_research(category::ACADEMIC);
        let effective = effective_intent(&intent, &resolve(ReasoningMode::On, &intent));
        assert!(effective.needs_research);
        assert!(effective.is_category(category::ACADEMIC));
    }
}
