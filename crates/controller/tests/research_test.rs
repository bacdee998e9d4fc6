//! Integration tests for planning, orchestration and synthesis together.

use std::sync::Arc;
use std::time::Duration;

use answer_engine_controller::{PlanBuilder, SourceOrchestrator, Synthesizer};
use answer_engine_core::mocks::{web_output, MockAdapter, MockBehavior};
use answer_engine_core::types::{
    category, AnswerShape, Citation, IntentDecision, ResearchDepth, SourceId, SourcePayload,
    SourcePlan, SourceResult, SourceType,
};
use answer_engine_core::AdapterError;
use answer_engine_skills::AdapterRegistry;

fn orchestrator(adapters: Vec<MockAdapter>) -> SourceOrchestrator {
    let registry = AdapterRegistry::new();
    for adapter in adapters {
        registry.register(Arc::new(adapter));
    }
    SourceOrchestrator::new(Arc::new(registry))
}

#[tokio::test(start_paused = true)]
async fn test_success_plus_timeout_scenario() {
    let orchestrator = orchestrator(vec![
        MockAdapter::with_urls(SourceId::Web, &["https://a.com/1", "https://a.com/2"]),
        MockAdapter::new(
            SourceId::Synthesis,
            MockBehavior::Delay(Duration::from_secs(60), web_output(&["https://never.com"])),
        )
        .with_timeout(Duration::from_secs(2)),
    ]);

    let intent = IntentDecision::research(ResearchDepth::Quick, category::GENERAL);
    let builder = PlanBuilder::new(orchestrator.available_sources());
    let plan = builder.build("what is a monad", &intent).await;
    assert_eq!(plan.sources, vec![SourceId::Web, SourceId::Synthesis]);

    let results = orchestrator.execute(&plan).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results.iter().filter(|r| r.is_success()).count(), 1);
    let timed_out = results.iter().find(|r| r.source == SourceId::Synthesis).unwrap();
    assert_eq!(timed_out.error.as_deref(), Some("timed out after 2000 ms"));

    let context = Synthesizer::default().synthesize(&plan, &results);
    assert_eq!(context.citations.len(), 2);
}

#[tokio::test]
async fn test_any_proper_subset_failing_returns_all_results() {
    let sources = [SourceId::Academic, SourceId::Web, SourceId::Synthesis];

    // Every non-empty proper subset of the three adapters fails.
    for mask in 1u8..7 {
        let adapters = sources
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                if mask & (1 << i) != 0 {
                    MockAdapter::failing(id, AdapterError::Http { status: 503, body: "down".into() })
                } else {
                    MockAdapter::with_urls(id, &["https://ok.example"])
                }
            })
            .collect();
        let orchestrator = orchestrator(adapters);
        let plan = sources
            .iter()
            .fold(SourcePlan::new(AnswerShape::Explanatory, 3), |p, s| p.with_source(*s, "q"));

        let results = orchestrator.execute(&plan).await;
        assert_eq!(results.len(), 3, "mask {:b}", mask);
        assert_eq!(
            results.iter().filter(|r| !r.is_success()).count(),
            mask.count_ones() as usize
        );
    }
}

#[tokio::test]
async fn test_all_failing_degrades_to_empty_context() {
    let orchestrator = orchestrator(vec![
        MockAdapter::failing(SourceId::Web, AdapterError::Transport("refused".into())),
        MockAdapter::failing(SourceId::Synthesis, AdapterError::NotConfigured("no key".into())),
    ]);
    let plan = SourcePlan::new(AnswerShape::Brief, 3)
        .with_source(SourceId::Web, "q")
        .with_source(SourceId::Synthesis, "q");

    let results = orchestrator.execute(&plan).await;
    let context = Synthesizer::default().synthesize(&plan, &results);
    assert!(context.is_empty());
}

#[test]
fn test_citation_dedup_prefers_plan_order() {
    let plan = SourcePlan::new(AnswerShape::Explanatory, 5)
        .with_source(SourceId::Academic, "q")
        .with_source(SourceId::Web, "q");

    let shared = "https://arxiv.org/abs/1706.03762";
    let web = SourceResult::success(
        SourceId::Web,
        SourcePayload::Web { hits: vec![] },
        vec![Citation::new(shared, "Web copy", "web snippet", SourceType::Web)],
    );
    let academic = SourceResult::success(
        SourceId::Academic,
        SourcePayload::Academic { papers: vec![] },
        vec![Citation::new(shared, "Paper", "academic snippet", SourceType::Academic)],
    );

    // Web completed first, but academic has priority in the plan.
    let context = Synthesizer::default().synthesize(&plan, &[web, academic]);
    assert_eq!(context.citations.len(), 1);
    assert_eq!(context.citations[0].snippet, "academic snippet");
    assert_eq!(context.citations[0].source_type, SourceType::Academic);
}

#[tokio::test]
async fn test_retry_reruns_failed_sources_only() {
    let web = Arc::new(MockAdapter::with_urls(SourceId::Web, &["https://ok.example"]));
    let synthesis = Arc::new(MockAdapter::failing(SourceId::Synthesis, AdapterError::Timeout(10)));
    let registry = AdapterRegistry::new();
    registry.register(web.clone());
    registry.register(synthesis.clone());
    let orchestrator = SourceOrchestrator::new(Arc::new(registry));

    let plan = SourcePlan::new(AnswerShape::Explanatory, 3)
        .with_source(SourceId::Web, "web phrase")
        .with_source(SourceId::Synthesis, "full question");

    let mut results = orchestrator.execute(&plan).await;
    orchestrator.retry_failed(&plan, &mut results).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().any(|r| r.source == SourceId::Web && r.is_success()));
    assert!(results.iter().any(|r| r.source == SourceId::Synthesis && !r.is_success()));
    assert_eq!(web.queries().len(), 1);
    assert_eq!(synthesis.queries(), vec!["full question", "full question"]);
}
