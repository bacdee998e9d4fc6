#![deny(unused)]
//! Answer Engine - research-backed streaming answers.
//!
//! Classifies each question, fans out to research providers, synthesizes a
//! bounded context and streams the generated answer with interleaved
//! progress frames.

use std::sync::Arc;
use std::time::Duration;

use answer_engine_controller::{PlanBuilder, SourceOrchestrator, Synthesizer};
use answer_engine_core::{config::AppConfig, traits::LlmClient};
use answer_engine_gateway::{AnswerPipeline, GatewayServer, LlmIntentClassifier};
use answer_engine_governance::{InMemoryUsageLedger, configure_tracing, setup_metrics_recorder};
use answer_engine_model_gateway::{create_fast_client, create_generation_source};
use answer_engine_skills::AdapterRegistry;
use answer_engine_store::InMemoryAnswerStore;

/// Credits debited per completed answer.
const COST_PER_ANSWER: i64 = 1;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    configure_tracing(config.logging.json)?;

    tracing::info!("Starting Answer Engine v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Initialize L-M: Model Gateway
    // =========================================================================
    let fast_client: Option<Arc<dyn LlmClient>> =
        create_fast_client(&config.classifier).map(|c| Arc::new(c) as Arc<dyn LlmClient>);
    let generation = create_generation_source(&config.generation);

    // =========================================================================
    // Initialize L2: Source Adapters
    // =========================================================================
    let registry = Arc::new(AdapterRegistry::from_config(&config));
    if registry.is_empty() {
        tracing::warn!("No source adapters enabled; answers will not be researched");
    }
    tracing::info!(sources = ?registry.ids(), "L2 Source adapters initialized");

    // =========================================================================
    // Initialize L1: Controller
    // =========================================================================
    let orchestrator = SourceOrchestrator::new(registry);
    let mut planner = PlanBuilder::new(orchestrator.available_sources());
    if config.research.refine_queries {
        if let Some(llm) = &fast_client {
            planner = planner.with_refiner(llm.clone(), Duration::from_millis(config.classifier.timeout_ms));
        }
    }

    // =========================================================================
    // Initialize L0: Gateway
    // =========================================================================
    let classifier = Arc::new(LlmIntentClassifier::from_config(fast_client, &config.classifier));
    let pipeline = AnswerPipeline::new(classifier, orchestrator, generation)
        .with_planner(planner)
        .with_synthesizer(Synthesizer::from_config(&config.research))
        .with_retry(config.research.retry_failed_sources)
        .with_ledger(Arc::new(InMemoryUsageLedger::new(COST_PER_ANSWER)))
        .with_store(Arc::new(InMemoryAnswerStore::new()));

    let mut server = GatewayServer::new(config.server.clone(), Arc::new(pipeline))
        .with_max_frame_bytes(config.protocol.max_frame_bytes);
    if config.server.enable_metrics {
        server = server.with_metrics(setup_metrics_recorder()?);
    }

    server.run().await?;
    Ok(())
}
