//! The answer pipeline.
//!
//! query → classify → resolve mode → plan → orchestrate → synthesize →
//! generate, emitted as a single ordered sequence of [`StreamFrame`]s.
//!
//! Each request runs in its own task and is the only producer of its frame
//! channel. Dropping the receiving side stops the task at its next send.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use answer_engine_controller::{generation_messages, PlanBuilder, SourceOrchestrator, Synthesizer};
use answer_engine_core::{
    traits::{AnswerRecord, AnswerStore, GenerationSource, IntentClassifier, UsageLedger},
    types::{
        AnswerRequest, AnswerShape, Citation, IntentDecision, ResearchDirective, SourcePlan, SourceResult,
        SynthesizedContext,
    },
};
use answer_engine_governance::track_answer;
use answer_engine_protocol::{
    ContextCard, SearchResultsPayload, SourceSummary, StatusPill, StreamFrame, StreamStatus,
};

use crate::reasoning::{effective_intent, resolve};

/// Frames buffered between the pipeline task and the transport.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Error code of the terminal frame when generation fails.
pub const GENERATION_FAILED: &str = "generation_failed";

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Complete,
    Failed,
    Aborted,
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            Outcome::Complete => "complete",
            Outcome::Failed => "error",
            Outcome::Aborted => "aborted",
        }
    }
}

/// Sender side of one request's frame channel.
struct FrameSink {
    tx: mpsc::Sender<StreamFrame>,
    trace_id: String,
}

impl FrameSink {
    /// Send a frame; false once the client is gone.
    async fn send(&self, frame: StreamFrame) -> bool {
        if self.tx.send(frame).await.is_err() {
            tracing::info!(trace_id = %self.trace_id, "Client went away; stopping");
            return false;
        }
        true
    }

    async fn pill(&self, pill: StatusPill) -> bool {
        self.send(StreamFrame::Status(pill)).await
    }
}

/// Runs requests end to end.
pub struct AnswerPipeline {
    classifier: Arc<dyn IntentClassifier>,
    planner: PlanBuilder,
    orchestrator: SourceOrchestrator,
    synthesizer: Synthesizer,
    generation: Arc<dyn GenerationSource>,
    ledger: Option<Arc<dyn UsageLedger>>,
    store: Option<Arc<dyn AnswerStore>>,
    retry_failed_sources: bool,
    channel_capacity: usize,
}

impl AnswerPipeline {
    /// Create a pipeline planning over the orchestrator's adapters.
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        orchestrator: SourceOrchestrator,
        generation: Arc<dyn GenerationSource>,
    ) -> Self {
        Self {
            classifier,
            planner: PlanBuilder::new(orchestrator.available_sources()),
            orchestrator,
            synthesizer: Synthesizer::default(),
            generation,
            ledger: None,
            store: None,
            retry_failed_sources: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn with_planner(mut self, planner: PlanBuilder) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Synthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn AnswerStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Re-run failed sources once with a narrowed plan.
    pub fn with_retry(mut self, enabled: bool) -> Self {
        self.retry_failed_sources = enabled;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Classify `query` and resolve the caller's mode against it.
    pub async fn decide(&self, request: &AnswerRequest) -> (IntentDecision, ResearchDirective) {
        let intent = self.classifier.classify(&request.query).await;
        let directive = resolve(request.mode, &intent);
        (intent, directive)
    }

    /// Start answering `request`; frames arrive in emission order.
    pub fn stream(self: &Arc<Self>, request: AnswerRequest) -> ReceiverStream<StreamFrame> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let sink = FrameSink {
                tx,
                trace_id: request.trace_id.clone(),
            };
            pipeline.run(request, sink).await;
        });
        ReceiverStream::new(rx)
    }

    async fn run(&self, request: AnswerRequest, sink: FrameSink) {
        let trace_id = request.trace_id.clone();
        tracing::info!(
            trace_id = %trace_id,
            mode = %request.mode,
            query_len = request.query.len(),
            "Answering"
        );

        let (intent, directive) = self.decide(&request).await;
        tracing::info!(
            trace_id = %trace_id,
            category = %intent.category,
            use_web_search = directive.use_web_search,
            depth = ?directive.depth,
            "Research directive resolved"
        );

        let (context, shape) = if directive.use_web_search {
            match self.research(&request, &effective_intent(&intent, &directive), &sink).await {
                Some(research) => research,
                None => {
                    track_answer(Outcome::Aborted.label());
                    return;
                }
            }
        } else {
            (
                SynthesizedContext::default(),
                PlanBuilder::answer_shape(&request.query, directive.depth),
            )
        };

        let (outcome, content) = self.generate(&request, &context, shape, &sink).await;
        self.settle(&request, outcome, content, context.citations).await;
        track_answer(outcome.label());
        tracing::info!(trace_id = %trace_id, outcome = outcome.label(), "Answer finished");
    }

    /// Planning through building_context. `None` if the client went away.
    async fn research(
        &self,
        request: &AnswerRequest,
        intent: &IntentDecision,
        sink: &FrameSink,
    ) -> Option<(SynthesizedContext, AnswerShape)> {
        if !sink.pill(StatusPill::new(StreamStatus::Planning, "Planning research")).await {
            return None;
        }
        let plan = self.planner.build(&request.query, intent).await;

        let sources: Vec<&str> = plan.sources.iter().map(|s| s.as_str()).collect();
        let searching = StatusPill::new(
            StreamStatus::Searching,
            format!("Searching {} sources", plan.len()),
        )
        .with_metadata(json!({ "sources": sources }));
        if !sink.pill(searching).await {
            return None;
        }

        let mut results = Vec::with_capacity(plan.len());
        let mut pending = self.orchestrator.execute_stream(&plan);
        while let Some(result) = pending.next().await {
            if !sink.pill(reading_pill(&result)).await {
                return None;
            }
            results.push(result);
        }

        if self.retry_failed_sources && results.iter().any(|r| !r.is_success()) {
            self.orchestrator.retry_failed(&plan, &mut results).await;
        }

        if !sink
            .pill(StatusPill::new(StreamStatus::BuildingContext, "Building context"))
            .await
        {
            return None;
        }
        let context = self.synthesizer.synthesize(&plan, &results);
        tracing::debug!(
            trace_id = %request.trace_id,
            citations = context.citations.len(),
            key_facts = context.key_facts.len(),
            summary_len = context.summary.len(),
            "Context synthesized"
        );

        let search = StreamFrame::SearchResults(search_payload(&request.query, &plan, &results, &context));
        if !sink.send(search).await {
            return None;
        }
        if !context.key_facts.is_empty() && !sink.send(StreamFrame::ContextCards(context_cards(&context))).await {
            return None;
        }

        Some((context, plan.expected_answer_shape))
    }

    /// Synthesizing through the terminal frame. Returns the generated text.
    async fn generate(
        &self,
        request: &AnswerRequest,
        context: &SynthesizedContext,
        shape: AnswerShape,
        sink: &FrameSink,
    ) -> (Outcome, String) {
        let mut content = String::new();
        if !sink
            .pill(StatusPill::new(StreamStatus::Synthesizing, "Writing the answer"))
            .await
        {
            return (Outcome::Aborted, content);
        }

        let messages = generation_messages(&request.query, context, shape);
        let mut tokens = match self.generation.generate(&messages).await {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::error!(trace_id = %request.trace_id, error = %e, "Generation failed to start");
                let outcome = if sink.send(StreamFrame::error(GENERATION_FAILED, e.to_string())).await {
                    Outcome::Failed
                } else {
                    Outcome::Aborted
                };
                return (outcome, content);
            }
        };

        while let Some(token) = tokens.next().await {
            match token {
                Ok(text) => {
                    content.push_str(&text);
                    if !sink.send(StreamFrame::Content(text)).await {
                        return (Outcome::Aborted, content);
                    }
                }
                Err(e) => {
                    tracing::error!(
                        trace_id = %request.trace_id,
                        error = %e,
                        streamed = content.len(),
                        "Generation failed mid-stream"
                    );
                    let outcome = if sink.send(StreamFrame::error(GENERATION_FAILED, e.to_string())).await {
                        Outcome::Failed
                    } else {
                        Outcome::Aborted
                    };
                    return (outcome, content);
                }
            }
        }

        if !sink.pill(StatusPill::complete()).await {
            return (Outcome::Aborted, content);
        }
        (Outcome::Complete, content)
    }

    /// Billing and persistence, once per request that reached generation.
    async fn settle(&self, request: &AnswerRequest, outcome: Outcome, content: String, citations: Vec<Citation>) {
        let succeeded = outcome == Outcome::Complete;

        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger
                .record(&request.trace_id, request.user_id.as_deref(), succeeded)
                .await
            {
                tracing::warn!(trace_id = %request.trace_id, error = %e, "Usage ledger rejected request");
            }
        }

        if let Some(store) = &self.store {
            let record = AnswerRecord {
                request_id: request.trace_id.clone(),
                conversation_id: request.conversation_id.clone(),
                user_id: request.user_id.clone(),
                query: request.query.clone(),
                content,
                citations,
                completed: succeeded,
                created_at: chrono::Utc::now().timestamp(),
            };
            if let Err(e) = store.save(record).await {
                tracing::warn!(trace_id = %request.trace_id, error = %e, "Failed to store answer");
            }
        }
    }
}

fn reading_pill(result: &SourceResult) -> StatusPill {
    let message = match &result.error {
        None => format!("Read {} results from {}", result.citations.len(), result.source),
        Some(_) => format!("{} unavailable", result.source),
    };
    StatusPill::new(StreamStatus::ReadingSources, message).with_metadata(json!({
        "source": result.source.as_str(),
        "citations": result.citations.len(),
        "error": result.error,
    }))
}

fn search_payload(
    query: &str,
    plan: &SourcePlan,
    results: &[SourceResult],
    context: &SynthesizedContext,
) -> SearchResultsPayload {
    let mut sources: Vec<SourceSummary> = results
        .iter()
        .map(|r| SourceSummary {
            source: r.source,
            succeeded: r.is_success(),
            citation_count: r.citations.len(),
            error: r.error.clone(),
            elapsed_ms: r.elapsed_ms,
        })
        .collect();
    sources.sort_by_key(|s| plan.priority_of(s.source).unwrap_or(usize::MAX));

    SearchResultsPayload {
        query: query.to_string(),
        citations: context.citations.clone(),
        sources,
    }
}

/// One card per key fact; a fact taken from a citation snippet links to it.
fn context_cards(context: &SynthesizedContext) -> Vec<ContextCard> {
    context
        .key_facts
        .iter()
        .enumerate()
        .map(|(i, fact)| {
            let cited = context.citations.iter().find(|c| c.snippet.starts_with(fact.as_str()));
            ContextCard {
                title: cited
                    .map(|c| c.title.clone())
                    .unwrap_or_else(|| format!("Key fact {}", i + 1)),
                body: fact.clone(),
                url: cited.map(|c| c.url.clone()),
            }
        })
        .collect()
}
