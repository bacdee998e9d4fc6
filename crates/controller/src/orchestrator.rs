//! Source orchestration.
//!
//! Runs every adapter of a plan concurrently, one spawned task per adapter.
//! Results are yielded in completion order. A missing adapter, a failing
//! adapter or a panicking adapter task all become a failed `SourceResult`;
//! nothing here returns an error.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::task::AbortHandle;

use answer_engine_core::types::{SourceId, SourcePlan, SourceResult};
use answer_engine_governance::track_adapter_call;
use answer_engine_skills::AdapterRegistry;

/// Executes source plans against the adapter registry.
#[derive(Clone)]
pub struct SourceOrchestrator {
    registry: Arc<AdapterRegistry>,
}

impl SourceOrchestrator {
    /// Create an orchestrator over `registry`.
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self { registry }
    }

    /// Adapters available for planning.
    pub fn available_sources(&self) -> Vec<SourceId> {
        self.registry.ids()
    }

    /// Launch every adapter of `plan` and stream results as they complete.
    ///
    /// Dropping the stream aborts adapter tasks that are still running.
    pub fn execute_stream(&self, plan: &SourcePlan) -> SourceResultStream {
        let pending: FuturesUnordered<BoxFuture<'static, SourceResult>> = FuturesUnordered::new();
        let mut aborts = Vec::with_capacity(plan.len());

        for &source in &plan.sources {
            let query = plan.query_for(source).unwrap_or_default().to_string();
            let max_results = plan.max_results;

            let Some(adapter) = self.registry.get(source) else {
                tracing::warn!(source = %source, "Planned source has no registered adapter");
                let result = SourceResult::failure(source, format!("no adapter registered for {}", source));
                pending.push(Box::pin(futures::future::ready(result)));
                continue;
            };

            tracing::debug!(source = %source, query = %query, max_results, "Launching adapter");
            let handle = tokio::spawn(async move { adapter.run(&query, max_results).await });
            aborts.push(handle.abort_handle());

            pending.push(Box::pin(async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!(source = %source, error = %e, "Adapter task failed");
                        SourceResult::failure(source, format!("adapter task failed: {}", e))
                    }
                }
            }));
        }

        SourceResultStream { pending, aborts }
    }

    /// Run `plan` to completion. Returns exactly one result per planned source.
    pub async fn execute(&self, plan: &SourcePlan) -> Vec<SourceResult> {
        let results: Vec<_> = self.execute_stream(plan).collect().await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            sources = results.len(),
            failed,
            citations = results.iter().map(|r| r.citations.len()).sum::<usize>(),
            "Source plan executed"
        );
        results
    }

    /// Re-run the failed sources of `results` once with a narrowed plan and
    /// replace their entries by source id.
    pub async fn retry_failed(&self, plan: &SourcePlan, results: &mut Vec<SourceResult>) {
        let failed: Vec<SourceId> = results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.source)
            .collect();
        if failed.is_empty() {
            return;
        }

        let narrowed = plan.narrowed_to(&failed);
        tracing::info!(sources = ?narrowed.sources, "Retrying failed sources");

        for retried in self.execute(&narrowed).await {
            if let Some(slot) = results.iter_mut().find(|r| r.source == retried.source) {
                *slot = retried;
            }
        }
    }
}

/// Results of one plan execution, in completion order.
pub struct SourceResultStream {
    pending: FuturesUnordered<BoxFuture<'static, SourceResult>>,
    aborts: Vec<AbortHandle>,
}

impl Stream for SourceResultStream {
    type Item = SourceResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.pending.poll_next_unpin(cx);
        if let Poll::Ready(Some(result)) = &polled {
            let outcome = if result.is_success() { "success" } else { "failure" };
            track_adapter_call(result.source.as_str(), outcome, result.elapsed_ms as f64 / 1000.0);
            match &result.error {
                None => tracing::info!(
                    source = %result.source,
                    citations = result.citations.len(),
                    elapsed_ms = result.elapsed_ms,
                    "Source finished"
                ),
                Some(error) => tracing::warn!(
                    source = %result.source,
                    error = %error,
                    elapsed_ms = result.elapsed_ms,
                    "Source failed"
                ),
            }
        }
        polled
    }
}

impl Drop for SourceResultStream {
    fn drop(&mut self) {
        for handle in &self.aborts {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use answer_engine_core::mocks::{web_output, MockAdapter, MockBehavior};
    use answer_engine_core::types::AnswerShape;
    use std::time::Duration;

    fn plan(sources: &[SourceId]) -> SourcePlan {
        sources
            .iter()
            .fold(SourcePlan::new(AnswerShape::Explanatory, 3), |p, s| p.with_source(*s, "q"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_order() {
        let registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::new(
            SourceId::Web,
            MockBehavior::Delay(Duration::from_millis(300), web_output(&["https://a.com"])),
        )));
        registry.register(Arc::new(MockAdapter::new(
            SourceId::Synthesis,
            MockBehavior::Delay(Duration::from_millis(100), web_output(&["https://b.com"])),
        )));
        let orchestrator = SourceOrchestrator::new(Arc::new(registry));

        let results = orchestrator.execute(&plan(&[SourceId::Web, SourceId::Synthesis])).await;
        let order: Vec<_> = results.iter().map(|r| r.source).collect();
        assert_eq!(order, vec![SourceId::Synthesis, SourceId::Web]);
    }

    #[tokio::test]
    async fn test_missing_adapter_is_failed_result() {
        let orchestrator = SourceOrchestrator::new(Arc::new(AdapterRegistry::new()));
        let results = orchestrator.execute(&plan(&[SourceId::News])).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].error.as_deref(), Some("no adapter registered for news"));
    }

    #[tokio::test]
    async fn test_panicking_adapter_is_failed_result() {
        let registry = AdapterRegistry::new();
        registry.register(Arc::new(MockAdapter::new(SourceId::Academic, MockBehavior::Panic)));
        registry.register(Arc::new(MockAdapter::with_urls(SourceId::Web, &["https://ok.com"])));
        let orchestrator = SourceOrchestrator::new(Arc::new(registry));

        let results = orchestrator.execute(&plan(&[SourceId::Academic, SourceId::Web])).await;
        assert_eq!(results.len(), 2);
        let academic = results.iter().find(|r| r.source == SourceId::Academic).unwrap();
        assert!(academic.error.as_ref().unwrap().starts_with("adapter task failed"));
        assert!(results.iter().any(|r| r.source == SourceId::Web && r.is_success()));
    }
}
