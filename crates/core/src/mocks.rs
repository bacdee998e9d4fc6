//! Mock implementations of core traits for testing.
//!
//! This module provides mock implementations of the core traits that can be
//! used across the workspace for unit and integration testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::{
    traits::{
        AdapterError, AdapterOutput, AnswerRecord, AnswerStore, ChatMessage, GenerationSource,
        IntentClassifier, LlmClient, LlmResponse, LlmUsage, SourceAdapter, TokenStream,
        UsageLedger,
    },
    types::{Citation, IntentDecision, SourceId, SourcePayload, SourceType, WebHit},
    Error, Result,
};

// =============================================================================
// Mock LLM Client
// =============================================================================

/// Scripted mock LLM that returns predefined responses.
pub struct MockLlm {
    responses: Vec<String>,
    should_fail: bool,
    delay: Option<Duration>,
    call_count: AtomicUsize,
}

impl MockLlm {
    /// Create a new mock LLM cycling through a queue of responses.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            should_fail: false,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always returns the same response.
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Create a mock whose every call fails.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new(Vec::new())
        }
    }

    /// Delay every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, _prompt: &str) -> Result<LlmResponse> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(Error::model_provider("Mock failure"));
        }

        let content = self
            .responses
            .get(n % self.responses.len().max(1))
            .cloned()
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            finish_reason: "stop".to_string(),
            usage: LlmUsage {
                prompt_tokens: 10,
                completion_tokens: 20,
                total_tokens: 30,
            },
        })
    }
}

// =============================================================================
// Mock Generation Source
// =============================================================================

/// Generation source that yields a fixed list of fragments.
pub struct MockGeneration {
    tokens: Vec<String>,
    fail_on_start: bool,
    fail_after: Option<usize>,
    token_delay: Option<Duration>,
    last_messages: Mutex<Vec<ChatMessage>>,
    pulled: std::sync::Arc<AtomicUsize>,
}

impl MockGeneration {
    /// Yield the given fragments in order.
    pub fn new<S: Into<String>>(tokens: impl IntoIterator<Item = S>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            fail_on_start: false,
            fail_after: None,
            token_delay: None,
            last_messages: Mutex::new(Vec::new()),
            pulled: std::sync::Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Refuse to start generating.
    pub fn failing() -> Self {
        Self {
            fail_on_start: true,
            ..Self::new(Vec::<String>::new())
        }
    }

    /// Yield `n` fragments, then an error.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Sleep before every fragment.
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = Some(delay);
        self
    }

    /// Messages passed to the most recent `generate` call.
    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Number of fragments consumed by callers so far.
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationSource for MockGeneration {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }
        if self.fail_on_start {
            return Err(Error::generation("Mock generation refused"));
        }

        let tokens = self.tokens.clone();
        let fail_after = self.fail_after;
        let delay = self.token_delay;
        let pulled = self.pulled.clone();

        let stream = futures::stream::unfold(0usize, move |i| {
            let tokens = tokens.clone();
            let pulled = pulled.clone();
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if fail_after == Some(i) {
                    // Terminate after the error item.
                    return Some((Err(Error::generation("Mock stream broke")), usize::MAX));
                }
                let token = tokens.get(i)?.clone();
                pulled.fetch_add(1, Ordering::SeqCst);
                Some((Ok(token), i + 1))
            }
        });

        Ok(Box::pin(stream))
    }
}

// =============================================================================
// Mock Source Adapter
// =============================================================================

/// Behaviour of a [`MockAdapter`].
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the output.
    Succeed(AdapterOutput),
    /// Return the error.
    Fail(AdapterError),
    /// Sleep, then return the output.
    Delay(Duration, AdapterOutput),
    /// Panic inside the invocation.
    Panic,
}

/// Adapter with scripted behaviour.
pub struct MockAdapter {
    id: SourceId,
    behavior: MockBehavior,
    timeout: Duration,
    queries: Mutex<Vec<String>>,
}

impl MockAdapter {
    /// Create an adapter with the given behaviour and a 1s timeout.
    pub fn new(id: SourceId, behavior: MockBehavior) -> Self {
        Self {
            id,
            behavior,
            timeout: Duration::from_secs(1),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Succeed with web hits for the given urls.
    pub fn with_urls(id: SourceId, urls: &[&str]) -> Self {
        Self::new(id, MockBehavior::Succeed(web_output(urls)))
    }

    /// Always fail.
    pub fn failing(id: SourceId, error: AdapterError) -> Self {
        Self::new(id, MockBehavior::Fail(error))
    }

    /// Override the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

/// Build a web-shaped output with one hit and one citation per url.
pub fn web_output(urls: &[&str]) -> AdapterOutput {
    let hits = urls
        .iter()
        .enumerate()
        .map(|(i, url)| WebHit {
            title: format!("Result {}", i + 1),
            url: url.to_string(),
            text: format!("Text of result {}.", i + 1),
        })
        .collect::<Vec<_>>();
    let citations = hits
        .iter()
        .map(|h| Citation::new(&h.url, &h.title, &h.text, SourceType::Web))
        .collect();
    AdapterOutput {
        payload: SourcePayload::Web { hits },
        citations,
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn id(&self) -> SourceId {
        self.id
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn invoke(
        &self,
        query: &str,
        _max_results: usize,
    ) -> std::result::Result<AdapterOutput, AdapterError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        match &self.behavior {
            MockBehavior::Succeed(output) => Ok(output.clone()),
            MockBehavior::Fail(error) => Err(error.clone()),
            MockBehavior::Delay(delay, output) => {
                tokio::time::sleep(*delay).await;
                Ok(output.clone())
            }
            MockBehavior::Panic => panic!("mock adapter panicked"),
        }
    }
}

// =============================================================================
// Mock Intent Classifier
// =============================================================================

/// Classifier that always returns the same decision.
pub struct MockClassifier {
    decision: IntentDecision,
}

impl MockClassifier {
    /// Create a fixed classifier.
    pub fn new(decision: IntentDecision) -> Self {
        Self { decision }
    }
}

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify(&self, _query: &str) -> IntentDecision {
        self.decision.clone()
    }
}

// =============================================================================
// Mock Collaborators
// =============================================================================

/// Ledger that records every call.
#[derive(Default)]
pub struct MockUsageLedger {
    calls: Mutex<Vec<(String, Option<String>, bool)>>,
}

impl MockUsageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(request_id, user_id, succeeded)` tuples.
    pub fn calls(&self) -> Vec<(String, Option<String>, bool)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl UsageLedger for MockUsageLedger {
    async fn record(&self, request_id: &str, user_id: Option<&str>, succeeded: bool) -> Result<()> {
        self.calls
            .lock()
            .map_err(|e| Error::internal(e.to_string()))?
            .push((request_id.to_string(), user_id.map(str::to_string), succeeded));
        Ok(())
    }
}

/// Store that keeps records in a map.
#[derive(Default)]
pub struct MockAnswerStore {
    records: Mutex<HashMap<String, AnswerRecord>>,
}

impl MockAnswerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saved records.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether nothing was saved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AnswerStore for MockAnswerStore {
    async fn save(&self, record: AnswerRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|e| Error::storage(e.to_string()))?
            .insert(record.request_id.clone(), record);
        Ok(())
    }

    async fn get(&self, request_id: &str) -> Result<Option<AnswerRecord>> {
        Ok(self
            .records
            .lock()
            .map_err(|e| Error::storage(e.to_string()))?
            .get(request_id)
            .cloned())
    }

    async fn list_conversation(&self, conversation_id: &str) -> Result<Vec<AnswerRecord>> {
        let records = self.records.lock().map_err(|e| Error::storage(e.to_string()))?;
        let mut list: Vec<_> = records
            .values()
            .filter(|r| r.conversation_id.as_deref() == Some(conversation_id))
            .cloned()
            .collect();
        list.sort_by_key(|r| r.created_at);
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_mock_generation_fail_after() {
        let generation = MockGeneration::new(["a", "b", "c"]).fail_after(2);
        let stream = generation.generate(&[]).await.unwrap();
        let items: Vec<_> = stream.collect().await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert_eq!(items[1].as_ref().unwrap(), "b");
        assert!(items[2].is_err());
        assert_eq!(generation.pulled(), 2);
    }

    #[tokio::test]
    async fn test_mock_llm_cycles() {
        let llm = MockLlm::new(vec!["one".into(), "two".into()]);
        assert_eq!(llm.complete("").await.unwrap().content, "one");
        assert_eq!(llm.complete("").await.unwrap().content, "two");
        assert_eq!(llm.complete("").await.unwrap().content, "one");
        assert_eq!(llm.call_count(), 3);
    }
}
