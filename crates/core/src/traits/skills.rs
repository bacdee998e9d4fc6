//! L2 Skills traits.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::types::{Citation, SourceId, SourcePayload, SourceResult};

/// Reasons an adapter invocation can fail.
///
/// Never crosses the adapter boundary as an error: [`SourceAdapter::run`]
/// turns it into `SourceResult::error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("adapter not configured: {0}")]
    NotConfigured(String),
}

impl AdapterError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::Http { .. } => "http",
            Self::Transport(_) => "transport",
            Self::MalformedPayload(_) => "malformed",
            Self::NotConfigured(_) => "not_configured",
        }
    }
}

/// Normalized findings of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterOutput {
    /// Tagged payload.
    pub payload: SourcePayload,
    /// Citations in provider ranking order.
    pub citations: Vec<Citation>,
}

/// One external research provider.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Identifier of this adapter.
    fn id(&self) -> SourceId;

    /// Hard deadline for one invocation.
    fn timeout(&self) -> Duration;

    /// Query the provider and normalize its response.
    async fn invoke(
        &self,
        query: &str,
        max_results: usize,
    ) -> std::result::Result<AdapterOutput, AdapterError>;

    /// Invoke under the adapter's timeout. Never fails.
    async fn run(&self, query: &str, max_results: usize) -> SourceResult {
        let started = Instant::now();
        let deadline = self.timeout();

        let outcome = match tokio::time::timeout(deadline, self.invoke(query, max_results)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(AdapterError::Timeout(deadline.as_millis() as u64)),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => SourceResult::success(self.id(), output.payload, output.citations),
            Err(e) => SourceResult::failure(self.id(), e.to_string()),
        }
        .with_elapsed_ms(elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sleepy(Duration);

    #[async_trait]
    impl SourceAdapter for Sleepy {
        fn id(&self) -> SourceId {
            SourceId::News
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn invoke(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> std::result::Result<AdapterOutput, AdapterError> {
            tokio::time::sleep(self.0).await;
            Ok(AdapterOutput {
                payload: SourcePayload::News { articles: vec![] },
                citations: vec![],
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_enforces_timeout() {
        let result = Sleepy(Duration::from_secs(30)).run("q", 3).await;
        assert_eq!(result.source, SourceId::News);
        assert!(result.data.is_none());
        assert_eq!(result.error.as_deref(), Some("timed out after 50 ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_within_deadline() {
        let result = Sleepy(Duration::from_millis(10)).run("q", 3).await;
        assert!(result.is_success());
        assert!(matches!(result.data, Some(SourcePayload::News { .. })));
    }
}
