//! L0 Gateway traits.

use async_trait::async_trait;
use crate::types::IntentDecision;

/// Decides whether a query needs research, and how much.
///
/// Classification never fails: implementations degrade to a conservative
/// decision instead of returning an error.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify a query.
    async fn classify(&self, query: &str) -> IntentDecision;
}
