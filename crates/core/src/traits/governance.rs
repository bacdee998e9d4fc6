//! L4 Governance traits.

use async_trait::async_trait;
use crate::error::Result;

/// Billing collaborator, debited once per request that reached generation.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Record the overall outcome of a request.
    async fn record(&self, request_id: &str, user_id: Option<&str>, succeeded: bool) -> Result<()>;
}
