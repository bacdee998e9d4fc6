//! In-memory usage ledger.

use async_trait::async_trait;
use dashmap::DashMap;

use answer_engine_core::{traits::UsageLedger, Error, Result};

/// One recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEntry {
    pub request_id: String,
    pub user_id: Option<String>,
    pub succeeded: bool,
    /// Credits taken for this request.
    pub debited: i64,
}

/// Ledger keeping per-request entries and optional per-user credit balances.
///
/// Users without a balance are unmetered. Only successful requests are
/// debited.
pub struct InMemoryUsageLedger {
    entries: DashMap<String, UsageEntry>,
    balances: DashMap<String, i64>,
    cost_per_request: i64,
}

impl InMemoryUsageLedger {
    /// Create a ledger charging `cost_per_request` per successful request.
    pub fn new(cost_per_request: i64) -> Self {
        Self {
            entries: DashMap::new(),
            balances: DashMap::new(),
            cost_per_request,
        }
    }

    /// Set a user's credit balance.
    pub fn with_balance(self, user_id: impl Into<String>, credits: i64) -> Self {
        self.balances.insert(user_id.into(), credits);
        self
    }

    /// Current balance of a metered user.
    pub fn balance(&self, user_id: &str) -> Option<i64> {
        self.balances.get(user_id).map(|b| *b)
    }

    /// Entry for a request.
    pub fn entry(&self, request_id: &str) -> Option<UsageEntry> {
        self.entries.get(request_id).map(|e| e.clone())
    }

    /// Number of recorded requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn debit(&self, user_id: Option<&str>) -> Result<i64> {
        let Some(user_id) = user_id else {
            return Ok(0);
        };
        let Some(mut balance) = self.balances.get_mut(user_id) else {
            return Ok(0);
        };
        if *balance < self.cost_per_request {
            return Err(Error::InsufficientCredits {
                balance: *balance,
                required: self.cost_per_request,
            });
        }
        *balance -= self.cost_per_request;
        Ok(self.cost_per_request)
    }
}

impl Default for InMemoryUsageLedger {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn record(&self, request_id: &str, user_id: Option<&str>, succeeded: bool) -> Result<()> {
        if self.entries.contains_key(request_id) {
            return Err(Error::governance(format!(
                "usage for request {} already recorded",
                request_id
            )));
        }

        let outcome = if succeeded { self.debit(user_id) } else { Ok(0) };
        let debited = *outcome.as_ref().unwrap_or(&0);

        self.entries.insert(
            request_id.to_string(),
            UsageEntry {
                request_id: request_id.to_string(),
                user_id: user_id.map(str::to_string),
                succeeded,
                debited,
            },
        );
        tracing::debug!(request_id, user_id, succeeded, debited, "Usage recorded");

        outcome.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_debits_metered_user() {
        let ledger = InMemoryUsageLedger::new(2).with_balance("alice", 5);
        ledger.record("r1", Some("alice"), true).await.unwrap();
        assert_eq!(ledger.balance("alice"), Some(3));
        assert_eq!(ledger.entry("r1").unwrap().debited, 2);
    }

    #[tokio::test]
    async fn test_failure_is_free() {
        let ledger = InMemoryUsageLedger::new(1).with_balance("bob", 1);
        ledger.record("r1", Some("bob"), false).await.unwrap();
        assert_eq!(ledger.balance("bob"), Some(1));
        assert!(!ledger.entry("r1").unwrap().succeeded);
    }

    #[tokio::test]
    async fn test_unmetered_and_anonymous() {
        let ledger = InMemoryUsageLedger::default();
        ledger.record("r1", None, true).await.unwrap();
        ledger.record("r2", Some("carol"), true).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.balance("carol"), None);
    }

    #[tokio::test]
    async fn test_insufficient_credits() {
        let ledger = InMemoryUsageLedger::new(3).with_balance("dave", 2);
        let err = ledger.record("r1", Some("dave"), true).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientCredits { balance: 2, required: 3 }));
        assert_eq!(ledger.entry("r1").unwrap().debited, 0);
    }

    #[tokio::test]
    async fn test_recorded_once() {
        let ledger = InMemoryUsageLedger::default();
        ledger.record("r1", None, true).await.unwrap();
        assert!(ledger.record("r1", None, true).await.is_err());
    }
}
