//! L3 Store traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::types::Citation;

/// Final state of one answered request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// Request trace ID.
    pub request_id: String,
    /// Conversation the answer belongs to.
    pub conversation_id: Option<String>,
    /// Requesting user.
    pub user_id: Option<String>,
    /// The question.
    pub query: String,
    /// Full concatenated answer text.
    pub content: String,
    /// Final citation list.
    pub citations: Vec<Citation>,
    /// Whether generation ran to completion.
    pub completed: bool,
    /// Unix timestamp (seconds).
    pub created_at: i64,
}

/// Persistence collaborator for finished answers.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    /// Persist a final answer.
    async fn save(&self, record: AnswerRecord) -> Result<()>;

    /// Load an answer by request ID.
    async fn get(&self, request_id: &str) -> Result<Option<AnswerRecord>>;

    /// All answers of a conversation, oldest first.
    async fn list_conversation(&self, conversation_id: &str) -> Result<Vec<AnswerRecord>>;
}
