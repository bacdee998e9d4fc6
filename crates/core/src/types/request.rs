use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intent::ReasoningMode;

// =============================================================================
// Request Types
// =============================================================================

/// An incoming question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRequest {
    /// Unique trace ID for this request.
    pub trace_id: String,
    /// The user's question.
    pub query: String,
    /// Research override.
    #[serde(default)]
    pub mode: ReasoningMode,
    /// Requesting user.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Conversation the answer belongs to.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl AnswerRequest {
    /// Create a request with a fresh trace ID.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            query: query.into(),
            mode: ReasoningMode::Auto,
            user_id: None,
            conversation_id: None,
        }
    }

    /// Set the reasoning mode.
    pub fn with_mode(mut self, mode: ReasoningMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the conversation ID.
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}
