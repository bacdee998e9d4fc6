//! Frames carried by the answer stream.
//!
//! A request's output is an ordered sequence of [`StreamFrame`]s: generated
//! prose (`Content`) interleaved with out-of-band progress and structured
//! events. The client never receives the sequence as a whole; it rebuilds it
//! frame by frame with the [`crate::StreamDecoder`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use answer_engine_core::types::{Citation, SourceId};

// =============================================================================
// Status Pills
// =============================================================================

/// Logical progress of a request, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Planning,
    Searching,
    ReadingSources,
    BuildingContext,
    Synthesizing,
    Complete,
}

impl StreamStatus {
    /// Whether no further frames may follow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// A user-facing progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPill {
    /// Progress step.
    pub status: StreamStatus,
    /// Display message.
    pub message: String,
    /// When the step was reached.
    pub timestamp: DateTime<Utc>,
    /// Step-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl StatusPill {
    /// Create a pill stamped with the current time.
    pub fn new(status: StreamStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Terminal pill.
    pub fn complete() -> Self {
        Self::new(StreamStatus::Complete, "Complete")
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// =============================================================================
// Structured Payloads
// =============================================================================

/// Per-source outcome shown next to the search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: SourceId,
    pub succeeded: bool,
    pub citation_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Research results for the client's source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultsPayload {
    /// Query as the user asked it.
    pub query: String,
    /// Deduplicated citations.
    pub citations: Vec<Citation>,
    /// One entry per planned source.
    pub sources: Vec<SourceSummary>,
}

/// A compact fact card shown while the answer streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextCard {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Terminal failure of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

// =============================================================================
// Frames
// =============================================================================

/// One item of the outbound sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// Generated prose.
    Content(String),
    /// Progress event.
    Status(StatusPill),
    /// Research results (latest wins on the client).
    SearchResults(SearchResultsPayload),
    /// Fact cards (appended on the client).
    ContextCards(Vec<ContextCard>),
    /// Generation failed; nothing follows.
    Error(ErrorPayload),
}

impl StreamFrame {
    /// Content frame.
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }

    /// Status frame.
    pub fn status(status: StreamStatus, message: impl Into<String>) -> Self {
        Self::Status(StatusPill::new(status, message))
    }

    /// Error frame.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            code: code.into(),
            message: message.into(),
        })
    }

    /// Whether this frame ends the stream.
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Status(pill) => pill.status.is_terminal(),
            Self::Error(_) => true,
            _ => false,
        }
    }
}
