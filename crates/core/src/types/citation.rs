use serde::{Deserialize, Serialize};

/// Kind of source a citation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Web,
    Academic,
    News,
}

/// A single finding a source can point the reader at.
///
/// The identity key is `url`: two citations with the same url are the same
/// citation, whatever their snippets say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Canonical link.
    pub url: String,
    /// Human-readable title.
    pub title: String,
    /// Short excerpt.
    pub snippet: String,
    /// Source type.
    pub source_type: SourceType,
    /// Publication date as reported by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

impl Citation {
    /// Create a new citation.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
            source_type,
            published_date: None,
        }
    }

    /// Set the publication date.
    pub fn with_published_date(mut self, date: impl Into<String>) -> Self {
        self.published_date = Some(date.into());
        self
    }
}
