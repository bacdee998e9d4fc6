//! In-memory answer store implementation using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;

use answer_engine_core::{
    traits::{AnswerRecord, AnswerStore},
    Error, Result,
};

/// In-memory answer store.
///
/// Records are write-once: a second save for the same request ID is
/// rejected. Conversations keep their answers in save order.
#[derive(Debug, Default)]
pub struct InMemoryAnswerStore {
    records: DashMap<String, AnswerRecord>,
    conversations: DashMap<String, Vec<String>>,
}

impl InMemoryAnswerStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored answers.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Clear all answers.
    pub fn clear(&self) {
        self.records.clear();
        self.conversations.clear();
    }
}

#[async_trait]
impl AnswerStore for InMemoryAnswerStore {
    async fn save(&self, record: AnswerRecord) -> Result<()> {
        let request_id = record.request_id.clone();
        let conversation_id = record.conversation_id.clone();

        match self.records.entry(request_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(Error::storage(format!("answer {} already stored", request_id)));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        if let Some(conversation_id) = conversation_id {
            self.conversations
                .entry(conversation_id)
                .or_default()
                .push(request_id.clone());
        }

        tracing::debug!(request_id = %request_id, "Answer stored");
        Ok(())
    }

    async fn get(&self, request_id: &str) -> Result<Option<AnswerRecord>> {
        Ok(self.records.get(request_id).map(|r| r.clone()))
    }

    async fn list_conversation(&self, conversation_id: &str) -> Result<Vec<AnswerRecord>> {
        let Some(ids) = self.conversations.get(conversation_id).map(|ids| ids.clone()) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| r.clone()))
            .collect())
    }
}
