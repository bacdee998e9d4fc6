//! Client-side stream state.
//!
//! Folds decoded frames into what a UI renders: the answer text so far, the
//! progress pills, the latest search results and the accumulated cards.

use crate::decoder::StreamDecoder;
use crate::frame::{ContextCard, ErrorPayload, SearchResultsPayload, StatusPill, StreamFrame};

/// Accumulated view of one answer stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientStreamState {
    pub content: String,
    pub status_pills: Vec<StatusPill>,
    pub search_results: Option<SearchResultsPayload>,
    pub context_cards: Vec<ContextCard>,
    pub error: Option<ErrorPayload>,
}

impl ClientStreamState {
    /// Fold one frame into the state.
    pub fn apply(&mut self, frame: StreamFrame) {
        match frame {
            StreamFrame::Content(text) => self.content.push_str(&text),
            StreamFrame::Status(pill) => self.status_pills.push(pill),
            StreamFrame::SearchResults(results) => self.search_results = Some(results),
            StreamFrame::ContextCards(cards) => self.context_cards.extend(cards),
            StreamFrame::Error(error) => self.error = Some(error),
        }
    }

    /// Whether the stream reached `complete`.
    pub fn is_complete(&self) -> bool {
        self.status_pills
            .last()
            .map(|p| p.status.is_terminal())
            .unwrap_or(false)
    }

    /// Most recent pill.
    pub fn current_status(&self) -> Option<&StatusPill> {
        self.status_pills.last()
    }
}

/// Decoder plus state, for consumers that only want the rendered result.
#[derive(Debug, Default)]
pub struct StreamReader {
    decoder: StreamDecoder,
    state: ClientStreamState,
}

impl StreamReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_decoder(decoder: StreamDecoder) -> Self {
        Self {
            decoder,
            state: ClientStreamState::default(),
        }
    }

    /// Feed one chunk; returns the frames it produced after applying them.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        let frames = self.decoder.feed(chunk);
        for frame in &frames {
            self.state.apply(frame.clone());
        }
        frames
    }

    /// End of stream.
    pub fn finish(&mut self) -> Vec<StreamFrame> {
        let frames = self.decoder.finish();
        for frame in &frames {
            self.state.apply(frame.clone());
        }
        frames
    }

    pub fn state(&self) -> &ClientStreamState {
        &self.state
    }

    pub fn decoder(&self) -> &StreamDecoder {
        &self.decoder
    }

    pub fn into_state(self) -> ClientStreamState {
        self.state
    }
}
