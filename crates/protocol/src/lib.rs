//! Answer stream protocol.
//!
//! One HTTP response body carries the generated answer as plain UTF-8 text
//! with out-of-band control frames (status pills, search results, context
//! cards, errors) spliced in. See [`wire`] for the byte format.

#![deny(unused)]

pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod state;
pub mod wire;

pub use decoder::{DecoderState, StreamDecoder};
pub use encoder::{encode_all, StreamEncoder};
pub use frame::{
    ContextCard, ErrorPayload, SearchResultsPayload, SourceSummary, StatusPill, StreamFrame,
    StreamStatus,
};
pub use state::{ClientStreamState, StreamReader};
pub use wire::{FrameKind, DEFAULT_MAX_FRAME_BYTES, PROTOCOL_VERSION};
