//! Research provider adapters.
//!
//! Each adapter turns one provider's response into a [`SourcePayload`] plus
//! ranked citations. Entries whose url does not validate are dropped.
//!
//! [`SourcePayload`]: answer_engine_core::types::SourcePayload

pub mod academic;
pub mod news;
pub mod synthesis;
pub mod web;

pub use academic::SemanticScholarAdapter;
pub use news::NewsApiAdapter;
pub use synthesis::SynthesisAdapter;
pub use web::ExaWebAdapter;

/// Longest snippet attached to a citation.
pub const SNIPPET_CHARS: usize = 280;
