#![deny(unused)]
//! L3 Answer Store for the answer engine.
//!
//! Persistence collaborator for finished answers: final content and final
//! citations, never intermediate frames.

pub mod memory;

pub use memory::InMemoryAnswerStore;
