#![deny(unused)]
//! L1 Controller for the answer engine.
//!
//! This crate turns an intent into research: the source plan builder, the
//! concurrent source orchestrator, and the synthesizer that merges adapter
//! results into the generation context.

pub mod orchestrator;
pub mod planning;
pub mod synthesis;

pub use orchestrator::{SourceOrchestrator, SourceResultStream};
pub use planning::PlanBuilder;
pub use synthesis::{generation_messages, Synthesizer};
