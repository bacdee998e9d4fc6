//! Core traits for the answer engine.
//!
//! Traits are organized by architectural layer:
//! - `gateway`: L0 traits (IntentClassifier)
//! - `skills`: L2 traits (SourceAdapter)
//! - `store`: L3 traits (AnswerStore)
//! - `governance`: L4 traits (UsageLedger)
//! - `llm`: L-M Model Gateway traits (LlmClient, GenerationSource)

pub mod gateway;
pub mod governance;
pub mod llm;
pub mod skills;
pub mod store;

pub use gateway::*;
pub use governance::*;
pub use llm::*;
pub use skills::*;
pub use store::*;
