#![deny(unused)]
//! L-M Model Gateway for the answer engine.
//!
//! This crate provides:
//! - A Rig-backed fast completion client (classification, query refinement)
//! - A streaming generation source for OpenAI-compatible endpoints

pub mod rig_client;
pub mod streaming;

pub use rig_client::{create_fast_client, RigConfig, RigLlmClient, RigProvider};
pub use streaming::{OpenAiStreamingSource, SseEvent, SseParser};

use std::sync::Arc;

use answer_engine_core::{config::GenerationConfig, traits::GenerationSource};

/// The generation source for `config`.
pub fn create_generation_source(config: &GenerationConfig) -> Arc<dyn GenerationSource> {
    tracing::info!(model = %config.model, base_url = %config.base_url, "Generation source configured");
    Arc::new(OpenAiStreamingSource::new(config))
}
