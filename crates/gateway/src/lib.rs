#![deny(unused)]
//! L0 Gateway for the answer engine.
//!
//! This crate provides the HTTP entry point, intent classification, the
//! reasoning-mode resolver and the answer pipeline that drives one request
//! from query to encoded frame stream.

pub mod pipeline;
pub mod reasoning;
pub mod router;
pub mod server;

pub use pipeline::{AnswerPipeline, GENERATION_FAILED};
pub use reasoning::{effective_intent, resolve};
pub use router::{HeuristicClassifier, LlmIntentClassifier};
pub use server::{AppState, GatewayServer, PROTOCOL_HEADER};
