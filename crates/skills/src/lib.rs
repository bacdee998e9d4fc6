#![deny(unused)]
//! L2 research sources for the answer engine.
//!
//! This crate provides:
//! - Provider adapters (web, academic, news, synthesis)
//! - The adapter registry built from configuration
//! - Shared HTTP helpers that map provider failures to `AdapterError`

pub mod adapters;
pub mod network;
pub mod registry;

pub use adapters::{ExaWebAdapter, NewsApiAdapter, SemanticScholarAdapter, SynthesisAdapter};
pub use network::ProviderEndpoint;
pub use registry::AdapterRegistry;
