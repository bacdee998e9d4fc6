#![deny(unused)]
//! L4 Governance for the answer engine.
//!
//! This crate provides:
//! - Logging and distributed tracing setup
//! - Prometheus metrics helpers
//! - The in-memory usage ledger (billing collaborator)

pub mod ledger;
pub mod metrics;
pub mod tracing_layer;

pub use ledger::{InMemoryUsageLedger, UsageEntry};
pub use metrics::{
    setup_metrics_recorder, track_adapter_call, track_answer, track_classification, track_request,
};
pub use tracing_layer::configure_tracing;
