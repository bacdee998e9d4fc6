#![deny(unused)]
//! Core types, traits, and error definitions for the answer engine.
//!
//! This crate provides the foundational building blocks shared across all layers
//! of the answer pipeline.

pub mod config;
pub mod error;
pub mod mocks;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::*;
pub use types::*;
