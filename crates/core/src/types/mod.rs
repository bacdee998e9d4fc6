//! Core type definitions for the answer engine.
//!
//! This module contains the value types shared by every layer of the
//! answer pipeline: intent decisions, source plans, adapter results,
//! citations and the synthesized generation context.

pub mod citation;
pub mod context;
pub mod intent;
pub mod request;
pub mod source;

pub use citation::*;
pub use context::*;
pub use intent::*;
pub use request::*;
pub use source::*;
