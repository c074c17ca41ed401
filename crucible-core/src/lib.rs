//! Core functionality for Crucible property-based testing.
//!
//! This crate provides the building blocks for property-based testing with
//! Crucible: byte streams that drive generation, strategies that decode them,
//! the engine that runs and shrinks trials, and the targeted search fed by
//! `target` observations.

pub mod data;
pub mod engine;
pub mod error;
pub mod property;
pub mod shrink;
pub mod strategy;
pub mod stream;
pub mod targeted;
pub mod trial;
pub mod unwind;
pub mod value;

// Re-export the main types
pub use data::*;
pub use engine::*;
pub use error::*;
pub use property::*;
pub use shrink::*;
pub use strategy::*;
pub use stream::*;
pub use targeted::*;
pub use trial::*;
pub use value::*;
