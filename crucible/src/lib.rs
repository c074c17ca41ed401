//! Crucible property-based testing library.
//!
//! This is the main entry point for the Crucible library. It re-exports the
//! engine from `crucible-core` and, with the `derive` feature, the
//! `#[derive(Arbitrary)]` macro.

pub use crucible_core::*;

// Re-export derive macros when available
#[cfg(feature = "derive")]
pub use crucible_derive::*;
