//! Granite test and validation infrastructure.
//!
//! Cross-crate integration tests for the compression subsystem: the
//! end-to-end database path through a custom codec, the plugin loader
//! against an in-process environment, and property-based round trips
//! over every built-in codec.

pub mod engine_e2e;
pub mod loader_integration;
pub mod proptest_codecs;
