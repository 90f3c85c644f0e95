//! Utility modules shared across the crate.
//!
//! - logging: tracing subscriber setup
//! - tests: builders for test fixtures

pub mod logging;
pub mod tests;
