//! BBFS: draw-history streak analytics.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod analysis;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod source;
pub mod types;
