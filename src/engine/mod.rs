//! Service layer: owns the draw history and everything derived from it.

pub mod service;

pub use service::{BbfsService, RefreshReport};
