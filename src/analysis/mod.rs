//! Draw-history analysis.
//!
//! - `patterns` builds transition tables from the record sequence
//! - `generator` derives the five-digit candidate set
//! - `backtest` replays history and scans the recent tail

pub mod backtest;
pub mod generator;
pub mod patterns;

pub use backtest::{Backtester, Predictor};
pub use generator::CandidateGenerator;
pub use patterns::{DigitCounter, TransitionTable};
