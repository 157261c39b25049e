//! Draw-history sources.
//!
//! Defines the `DrawSource` trait and provides the HTTP implementation
//! that scrapes the results page, plus the HTML table parser it uses.

pub mod http;
pub mod parser;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::DrawRecord;

/// Abstraction over wherever draw results come from.
///
/// Implementors return the full history, sorted ascending by date with at
/// most one record per date.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DrawSource: Send + Sync {
    /// Fetch every available draw record.
    async fn fetch_records(&self) -> Result<Vec<DrawRecord>>;

    /// Source name for logging.
    fn name(&self) -> &'static str;
}
