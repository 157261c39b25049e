//! In-memory `DrawSource` for driving the service without a network.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};

use bbfs::source::DrawSource;
use bbfs::types::{DrawRecord, Weekday};

pub struct MemorySource {
    records: Vec<DrawRecord>,
    /// Number of leading calls that fail before records are served.
    failures: usize,
    calls: AtomicUsize,
}

impl MemorySource {
    pub fn new(records: Vec<DrawRecord>) -> Self {
        Self {
            records,
            failures: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }
}

#[async_trait]
impl DrawSource for MemorySource {
    async fn fetch_records(&self) -> Result<Vec<DrawRecord>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            bail!("simulated outage on call {}", call + 1);
        }
        Ok(self.records.clone())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Build a record from an ISO date and a 4-digit result.
pub fn record(date: &str, result: &str) -> DrawRecord {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    DrawRecord::new(date, Weekday::from_date(date), result)
}

/// One draw per day starting at `start`, with the given suffixes.
pub fn daily_history(start: &str, suffixes: &[&str]) -> Vec<DrawRecord> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap();
    suffixes
        .iter()
        .enumerate()
        .map(|(i, suffix)| {
            let date = start + chrono::Duration::days(i as i64);
            let result = format!("{}{}{}", i % 10, (i / 10) % 10, suffix);
            DrawRecord::new(date, Weekday::from_date(date), result)
        })
        .collect()
}
