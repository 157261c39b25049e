//! Results-table parser.
//!
//! The results page lists each draw as a table cell of the form
//! `<td title="{day}={YYYY-MM-DD}={extra}">{4-digit-result}</td>`.
//! Cells that do not match, carry an unparsable date, or fall outside the
//! configured year window are dropped silently.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tracing::debug;

use crate::types::{DrawRecord, Weekday};

const CELL_PATTERN: &str = r#"<td title="([^"]*=\d{4}-\d{2}-\d{2}=[^"]*)">(\d{4})</td>"#;

/// Extracts draw records from the results page HTML.
pub struct DrawTableParser {
    cell: Regex,
    min_year: i32,
    max_year: i32,
}

impl DrawTableParser {
    /// Build a parser that keeps draws whose year lies in `[min_year, max_year]`.
    pub fn new(min_year: i32, max_year: i32) -> Result<Self> {
        let cell = Regex::new(CELL_PATTERN).context("Failed to compile results cell pattern")?;
        Ok(Self { cell, min_year, max_year })
    }

    /// Parse every matching cell, sorted ascending by date.
    ///
    /// When the page lists the same date twice the first occurrence wins.
    pub fn parse(&self, html: &str) -> Vec<DrawRecord> {
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for caps in self.cell.captures_iter(html) {
            let title = &caps[1];
            let result = &caps[2];

            let mut parts = title.split('=');
            let (Some(day), Some(date_str)) = (parts.next(), parts.next()) else {
                skipped += 1;
                continue;
            };

            let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
                skipped += 1;
                continue;
            };

            if date.year() < self.min_year || date.year() > self.max_year {
                skipped += 1;
                continue;
            }

            records.push(DrawRecord::new(date, Weekday::parse_lenient(day), result));
        }

        records.sort_by_key(|r| r.date);
        let before_dedup = records.len();
        records.dedup_by_key(|r| r.date);

        debug!(
            kept = records.len(),
            skipped,
            duplicates = before_dedup - records.len(),
            "Parsed results table"
        );

        records
    }
}
