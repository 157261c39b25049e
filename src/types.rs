//! Shared types for the BBFS analytics service.
//!
//! These types form the data model used across all modules: draw records
//! produced by the fetcher, the candidate sets produced by the generator,
//! and the statistics produced by the backtest engine.

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// Day of the week a draw took place on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Parse a day name as it appears on the results site.
    ///
    /// Accepts Indonesian and English names, case-insensitively. Anything
    /// unrecognised falls back to Monday, which is what the site's own
    /// tables default to.
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "senin" | "monday" => Weekday::Monday,
            "selasa" | "tuesday" => Weekday::Tuesday,
            "rabu" | "wednesday" => Weekday::Wednesday,
            "kamis" | "thursday" => Weekday::Thursday,
            "jumat" | "friday" => Weekday::Friday,
            "sabtu" | "saturday" => Weekday::Saturday,
            "minggu" | "sunday" => Weekday::Sunday,
            _ => Weekday::Monday,
        }
    }

    /// Weekday of a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    /// Today's weekday in the host's local timezone.
    pub fn today() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// Indonesian name used by the results site.
    pub fn local_name(&self) -> &'static str {
        match self {
            Weekday::Monday => "senin",
            Weekday::Tuesday => "selasa",
            Weekday::Wednesday => "rabu",
            Weekday::Thursday => "kamis",
            Weekday::Friday => "jumat",
            Weekday::Saturday => "sabtu",
            Weekday::Sunday => "minggu",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Suffix
// ---------------------------------------------------------------------------

/// The last two digits of a draw result, the unit of prediction.
///
/// Always holds exactly two ASCII digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Suffix([char; 2]);

impl Suffix {
    /// Parse a two-character digit string. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let first = chars.next()?;
        let second = chars.next()?;
        if chars.next().is_some() || !first.is_ascii_digit() || !second.is_ascii_digit() {
            return None;
        }
        Some(Suffix([first, second]))
    }

    pub fn chars(&self) -> [char; 2] {
        self.0
    }

    /// Numeric values of both digits.
    pub fn values(&self) -> [u32; 2] {
        [digit_value(self.0[0]), digit_value(self.0[1])]
    }

    pub fn contains(&self, digit: char) -> bool {
        self.0.contains(&digit)
    }
}

impl fmt::Display for Suffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0], self.0[1])
    }
}

/// Numeric value of an ASCII digit character (0 for anything else).
pub fn digit_value(c: char) -> u32 {
    c.to_digit(10).unwrap_or(0)
}

/// ASCII digit character for `value mod 10`.
pub fn digit_char(value: u32) -> char {
    char::from_digit(value % 10, 10).unwrap_or('0')
}

// ---------------------------------------------------------------------------
// Draw record
// ---------------------------------------------------------------------------

/// A single historical draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawRecord {
    pub date: NaiveDate,
    pub weekday: Weekday,
    /// Full 4-digit result as published.
    pub result: String,
    /// Last two characters of `result`.
    pub suffix: String,
}

impl DrawRecord {
    pub fn new(date: NaiveDate, weekday: Weekday, result: impl Into<String>) -> Self {
        let result = result.into();
        let skip = result.chars().count().saturating_sub(2);
        let suffix: String = result.chars().skip(skip).collect();
        Self { date, weekday, result, suffix }
    }

    /// The parsed suffix, or `None` when the record is malformed.
    pub fn parsed_suffix(&self) -> Option<Suffix> {
        Suffix::parse(&self.suffix)
    }

    /// Helper to build a record for tests, weekday derived from the date.
    #[cfg(test)]
    pub fn sample(date: &str, result: &str) -> Self {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Self::new(date, Weekday::from_date(date), result)
    }
}

impl fmt::Display for DrawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {} [{}]", self.date, self.weekday, self.result, self.suffix)
    }
}

// ---------------------------------------------------------------------------
// Candidate set
// ---------------------------------------------------------------------------

/// Number of digits in every candidate set.
pub const CANDIDATE_SET_SIZE: usize = 5;

/// A BBFS guess: exactly five unique digit characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    digits: Vec<char>,
}

impl CandidateSet {
    /// Wrap generator output. Callers guarantee five unique digits.
    pub(crate) fn from_digits(digits: Vec<char>) -> Self {
        debug_assert_eq!(digits.len(), CANDIDATE_SET_SIZE);
        Self { digits }
    }

    /// Digits in generator order.
    pub fn digits(&self) -> &[char] {
        &self.digits
    }

    pub fn contains(&self, digit: char) -> bool {
        self.digits.contains(&digit)
    }

    /// Win test: both digits of `suffix` are in the set.
    pub fn covers(&self, suffix: &Suffix) -> bool {
        suffix.chars().iter().all(|d| self.contains(*d))
    }

    /// Digits of `suffix` present in the set (deduplicated, in suffix order).
    pub fn covered_digits(&self, suffix: &Suffix) -> Vec<char> {
        let mut out: Vec<char> = Vec::new();
        for d in suffix.chars() {
            if self.contains(d) && !out.contains(&d) {
                out.push(d);
            }
        }
        out
    }

    /// Digits of `suffix` missing from the set (deduplicated, in suffix order).
    pub fn missing_digits(&self, suffix: &Suffix) -> Vec<char> {
        let mut out: Vec<char> = Vec::new();
        for d in suffix.chars() {
            if !self.contains(d) && !out.contains(&d) {
                out.push(d);
            }
        }
        out
    }

    /// Digits in ascending order as a string, e.g. `"01259"`.
    pub fn sorted_string(&self) -> String {
        let mut digits = self.digits.clone();
        digits.sort_unstable();
        digits.into_iter().collect()
    }
}

impl fmt::Display for CandidateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: String = self.digits.iter().collect();
        write!(f, "{s}")
    }
}

impl Serialize for CandidateSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Backtest output
// ---------------------------------------------------------------------------

/// One win or loss observed during a replay or a streak scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakEvent {
    /// Date of the input draw.
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub input_result: String,
    pub actual_result: String,
    pub input_suffix: String,
    pub actual_suffix: String,
    /// Candidate digits, ascending.
    pub candidates: String,
    /// Position inside the loss streak (1-based). `None` for wins.
    pub loss_number: Option<u32>,
}

/// A single replay step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayStep {
    pub date: NaiveDate,
    pub input_suffix: String,
    pub next_suffix: String,
    pub candidates: CandidateSet,
    pub is_win: bool,
    /// Consecutive-loss counter after this step.
    pub consecutive_losses: u32,
}

/// Aggregate result of a full historical replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakStatistics {
    pub total_tests: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    /// Percent, rounded to one decimal.
    pub win_rate: f64,
    /// Percent, rounded to one decimal.
    pub loss_rate: f64,
    pub max_consecutive_loss: u32,
    /// Completed streak lengths in chronological order, including a streak
    /// still open at the end of history.
    pub loss_streaks: Vec<u32>,
    /// Whether `max_consecutive_loss` is within the configured target.
    pub meets_target: bool,
    /// Trailing win events (bounded).
    pub win_details: Vec<StreakEvent>,
    /// Trailing loss events (bounded).
    pub loss_details: Vec<StreakEvent>,
    /// Trailing replay steps (bounded).
    pub results: Vec<ReplayStep>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_records: usize,
    pub computed_at: DateTime<Utc>,
}

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total_tests: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub max_consecutive_loss: u32,
    pub meets_target: bool,
}

impl From<&StreakStatistics> for PerformanceSummary {
    fn from(stats: &StreakStatistics) -> Self {
        Self {
            total_tests: stats.total_tests,
            wins: stats.total_wins,
            losses: stats.total_losses,
            win_rate: stats.win_rate,
            max_consecutive_loss: stats.max_consecutive_loss,
            meets_target: stats.meets_target,
        }
    }
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Max {} loss | Win {:.1}% | {} tests ({} W / {} L)",
            self.max_consecutive_loss, self.win_rate, self.total_tests, self.wins, self.losses,
        )
    }
}

/// Result of the backward tail scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentStreak {
    pub losses: u32,
    /// Oldest loss of the streak first.
    pub details: Vec<StreakEvent>,
}

/// How worrying a streak length is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakSeverity {
    Normal,
    Caution,
    Critical,
}

impl StreakSeverity {
    pub fn for_length(length: u32) -> Self {
        match length {
            0..=3 => StreakSeverity::Normal,
            4..=6 => StreakSeverity::Caution,
            _ => StreakSeverity::Critical,
        }
    }
}

/// One row of the historical streak-length breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreakBucket {
    pub length: u32,
    pub count: u32,
    /// Share of all completed streaks, percent.
    pub percentage: f64,
    pub severity: StreakSeverity,
}

/// An annotated recent draw pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowEntry {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub input_result: String,
    pub input_suffix: String,
    pub actual_result: String,
    pub actual_suffix: String,
    pub candidates: CandidateSet,
    pub is_win: bool,
    pub covered_digits: Vec<char>,
    pub missing_digits: Vec<char>,
}

/// Dataset overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataInfo {
    pub total_records: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Candidate set for the draw following the newest record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub based_on: DrawRecord,
    pub weekday: Weekday,
    pub candidates: CandidateSet,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures surfaced to callers of the service.
#[derive(Debug, thiserror::Error)]
pub enum BbfsError {
    #[error("Data unavailable: {0}")]
    FetchFailure(String),

    #[error("Insufficient data: {available} usable records, need at least 2")]
    InsufficientData { available: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
