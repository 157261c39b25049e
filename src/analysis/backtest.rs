//! Historical backtesting engine.
//!
//! Replays the draw history through the candidate generator and tracks
//! win/loss counts and consecutive-loss streaks. Also hosts the shorter
//! tail scans used for the live view: the current loss streak and the
//! annotated window of recent draws.

use chrono::Utc;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

use super::generator::CandidateGenerator;
use super::patterns::TransitionTable;
use crate::config::AnalysisConfig;
use crate::types::{
    BbfsError, CandidateSet, CurrentStreak, DrawRecord, ReplayStep, StreakBucket, StreakEvent,
    StreakSeverity, StreakStatistics, Suffix, Weekday, WindowEntry,
};

// ---------------------------------------------------------------------------
// Predictor seam
// ---------------------------------------------------------------------------

/// Anything that turns (suffix, weekday, loss context) into a candidate set.
pub trait Predictor {
    fn predict(&self, input: &Suffix, weekday: Weekday, loss_context: u32) -> CandidateSet;
}

impl Predictor for CandidateGenerator<'_> {
    fn predict(&self, input: &Suffix, weekday: Weekday, loss_context: u32) -> CandidateSet {
        self.generate(input, weekday, loss_context)
    }
}

/// An adjacent pair of records with both suffixes well-formed.
struct DrawPair<'r> {
    current: &'r DrawRecord,
    next: &'r DrawRecord,
    input: Suffix,
    actual: Suffix,
}

impl<'r> DrawPair<'r> {
    fn new(current: &'r DrawRecord, next: &'r DrawRecord) -> Option<Self> {
        let input = current.parsed_suffix()?;
        let actual = next.parsed_suffix()?;
        Some(Self { current, next, input, actual })
    }

    fn event(&self, candidates: &CandidateSet, loss_number: Option<u32>) -> StreakEvent {
        StreakEvent {
            date: self.current.date,
            weekday: self.current.weekday,
            input_result: self.current.result.clone(),
            actual_result: self.next.result.clone(),
            input_suffix: self.current.suffix.clone(),
            actual_suffix: self.next.suffix.clone(),
            candidates: candidates.sorted_string(),
            loss_number,
        }
    }
}

fn usable_records(records: &[DrawRecord]) -> usize {
    records.iter().filter(|r| r.parsed_suffix().is_some()).count()
}

fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, limit: usize) {
    buf.push_back(item);
    while buf.len() > limit {
        buf.pop_front();
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Backtester
// ---------------------------------------------------------------------------

pub struct Backtester {
    target_max_loss: u32,
    detail_limit: usize,
}

impl Backtester {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            target_max_loss: config.target_max_loss,
            detail_limit: config.detail_limit,
        }
    }

    /// Replay `records` (ascending by date) with the generator over `table`.
    pub fn run(
        &self,
        records: &[DrawRecord],
        table: &TransitionTable,
    ) -> Result<StreakStatistics, BbfsError> {
        self.run_with(records, &CandidateGenerator::new(table))
    }

    /// Replay `records` with an arbitrary predictor.
    pub fn run_with(
        &self,
        records: &[DrawRecord],
        predictor: &dyn Predictor,
    ) -> Result<StreakStatistics, BbfsError> {
        let available = usable_records(records);
        if available < 2 {
            return Err(BbfsError::InsufficientData { available });
        }

        let mut consecutive_losses = 0u32;
        let mut max_consecutive = 0u32;
        let mut total_tests = 0u32;
        let mut total_wins = 0u32;
        let mut loss_streaks = Vec::new();
        let mut win_details = VecDeque::new();
        let mut loss_details = VecDeque::new();
        let mut results = VecDeque::new();
        let mut skipped = 0usize;

        for window in records.windows(2) {
            let Some(pair) = DrawPair::new(&window[0], &window[1]) else {
                skipped += 1;
                continue;
            };

            let candidates = predictor.predict(&pair.input, pair.current.weekday, consecutive_losses);
            let is_win = candidates.covers(&pair.actual);
            total_tests += 1;

            if is_win {
                total_wins += 1;
                if consecutive_losses > 0 {
                    loss_streaks.push(consecutive_losses);
                }
                consecutive_losses = 0;
                push_bounded(&mut win_details, pair.event(&candidates, None), self.detail_limit);
            } else {
                consecutive_losses += 1;
                max_consecutive = max_consecutive.max(consecutive_losses);
                push_bounded(
                    &mut loss_details,
                    pair.event(&candidates, Some(consecutive_losses)),
                    self.detail_limit,
                );
            }

            push_bounded(
                &mut results,
                ReplayStep {
                    date: pair.current.date,
                    input_suffix: pair.current.suffix.clone(),
                    next_suffix: pair.next.suffix.clone(),
                    candidates,
                    is_win,
                    consecutive_losses,
                },
                self.detail_limit,
            );
        }

        // Close a streak still open at the end of history.
        if consecutive_losses > 0 {
            loss_streaks.push(consecutive_losses);
        }

        let win_rate = if total_tests > 0 {
            f64::from(total_wins) / f64::from(total_tests) * 100.0
        } else {
            0.0
        };
        let loss_rate = if total_tests > 0 { 100.0 - win_rate } else { 0.0 };

        if skipped > 0 {
            debug!(skipped, "Skipped malformed draw pairs during replay");
        }
        info!(
            tests = total_tests,
            wins = total_wins,
            win_rate = format!("{win_rate:.1}%"),
            max_consecutive_loss = max_consecutive,
            streaks = loss_streaks.len(),
            "Backtest replay complete"
        );

        Ok(StreakStatistics {
            total_tests,
            total_wins,
            total_losses: total_tests - total_wins,
            win_rate: round_one_decimal(win_rate),
            loss_rate: round_one_decimal(loss_rate),
            max_consecutive_loss: max_consecutive,
            loss_streaks,
            meets_target: max_consecutive <= self.target_max_loss,
            win_details: win_details.into(),
            loss_details: loss_details.into(),
            results: results.into(),
            first_date: records.first().map(|r| r.date),
            last_date: records.last().map(|r| r.date),
            total_records: records.len(),
            computed_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tail scans
// ---------------------------------------------------------------------------

/// Count the loss streak running at the end of history.
///
/// Walks the last `limit` records backward from the newest, testing each
/// pair with loss context 0, and stops at the first win. Details are
/// returned oldest first; `loss_number` counts back from the newest loss,
/// which is 1.
pub fn scan_current_streak(
    records: &[DrawRecord],
    table: &TransitionTable,
    limit: usize,
) -> Result<CurrentStreak, BbfsError> {
    scan_current_streak_with(records, &CandidateGenerator::new(table), limit)
}

pub fn scan_current_streak_with(
    records: &[DrawRecord],
    predictor: &dyn Predictor,
    limit: usize,
) -> Result<CurrentStreak, BbfsError> {
    let available = usable_records(records);
    if available < 2 {
        return Err(BbfsError::InsufficientData { available });
    }

    let start = records.len().saturating_sub(limit);
    let window = &records[start..];
    let mut details = Vec::new();

    for pair in window.windows(2).rev() {
        let Some(pair) = DrawPair::new(&pair[0], &pair[1]) else {
            continue;
        };
        let candidates = predictor.predict(&pair.input, pair.current.weekday, 0);
        if candidates.covers(&pair.actual) {
            break;
        }
        let loss_number = details.len() as u32 + 1;
        details.push(pair.event(&candidates, Some(loss_number)));
    }

    details.reverse();

    Ok(CurrentStreak {
        losses: details.len() as u32,
        details,
    })
}

/// Annotate the last `limit` draw pairs with their win/loss outcome,
/// newest first. Uses loss context 0 throughout.
pub fn analyse_recent(
    records: &[DrawRecord],
    table: &TransitionTable,
    limit: usize,
) -> Vec<WindowEntry> {
    analyse_recent_with(records, &CandidateGenerator::new(table), limit)
}

pub fn analyse_recent_with(
    records: &[DrawRecord],
    predictor: &dyn Predictor,
    limit: usize,
) -> Vec<WindowEntry> {
    let start = records.len().saturating_sub(limit.saturating_add(1));

    records[start..]
        .windows(2)
        .rev()
        .filter_map(|w| DrawPair::new(&w[0], &w[1]))
        .map(|pair| {
            let candidates = predictor.predict(&pair.input, pair.current.weekday, 0);
            WindowEntry {
                date: pair.current.date,
                weekday: pair.current.weekday,
                input_result: pair.current.result.clone(),
                input_suffix: pair.current.suffix.clone(),
                actual_result: pair.next.result.clone(),
                actual_suffix: pair.next.suffix.clone(),
                is_win: candidates.covers(&pair.actual),
                covered_digits: candidates.covered_digits(&pair.actual),
                missing_digits: candidates.missing_digits(&pair.actual),
                candidates,
            }
        })
        .collect()
}

/// Group completed streak lengths, shortest first.
pub fn loss_streak_breakdown(loss_streaks: &[u32]) -> Vec<StreakBucket> {
    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
    for length in loss_streaks {
        *counts.entry(*length).or_default() += 1;
    }

    let total = loss_streaks.len() as f64;
    counts
        .into_iter()
        .map(|(length, count)| StreakBucket {
            length,
            count,
            percentage: f64::from(count) / total * 100.0,
            severity: StreakSeverity::for_length(length),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
