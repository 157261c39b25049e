//! BBFS candidate generation.
//!
//! Merges several digit pools (input digits, weekday history, day-agnostic
//! history, global frequency, anti-streak escalation) and ranks them with a
//! fixed scoring formula down to exactly five digits.

use std::collections::BTreeSet;

use super::patterns::{DigitCounter, TransitionTable};
use crate::types::{digit_char, digit_value, CandidateSet, Suffix, Weekday, CANDIDATE_SET_SIZE};

// ---------------------------------------------------------------------------
// Scoring constants
// ---------------------------------------------------------------------------

/// Bonus for digits of the input suffix.
pub const INPUT_DIGIT_WEIGHT: f64 = 1000.0;
/// Bonus for digits seen in any weekday-specific following suffix.
pub const DAY_PATTERN_WEIGHT: f64 = 20.0;
/// Bonus for digits of the loss-shifted input suffix.
pub const LOSS_SHIFT_WEIGHT: f64 = 50.0;
/// Per-unit digit value, only ever breaks ties.
pub const TIE_BREAK_WEIGHT: f64 = 0.1;

/// Distinct digits taken from the weekday-specific history.
const DAY_PATTERN_TOP: usize = 6;
/// Distinct digits taken from the day-agnostic history.
const INPUT_PATTERN_TOP: usize = 4;
/// Size of the global frequency pool, and how many of it are used.
const GLOBAL_POOL: usize = 8;
const GLOBAL_TAKE: usize = 5;
/// Loss streak length above which escalation digits are added.
const ESCALATION_THRESHOLD: u32 = 3;

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Deterministic candidate generator over a fixed transition table.
pub struct CandidateGenerator<'a> {
    table: &'a TransitionTable,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(table: &'a TransitionTable) -> Self {
        Self { table }
    }

    /// Produce the five-digit candidate set for the draw following `input`.
    pub fn generate(&self, input: &Suffix, weekday: Weekday, loss_context: u32) -> CandidateSet {
        let candidates = self.merge_pools(input, weekday, loss_context);

        let mut digits: Vec<char> = if candidates.len() > CANDIDATE_SET_SIZE {
            let mut scored: Vec<(f64, char)> = candidates
                .iter()
                .map(|d| (self.score(*d, input, weekday, loss_context), *d))
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
            scored
                .into_iter()
                .take(CANDIDATE_SET_SIZE)
                .map(|(_, d)| d)
                .collect()
        } else {
            candidates.into_iter().collect()
        };

        for d in '0'..='9' {
            if digits.len() >= CANDIDATE_SET_SIZE {
                break;
            }
            if !digits.contains(&d) {
                digits.push(d);
            }
        }

        CandidateSet::from_digits(digits)
    }

    /// Union of every contributing digit pool, ascending.
    fn merge_pools(&self, input: &Suffix, weekday: Weekday, loss_context: u32) -> BTreeSet<char> {
        let mut candidates: BTreeSet<char> = input.chars().into_iter().collect();

        if let Some(history) = self.table.day_history(weekday, input) {
            let counter = DigitCounter::from_digits(history.iter().flat_map(|s| s.chars()));
            candidates.extend(counter.most_common(DAY_PATTERN_TOP));
        }

        if let Some(history) = self.table.input_history(input) {
            let counter = DigitCounter::from_digits(history.iter().flat_map(|s| s.chars()));
            candidates.extend(counter.most_common(INPUT_PATTERN_TOP));
        }

        let global_pool = self.table.global_frequency().most_common(GLOBAL_POOL);
        candidates.extend(global_pool.into_iter().take(GLOBAL_TAKE));

        if loss_context > ESCALATION_THRESHOLD {
            for v in input.values() {
                candidates.insert(digit_char(v + 5));
                candidates.insert(digit_char(v + 1));
                candidates.insert(digit_char(v + 2));
            }
        }

        candidates
    }

    fn score(&self, digit: char, input: &Suffix, weekday: Weekday, loss_context: u32) -> f64 {
        let mut score = 0.0;

        if input.contains(digit) {
            score += INPUT_DIGIT_WEIGHT;
        }

        score += f64::from(self.table.global_frequency().count(digit));

        let in_day_history = self
            .table
            .day_history(weekday, input)
            .is_some_and(|history| history.iter().any(|s| s.contains(digit)));
        if in_day_history {
            score += DAY_PATTERN_WEIGHT;
        }

        if loss_context > 0 {
            let [a, b] = input.values();
            let shift = loss_context % 10;
            let shifted = [digit_char(a + shift), digit_char(b + shift)];
            if shifted.contains(&digit) {
                score += LOSS_SHIFT_WEIGHT;
            }
        }

        score + f64::from(digit_value(digit)) * TIE_BREAK_WEIGHT
    }
}
