//! Transition tables built from draw history.
//!
//! For every adjacent pair of draws the following suffix is recorded under
//! the current (weekday, suffix) and under the current suffix alone, and
//! its digits are added to a global frequency counter.

use std::collections::HashMap;
use tracing::debug;

use crate::types::{digit_value, DrawRecord, Suffix, Weekday};

// ---------------------------------------------------------------------------
// Digit counter
// ---------------------------------------------------------------------------

/// Frequency counter over the digits 0-9.
///
/// Ranking orders by count descending; equal counts keep the order in which
/// the digits were first counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitCounter {
    counts: [u32; 10],
    first_seen: Vec<char>,
}

impl DigitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count every digit yielded by `digits`.
    pub fn from_digits<I: IntoIterator<Item = char>>(digits: I) -> Self {
        let mut counter = Self::new();
        for d in digits {
            counter.add(d);
        }
        counter
    }

    /// Count one occurrence. Non-digit characters are ignored.
    pub fn add(&mut self, digit: char) {
        if !digit.is_ascii_digit() {
            return;
        }
        let idx = digit_value(digit) as usize;
        if self.counts[idx] == 0 {
            self.first_seen.push(digit);
        }
        self.counts[idx] += 1;
    }

    pub fn count(&self, digit: char) -> u32 {
        if !digit.is_ascii_digit() {
            return 0;
        }
        self.counts[digit_value(digit) as usize]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }

    /// Every counted digit, most frequent first.
    pub fn ranked(&self) -> Vec<char> {
        let mut ranked = self.first_seen.clone();
        // Stable sort keeps first-seen order among equal counts.
        ranked.sort_by(|a, b| self.count(*b).cmp(&self.count(*a)));
        ranked
    }

    /// The `n` most frequent digits.
    pub fn most_common(&self, n: usize) -> Vec<char> {
        let mut ranked = self.ranked();
        ranked.truncate(n);
        ranked
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// Next-suffix history keyed by weekday and suffix.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    day_patterns: HashMap<(Weekday, Suffix), Vec<Suffix>>,
    input_patterns: HashMap<Suffix, Vec<Suffix>>,
    global: DigitCounter,
    transitions: usize,
}

impl TransitionTable {
    /// Build the table from records sorted ascending by date.
    ///
    /// Uses the whole sequence: a replay over the same records sees
    /// transitions that lie in its own future.
    pub fn build(records: &[DrawRecord]) -> Self {
        let mut table = Self::default();
        let mut skipped = 0usize;

        for pair in records.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            let (Some(input), Some(following)) = (current.parsed_suffix(), next.parsed_suffix()) else {
                skipped += 1;
                continue;
            };

            table
                .day_patterns
                .entry((current.weekday, input))
                .or_default()
                .push(following);
            table.input_patterns.entry(input).or_default().push(following);
            for d in following.chars() {
                table.global.add(d);
            }
            table.transitions += 1;
        }

        debug!(
            records = records.len(),
            transitions = table.transitions,
            skipped,
            day_keys = table.day_patterns.len(),
            input_keys = table.input_patterns.len(),
            "Transition table built"
        );

        table
    }

    /// Suffixes observed after `suffix` on `weekday`, oldest first.
    pub fn day_history(&self, weekday: Weekday, suffix: &Suffix) -> Option<&[Suffix]> {
        self.day_patterns
            .get(&(weekday, *suffix))
            .map(|v| v.as_slice())
    }

    /// Suffixes observed after `suffix` on any weekday, oldest first.
    pub fn input_history(&self, suffix: &Suffix) -> Option<&[Suffix]> {
        self.input_patterns.get(suffix).map(|v| v.as_slice())
    }

    /// Digit frequencies across every following suffix.
    pub fn global_frequency(&self) -> &DigitCounter {
        &self.global
    }

    /// Number of adjacent pairs that contributed to the table.
    pub fn transition_count(&self) -> usize {
        self.transitions
    }

    pub fn is_empty(&self) -> bool {
        self.transitions == 0
    }
}
