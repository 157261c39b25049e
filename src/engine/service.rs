//! The analytics service.
//!
//! Owns the draw history, the transition table built from it and the
//! cached replay statistics. Fetching is the only operation that talks to
//! the network; everything else is a read over in-memory state.
//!
//! `fetch_from` needs no access to the service, so a caller sharing the
//! service behind a lock can fetch without holding it and only lock for
//! `apply_records`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analysis::backtest::{self, Backtester};
use crate::analysis::{CandidateGenerator, TransitionTable};
use crate::config::AnalysisConfig;
use crate::source::DrawSource;
use crate::types::{
    BbfsError, CurrentStreak, DataInfo, DrawRecord, PerformanceSummary, Prediction, StreakBucket,
    StreakStatistics, Weekday, WindowEntry,
};

/// Outcome of a successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// `None` when the fetched history is too short to replay.
    pub summary: Option<PerformanceSummary>,
}

pub struct BbfsService {
    source: Arc<dyn DrawSource>,
    config: AnalysisConfig,
    backtester: Backtester,
    records: Vec<DrawRecord>,
    table: TransitionTable,
    stats: Option<StreakStatistics>,
    last_updated: Option<DateTime<Utc>>,
}

impl BbfsService {
    pub fn new(source: Box<dyn DrawSource>, config: AnalysisConfig) -> Self {
        Self {
            source: Arc::from(source),
            backtester: Backtester::new(&config),
            config,
            records: Vec::new(),
            table: TransitionTable::default(),
            stats: None,
            last_updated: None,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Draw history, ascending by date.
    pub fn records(&self) -> &[DrawRecord] {
        &self.records
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Shared handle to the draw source.
    pub fn source(&self) -> Arc<dyn DrawSource> {
        Arc::clone(&self.source)
    }

    // -- Mutations -------------------------------------------------------

    /// Fetch the history, rebuild the table and replay.
    ///
    /// On fetch failure the previously loaded history and statistics stay
    /// in place.
    pub async fn refresh(&mut self) -> Result<RefreshReport, BbfsError> {
        let source = self.source();
        let records = Self::fetch_from(source.as_ref()).await?;
        Ok(self.apply_records(records))
    }

    /// Fetch the full history from `source`, mapping failures to
    /// `FetchFailure`.
    pub async fn fetch_from(source: &dyn DrawSource) -> Result<Vec<DrawRecord>, BbfsError> {
        info!(source = source.name(), "Refreshing draw history");

        source.fetch_records().await.map_err(|e| {
            warn!(
                source = source.name(),
                error = %e,
                "Refresh failed, keeping previous data"
            );
            BbfsError::FetchFailure(format!("{e:#}"))
        })
    }

    /// Install freshly fetched records, rebuild the table and replay.
    pub fn apply_records(&mut self, records: Vec<DrawRecord>) -> RefreshReport {
        self.load_records(records);
        self.last_updated = Some(Utc::now());

        let summary = match self.run_performance_test() {
            Ok(stats) => Some(PerformanceSummary::from(stats)),
            Err(e) => {
                warn!(error = %e, "Refreshed history cannot be replayed");
                None
            }
        };

        RefreshReport {
            records: self.records.len(),
            first_date: self.records.first().map(|r| r.date),
            last_date: self.records.last().map(|r| r.date),
            summary,
        }
    }

    /// Replace the history without fetching. Sorts ascending, keeps the
    /// first record per date, rebuilds the table and drops cached stats.
    pub fn load_records(&mut self, mut records: Vec<DrawRecord>) {
        records.sort_by_key(|r| r.date);
        records.dedup_by_key(|r| r.date);

        self.table = TransitionTable::build(&records);
        self.records = records;
        self.stats = None;

        debug!(records = self.records.len(), "Draw history loaded, statistics invalidated");
    }

    /// Cached statistics, replaying once if none are cached yet.
    pub fn run_performance_test(&mut self) -> Result<&StreakStatistics, BbfsError> {
        if self.stats.is_none() {
            let stats = self.backtester.run(&self.records, &self.table)?;
            self.stats = Some(stats);
        }
        self.stats
            .as_ref()
            .ok_or(BbfsError::InsufficientData { available: self.records.len() })
    }

    // -- Queries ---------------------------------------------------------

    /// Cached statistics, if a replay has run since the last load.
    pub fn statistics(&self) -> Option<&StreakStatistics> {
        self.stats.as_ref()
    }

    pub fn performance_summary(&self) -> Option<PerformanceSummary> {
        self.stats.as_ref().map(PerformanceSummary::from)
    }

    /// Loss streak running at the end of history, scanned over the last
    /// `limit` records.
    pub fn current_streak(&self, limit: usize) -> Result<CurrentStreak, BbfsError> {
        backtest::scan_current_streak(&self.records, &self.table, limit)
    }

    /// Historical streak-length distribution. Empty until a replay has run.
    pub fn loss_streak_breakdown(&self) -> Vec<StreakBucket> {
        self.stats
            .as_ref()
            .map(|s| backtest::loss_streak_breakdown(&s.loss_streaks))
            .unwrap_or_default()
    }

    /// The newest `limit` records, newest first.
    pub fn latest_results(&self, limit: usize) -> Vec<DrawRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    /// The newest `limit` draw pairs annotated with win/loss, newest first.
    pub fn recent_analysis(&self, limit: usize) -> Vec<WindowEntry> {
        backtest::analyse_recent(&self.records, &self.table, limit)
    }

    pub fn data_info(&self) -> Option<DataInfo> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        Some(DataInfo {
            total_records: self.records.len(),
            first_date: first.date,
            last_date: last.date,
            last_updated: self.last_updated,
        })
    }

    /// Candidate set for the draw after the newest record.
    pub fn predict_next(&self, weekday: Weekday) -> Option<Prediction> {
        let latest = self.records.last()?;
        let suffix = latest.parsed_suffix()?;
        let candidates = CandidateGenerator::new(&self.table).generate(&suffix, weekday, 0);
        Some(Prediction {
            based_on: latest.clone(),
            weekday,
            candidates,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
