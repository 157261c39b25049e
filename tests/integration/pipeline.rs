//! Replay, service and dashboard behaviour over realistic histories.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use bbfs::analysis::{Backtester, CandidateGenerator, TransitionTable};
use bbfs::config::AnalysisConfig;
use bbfs::dashboard::{build_router, DashboardState};
use bbfs::engine::BbfsService;
use bbfs::types::{BbfsError, DrawRecord, PerformanceSummary, Suffix, Weekday};

use crate::memory_source::{daily_history, record, MemorySource};

/// Five Monday draws: 12, 34, 12, 56, 12.
fn monday_history() -> Vec<DrawRecord> {
    vec![
        record("2024-01-01", "0012"),
        record("2024-01-08", "0034"),
        record("2024-01-15", "0012"),
        record("2024-01-22", "0056"),
        record("2024-01-29", "0012"),
    ]
}

/// A varied, reproducible sequence of suffixes.
fn pseudo_random_suffixes(n: usize, seed: u64) -> Vec<String> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            format!("{:02}", (state >> 33) % 100)
        })
        .collect()
}

fn long_history(n: usize, seed: u64) -> Vec<DrawRecord> {
    let suffixes = pseudo_random_suffixes(n, seed);
    let refs: Vec<&str> = suffixes.iter().map(String::as_str).collect();
    daily_history("2023-01-01", &refs)
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

#[test]
fn test_monday_scenario_replay() {
    let records = monday_history();
    let table = TransitionTable::build(&records);
    let stats = Backtester::new(&AnalysisConfig::default()).run(&records, &table).unwrap();

    assert_eq!(stats.total_tests, 4);
    assert_eq!(stats.total_wins, 3);
    assert_eq!(stats.total_losses, 1);
    assert_eq!(stats.max_consecutive_loss, 1);
    assert_eq!(stats.loss_streaks, vec![1]);
    assert!(stats.meets_target);
    assert_eq!(stats.win_rate, 75.0);

    // "12" on a Monday scores 1 and 2 highest and drops 3, missing "34".
    let loss = &stats.loss_details[0];
    assert_eq!(loss.input_suffix, "12");
    assert_eq!(loss.actual_suffix, "34");
    assert_eq!(loss.candidates, "12456");
    assert_eq!(loss.loss_number, Some(1));
}

#[test]
fn test_replay_invariants_on_long_history() {
    for seed in [1, 7, 42, 2024] {
        let records = long_history(300, seed);
        let table = TransitionTable::build(&records);
        let stats = Backtester::new(&AnalysisConfig::default()).run(&records, &table).unwrap();

        assert_eq!(stats.total_tests as usize, records.len() - 1);
        assert_eq!(stats.total_wins + stats.total_losses, stats.total_tests);
        assert_eq!(stats.loss_streaks.iter().sum::<u32>(), stats.total_losses);
        assert_eq!(
            stats.loss_streaks.iter().copied().max().unwrap_or(0),
            stats.max_consecutive_loss
        );
        assert!(stats.loss_streaks.iter().all(|&len| len > 0));
        assert!((0.0..=100.0).contains(&stats.win_rate));
        assert_eq!(stats.meets_target, stats.max_consecutive_loss <= 10);
    }
}

#[test]
fn test_replay_is_deterministic() {
    let records = long_history(200, 99);
    let backtester = Backtester::new(&AnalysisConfig::default());

    let first = backtester.run(&records, &TransitionTable::build(&records)).unwrap();
    let second = backtester.run(&records, &TransitionTable::build(&records)).unwrap();

    assert_eq!(PerformanceSummary::from(&first), PerformanceSummary::from(&second));
    assert_eq!(first.loss_streaks, second.loss_streaks);
    assert_eq!(first.results, second.results);
}

#[test]
fn test_malformed_record_breaks_two_pairs() {
    let mut records = long_history(20, 5);
    let date = records[10].date.to_string();
    records[10] = record(&date, "12a4");
    let table = TransitionTable::build(&records);
    let stats = Backtester::new(&AnalysisConfig::default()).run(&records, &table).unwrap();

    assert_eq!(stats.total_tests as usize, records.len() - 3);
    assert_eq!(table.transition_count(), records.len() - 3);
}

#[test]
fn test_replay_rejects_short_history() {
    let records = vec![record("2024-01-01", "1234")];
    let table = TransitionTable::build(&records);
    let err = Backtester::new(&AnalysisConfig::default()).run(&records, &table).unwrap_err();
    assert!(matches!(err, BbfsError::InsufficientData { available: 1 }));
}

#[test]
fn test_generator_pads_repeated_digit_on_empty_table() {
    let table = TransitionTable::default();
    let suffix = Suffix::parse("11").unwrap();
    let set = CandidateGenerator::new(&table).generate(&suffix, Weekday::Friday, 0);

    assert_eq!(set.digits(), &['1', '0', '2', '3', '4']);
    assert!(set.covers(&suffix));
}

#[test]
fn test_generator_always_returns_five_distinct_digits() {
    let records = long_history(150, 3);
    let table = TransitionTable::build(&records);
    let generator = CandidateGenerator::new(&table);

    for record in &records {
        let suffix = record.parsed_suffix().unwrap();
        for loss_context in [0, 1, 4, 12] {
            let set = generator.generate(&suffix, record.weekday, loss_context);
            let mut digits = set.digits().to_vec();
            digits.sort_unstable();
            digits.dedup();
            assert_eq!(digits.len(), 5);
            // Input digits score above every other pool.
            assert!(suffix.chars().iter().all(|d| set.contains(*d)));
        }
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_service_recovers_after_outage() {
    let source = MemorySource::new(monday_history()).failing_first(1);
    let mut service = BbfsService::new(Box::new(source), AnalysisConfig::default());

    let err = service.refresh().await.unwrap_err();
    assert!(matches!(err, BbfsError::FetchFailure(_)));
    assert!(err.to_string().contains("simulated outage"));
    assert!(service.records().is_empty());

    let report = service.refresh().await.unwrap();
    assert_eq!(report.records, 5);
    assert_eq!(report.summary.unwrap().losses, 1);
    assert_eq!(service.current_streak(10).unwrap().losses, 0);
}

#[tokio::test]
async fn test_current_streak_numbers_back_from_newest() {
    let mut service = BbfsService::new(
        Box::new(MemorySource::new(long_history(400, 11))),
        AnalysisConfig::default(),
    );
    service.refresh().await.unwrap();

    let streak = service.current_streak(50).unwrap();
    assert_eq!(streak.details.len() as u32, streak.losses);
    for (i, event) in streak.details.iter().enumerate() {
        assert_eq!(event.loss_number, Some(streak.losses - i as u32));
    }
    assert!(streak.details.windows(2).all(|w| w[0].date < w[1].date));
}

#[tokio::test]
async fn test_breakdown_accounts_for_every_streak() {
    let mut service = BbfsService::new(
        Box::new(MemorySource::new(long_history(365, 21))),
        AnalysisConfig::default(),
    );
    service.refresh().await.unwrap();

    let stats = service.statistics().unwrap().clone();
    let buckets = service.loss_streak_breakdown();
    let counted: u32 = buckets.iter().map(|b| b.count).sum();
    assert_eq!(counted as usize, stats.loss_streaks.len());
    assert!(buckets.windows(2).all(|w| w[0].length < w[1].length));
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_dashboard_refresh_then_summary() {
    let service = BbfsService::new(
        Box::new(MemorySource::new(monday_history())),
        AnalysisConfig::default(),
    );
    let state = Arc::new(DashboardState::new(service));

    let resp = build_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = build_router(state)
        .oneshot(Request::builder().uri("/api/summary").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_tests"], 4);
    assert_eq!(json["wins"], 3);
    assert_eq!(json["max_consecutive_loss"], 1);
}
