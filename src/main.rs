//! BBFS: draw-history streak analytics.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! performs the initial fetch + replay, then serves the dashboard API
//! until Ctrl+C (or logs a one-shot report when the dashboard is off).

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use bbfs::config::AppConfig;
use bbfs::dashboard::{self, AppState, DashboardState};
use bbfs::engine::BbfsService;
use bbfs::source::http::HttpDrawSource;
use bbfs::types::{BbfsError, Weekday};

const BANNER: &str = r#"
 ____  ____  _____ ____
| __ )| __ )|  ___/ ___|
|  _ \|  _ \| |_  \___ \
| |_) | |_) |  _|  ___) |
|____/|____/|_|   |____/

  Draw-history streak analytics
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::var("BBFS_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = AppConfig::load(&config_path).map_err(|e| BbfsError::Config(format!("{e:#}")))?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        url = %cfg.source.url,
        years = format!("{}-{}", cfg.source.min_year, cfg.source.max_year),
        dashboard = cfg.dashboard.enabled,
        "BBFS starting up"
    );

    let source = HttpDrawSource::new(&cfg.source)?;
    let mut service = BbfsService::new(Box::new(source), cfg.analysis.clone());

    match service.refresh().await {
        Ok(report) => info!(
            records = report.records,
            summary = report.summary.map(|s| s.to_string()).unwrap_or_else(|| "insufficient data".into()),
            "Initial load complete"
        ),
        Err(e) => error!(error = %e, "Initial load failed, starting without data"),
    }

    if !cfg.dashboard.enabled {
        log_report(&service);
        return Ok(());
    }

    let state: AppState = Arc::new(DashboardState::new(service));

    if cfg.dashboard.refresh_interval_secs > 0 {
        spawn_periodic_refresh(state.clone(), Duration::from_secs(cfg.dashboard.refresh_interval_secs));
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        info!("Shutdown signal received.");
    };

    dashboard::serve(state, cfg.dashboard.port, shutdown).await?;
    info!("BBFS shut down cleanly.");
    Ok(())
}

/// Re-run fetch + rebuild + replay on a fixed interval.
fn spawn_periodic_refresh(state: AppState, every: Duration) {
    info!(interval_secs = every.as_secs(), "Periodic refresh enabled");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // The first tick fires immediately; the initial load already ran.
        interval.tick().await;

        loop {
            interval.tick().await;
            match state.refresh().await {
                Ok(report) => info!(records = report.records, "Periodic refresh complete"),
                Err(e) => warn!(error = %e, "Periodic refresh failed, keeping previous data"),
            }
        }
    });
}

/// Log a human-readable summary of the loaded history.
fn log_report(service: &BbfsService) {
    let Some(summary) = service.performance_summary() else {
        warn!(records = service.records().len(), "No statistics available");
        return;
    };
    info!(%summary, "Backtest summary");

    match service.current_streak(service.config().streak_window) {
        Ok(streak) => info!(losses = streak.losses, "Current loss streak"),
        Err(e) => warn!(error = %e, "Current streak unavailable"),
    }

    for bucket in service.loss_streak_breakdown() {
        info!(
            length = bucket.length,
            count = bucket.count,
            share = format!("{:.1}%", bucket.percentage),
            severity = ?bucket.severity,
            "Loss streak bucket"
        );
    }

    if let Some(prediction) = service.predict_next(Weekday::today()) {
        info!(
            based_on = %prediction.based_on,
            weekday = %prediction.weekday,
            candidates = %prediction.candidates,
            "Next draw candidates"
        );
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bbfs=info"));

    if std::env::var("BBFS_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
