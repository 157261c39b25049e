//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default so a partial (or empty) file is valid.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub analysis: AnalysisConfig,
    pub dashboard: DashboardConfig,
}

/// Upstream results page and fetch policy.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub url: String,
    pub user_agent: String,
    /// Per-attempt timeout.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay_secs: u64,
    /// Inclusive year window for retained draws.
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: "http://178.128.121.191/".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            retry_delay_secs: 2,
            min_year: 2020,
            max_year: 2025,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

/// Backtest and accessor tuning.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Longest acceptable loss streak for `meets_target`.
    pub target_max_loss: u32,
    /// How many trailing win/loss/result samples a replay keeps.
    pub detail_limit: usize,
    /// Default window for the current-streak scan.
    pub streak_window: usize,
    /// Default window for the annotated recent results.
    pub recent_window: usize,
    /// Default number of records returned by the latest-results accessor.
    pub latest_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_max_loss: 10,
            detail_limit: 100,
            streak_window: 10,
            recent_window: 8,
            latest_limit: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
    /// Periodic refresh interval; 0 disables it.
    pub refresh_interval_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
            refresh_interval_secs: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.source.max_attempts == 0 {
            anyhow::bail!("source.max_attempts must be at least 1");
        }
        if self.source.min_year > self.source.max_year {
            anyhow::bail!(
                "source.min_year ({}) is after source.max_year ({})",
                self.source.min_year,
                self.source.max_year
            );
        }
        Ok(())
    }
}
