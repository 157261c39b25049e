//! HTTP results-page source.
//!
//! Fetches the results page with a bounded retry (fixed delay between
//! attempts, per-attempt timeout) and hands the body to the table parser.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::parser::DrawTableParser;
use super::DrawSource;
use crate::config::SourceConfig;
use crate::types::DrawRecord;

const SOURCE_NAME: &str = "results-page";

/// Scrapes draw history from the configured results page.
pub struct HttpDrawSource {
    http: Client,
    url: String,
    max_attempts: u32,
    retry_delay: Duration,
    parser: DrawTableParser,
}

impl HttpDrawSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client for results page")?;

        Ok(Self {
            http,
            url: config.url.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
            parser: DrawTableParser::new(config.min_year, config.max_year)?,
        })
    }

    /// GET the results page, retrying on transport errors and non-success
    /// statuses.
    async fn fetch_html(&self) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                debug!(
                    attempt,
                    delay_ms = self.retry_delay.as_millis() as u64,
                    "Retrying results page fetch"
                );
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.http.get(&self.url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .text()
                            .await
                            .context("Failed to read results page body");
                    }
                    warn!(status = %status, attempt, url = %self.url, "Results page returned error status");
                    last_error = Some(format!("HTTP {status}"));
                }
                Err(e) => {
                    warn!(attempt, error = %e, url = %self.url, "Results page request failed");
                    last_error = Some(format!("Request error: {e}"));
                }
            }
        }

        anyhow::bail!(
            "Results page fetch failed after {} attempts: {}",
            self.max_attempts,
            last_error.unwrap_or_default()
        )
    }
}

#[async_trait]
impl DrawSource for HttpDrawSource {
    async fn fetch_records(&self) -> Result<Vec<DrawRecord>> {
        let html = self.fetch_html().await?;
        let records = self.parser.parse(&html);

        match (records.first(), records.last()) {
            (Some(first), Some(last)) => info!(
                count = records.len(),
                from = %first.date,
                to = %last.date,
                "Draw history loaded"
            ),
            _ => warn!(url = %self.url, "Results page contained no usable draws"),
        }

        Ok(records)
    }

    fn name(&self) -> &'static str {
        SOURCE_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::get, Router};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const PAGE: &str = r#"<table>
        <td title="kamis=2024-02-01=x">1234</td>
        <td title="jumat=2024-02-02=x">5678</td>
    </table>"#;

    /// Serve `PAGE` after `failures` error responses; returns the base URL
    /// and the hit counter.
    async fn spawn_server(failures: u32) -> (String, Arc<AtomicU32>) {
        let hits = Arc::new(AtomicU32::new(0));

        async fn handler(State((hits, failures)): State<(Arc<AtomicU32>, u32)>) -> (StatusCode, &'static str) {
            let n = hits.fetch_add(1, Ordering::SeqCst);
            if n < failures {
                (StatusCode::INTERNAL_SERVER_ERROR, "down")
            } else {
                (StatusCode::OK, PAGE)
            }
        }

        let app = Router::new()
            .route("/", get(handler))
            .with_state((hits.clone(), failures));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/"), hits)
    }

    fn config_for(url: String) -> SourceConfig {
        SourceConfig {
            url,
            retry_delay_secs: 0,
            timeout_secs: 5,
            ..SourceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_records_success() {
        let (url, hits) = spawn_server(0).await;
        let source = HttpDrawSource::new(&config_for(url)).unwrap();

        let records = source.fetch_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].suffix, "78");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_retries_then_succeeds() {
        let (url, hits) = spawn_server(2).await;
        let source = HttpDrawSource::new(&config_for(url)).unwrap();

        let records = source.fetch_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_fails_after_max_attempts() {
        let (url, hits) = spawn_server(10).await;
        let source = HttpDrawSource::new(&config_for(url)).unwrap();

        let err = source.fetch_records().await.unwrap_err();
        assert!(err.to_string().contains("after 3 attempts"), "{err}");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        let mut cfg = config_for("http://127.0.0.1:1/".to_string());
        cfg.max_attempts = 2;
        let source = HttpDrawSource::new(&cfg).unwrap();

        let err = source.fetch_records().await.unwrap_err();
        assert!(err.to_string().contains("Request error"), "{err}");
    }

    #[test]
    fn test_source_name() {
        let source = HttpDrawSource::new(&SourceConfig::default()).unwrap();
        assert_eq!(source.name(), "results-page");
    }
}
