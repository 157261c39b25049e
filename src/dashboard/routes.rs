//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`;
//! refresh takes the write lock only after the fetch has finished.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::engine::{BbfsService, RefreshReport};
use crate::types::{
    BbfsError, CurrentStreak, DataInfo, DrawRecord, PerformanceSummary, Prediction, StreakBucket,
    Weekday, WindowEntry,
};

/// Upper bound for any `limit` query parameter.
const MAX_LIMIT: usize = 500;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub service: RwLock<BbfsService>,
}

impl DashboardState {
    pub fn new(service: BbfsService) -> Self {
        Self {
            service: RwLock::new(service),
        }
    }

    /// Fetch without holding any lock, then swap the new history in under
    /// the write lock. Readers keep seeing the cached data while the fetch
    /// is in flight, and after it fails.
    pub async fn refresh(&self) -> Result<RefreshReport, BbfsError> {
        let source = self.service.read().await.source();
        let records = BbfsService::fetch_from(source.as_ref()).await?;
        Ok(self.service.write().await.apply_records(records))
    }
}

pub type AppState = Arc<DashboardState>;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn resolve(&self, default: usize) -> usize {
        self.limit.unwrap_or(default).min(MAX_LIMIT)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Maps service errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(BbfsError);

impl From<BbfsError> for ApiError {
    fn from(err: BbfsError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BbfsError::FetchFailure(_) => StatusCode::BAD_GATEWAY,
            BbfsError::InsufficientData { .. } => StatusCode::SERVICE_UNAVAILABLE,
            BbfsError::Config(_) => {
                error!(error = %self.0, "Configuration error while serving request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/summary
pub async fn get_summary(State(state): State<AppState>) -> Result<Json<PerformanceSummary>, ApiError> {
    let service = state.service.read().await;
    service
        .performance_summary()
        .map(Json)
        .ok_or_else(|| {
            BbfsError::InsufficientData {
                available: service.records().len(),
            }
            .into()
        })
}

/// GET /api/streak/current?limit=N
pub async fn get_current_streak(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<CurrentStreak>, ApiError> {
    let service = state.service.read().await;
    let limit = query.resolve(service.config().streak_window);
    Ok(Json(service.current_streak(limit)?))
}

/// GET /api/streak/breakdown
pub async fn get_streak_breakdown(State(state): State<AppState>) -> Json<Vec<StreakBucket>> {
    let service = state.service.read().await;
    Json(service.loss_streak_breakdown())
}

/// GET /api/results/latest?limit=N
pub async fn get_latest_results(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<DrawRecord>> {
    let service = state.service.read().await;
    let limit = query.resolve(service.config().latest_limit);
    Json(service.latest_results(limit))
}

/// GET /api/results/recent?limit=N
pub async fn get_recent_analysis(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<WindowEntry>> {
    let service = state.service.read().await;
    let limit = query.resolve(service.config().recent_window);
    Json(service.recent_analysis(limit))
}

/// GET /api/prediction
pub async fn get_prediction(State(state): State<AppState>) -> Result<Json<Prediction>, ApiError> {
    let service = state.service.read().await;
    service
        .predict_next(Weekday::today())
        .map(Json)
        .ok_or_else(|| {
            BbfsError::InsufficientData {
                available: service.records().len(),
            }
            .into()
        })
}

/// GET /api/data
pub async fn get_data_info(State(state): State<AppState>) -> Result<Json<DataInfo>, ApiError> {
    let service = state.service.read().await;
    service
        .data_info()
        .map(Json)
        .ok_or_else(|| BbfsError::InsufficientData { available: 0 }.into())
}

/// POST /api/refresh
pub async fn post_refresh(State(state): State<AppState>) -> Result<Json<RefreshReport>, ApiError> {
    let report = state.refresh().await?;
    info!(records = report.records, "Refresh requested via API completed");
    Ok(Json(report))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
