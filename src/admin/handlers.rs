use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::security::{ViolationRecord, ViolationStats};

const DEFAULT_WINDOW_SECS: i64 = 3600;
const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Stats window in seconds.
    pub window: Option<i64>,
    /// Maximum number of recent violations returned.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitReport {
    pub stats: ViolationStats,
    pub recent: Vec<ViolationRecord>,
    pub active_counters: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetSummary {
    pub cleared_violations: usize,
    pub cleared_counters: usize,
}

pub async fn rate_limit_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Json<RateLimitReport> {
    let secs = query.window.filter(|w| *w > 0).unwrap_or(DEFAULT_WINDOW_SECS);
    let window = Duration::try_seconds(secs).unwrap_or(Duration::MAX);
    let violations = state.gateway.violations();

    Json(RateLimitReport {
        stats: violations.stats(window, Utc::now()),
        recent: violations.recent(query.limit.unwrap_or(DEFAULT_LIMIT)),
        active_counters: state.gateway.counters().len(),
    })
}

pub async fn reset_rate_limits(State(state): State<AppState>) -> Json<ResetSummary> {
    let (cleared_violations, cleared_counters) = state.gateway.reset();
    Json(ResetSummary {
        cleared_violations,
        cleared_counters,
    })
}
