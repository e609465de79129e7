//! Anomaly log handlers

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use flowwatch_core::logic::audit::{LogFilter, LogListing, LogStatistics};
use serde_json::json;

use crate::{AppResult, AppState};

/// GET /logs?domain=&severity=&is_anomaly=
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<LogFilter>,
) -> AppResult<impl IntoResponse> {
    let audit_log = state.audit_log.clone();
    let listing = tokio::task::spawn_blocking(move || audit_log.query(&filter)).await??;

    let body = match listing {
        LogListing::Empty if filter.is_empty() => json!({ "message": "No logs yet" }),
        LogListing::Empty => json!([]),
        LogListing::Rows(rows) => json!(rows),
    };

    Ok(Json(body))
}

/// GET /logs/statistics
pub async fn statistics(State(state): State<AppState>) -> AppResult<Json<LogStatistics>> {
    let audit_log = state.audit_log.clone();
    let stats =
        tokio::task::spawn_blocking(move || audit_log.statistics(chrono::Utc::now())).await??;

    Ok(Json(stats))
}
