//! Batch scoring handler

use axum::{extract::State, Json};
use flowwatch_core::logic::audit::LogEntry;

use crate::models::{AnalyzeResponse, BatchRequest};
use crate::{AppResult, AppState};

/// POST /analyze
///
/// Scores every record (no threat classification) and logs one entry per record.
pub async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    let domain = req.domain;
    let records = req.observations()?;

    let response = tokio::task::spawn_blocking(move || -> AppResult<AnalyzeResponse> {
        let scores = state.engine.score_batch(domain, &records)?;
        let threshold = state.engine.scorer().threshold(domain)?;

        let entries: Vec<LogEntry> = records
            .iter()
            .zip(&scores)
            .map(|(record, score)| LogEntry::from_observation(record).with_score(score))
            .collect();
        state.audit_log.append_all(&entries)?;

        let flagged = scores.iter().filter(|s| s.is_anomaly).count();
        tracing::debug!("Analyzed {} {} records, {} anomalous", scores.len(), domain, flagged);

        Ok(AnalyzeResponse::from_scores(
            domain,
            &scores,
            threshold.decision_threshold,
            threshold.score_threshold,
        ))
    })
    .await??;

    Ok(Json(response))
}
