//! Single-observation verdict handlers

use axum::{extract::State, Json};
use flowwatch_core::logic::audit::LogEntry;
use flowwatch_core::logic::decision::VerdictRecord;
use flowwatch_core::logic::observation::{EmailMessage, NetworkFlow, Observation};

use crate::{AppResult, AppState};

/// POST /predict/network
pub async fn network(
    State(state): State<AppState>,
    Json(flow): Json<NetworkFlow>,
) -> AppResult<Json<VerdictRecord>> {
    predict(state, Observation::Network(flow)).await
}

/// POST /predict/email
pub async fn email(
    State(state): State<AppState>,
    Json(email): Json<EmailMessage>,
) -> AppResult<Json<VerdictRecord>> {
    predict(state, Observation::Email(email)).await
}

async fn predict(state: AppState, observation: Observation) -> AppResult<Json<VerdictRecord>> {
    let verdict = tokio::task::spawn_blocking(move || -> AppResult<VerdictRecord> {
        let verdict = state.engine.evaluate(&observation)?;
        state
            .audit_log
            .append(&LogEntry::from_observation(&observation).with_verdict(&verdict))?;
        Ok(verdict)
    })
    .await??;

    Ok(Json(verdict))
}
