//! Detector training handler

use axum::{extract::State, Json};

use crate::models::{BatchRequest, TrainResponse};
use crate::{AppResult, AppState};

/// POST /train
pub async fn train(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<TrainResponse>> {
    let domain = req.domain;
    let records = req.observations()?;

    tracing::info!("Training {} detector on {} records", domain, records.len());

    let engine = state.engine.clone();
    let summary = tokio::task::spawn_blocking(move || engine.train(domain, &records)).await??;

    Ok(Json(TrainResponse {
        domain: summary.domain,
        trained_on: summary.trained_on,
        features: summary.features,
    }))
}
