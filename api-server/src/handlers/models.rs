//! Model status handler

use axum::{extract::State, Json};
use flowwatch_core::logic::model::ModelStatus;

use crate::AppState;

/// GET /models/status
pub async fn status(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(state.engine.status())
}
