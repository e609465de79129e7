//! Packet ingestion handler

use axum::{extract::State, Json};

use crate::models::{IngestRequest, IngestResponse};
use crate::pipeline::process_flow;
use crate::{AppError, AppResult, AppState};

/// POST /ingest/packets
///
/// The whole batch is folded into the flow table first; flows closed by the
/// packet threshold are then decided and logged. Expired flows are handled by
/// the background consumer.
pub async fn packets(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> AppResult<Json<IngestResponse>> {
    // Reject the whole batch before touching the flow table
    for (i, packet) in req.records.iter().enumerate() {
        packet
            .check()
            .map_err(|e| AppError::ValidationError(format!("record {}: {}", i, e)))?;
    }

    let response = tokio::task::spawn_blocking(move || -> AppResult<IngestResponse> {
        let mut flows = Vec::new();
        for packet in &req.records {
            if let Some(flow) = state.aggregator.ingest(packet)? {
                flows.push(flow);
            }
        }

        let mut verdicts = Vec::new();
        let mut unlogged = 0;
        for flow in &flows {
            let processed = process_flow(&state.engine, &state.audit_log, flow);
            if !processed.is_logged() {
                unlogged += 1;
            }
            verdicts.extend(processed.verdict);
        }

        if unlogged > 0 {
            tracing::warn!("{} of {} finalized flows were not logged", unlogged, flows.len());
        }

        Ok(IngestResponse {
            accepted: req.records.len(),
            finalized: flows.len(),
            verdicts,
            unlogged,
            active_flows: state.aggregator.active_flows(),
        })
    })
    .await??;

    Ok(Json(response))
}
