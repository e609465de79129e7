//! Packet ingestion models

use flowwatch_core::logic::decision::VerdictRecord;
use flowwatch_core::logic::observation::PacketRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub records: Vec<PacketRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Packets folded into the flow table
    pub accepted: usize,
    /// Flows closed by the packet threshold during this request
    pub finalized: usize,
    /// Verdicts for finalized flows (empty while the network detector is not trained)
    pub verdicts: Vec<VerdictRecord>,
    /// Finalized flows whose row could not be written to the anomaly log
    pub unlogged: usize,
    pub active_flows: usize,
}
