//! Train / analyze request and response models

use chrono::{DateTime, Utc};
use flowwatch_core::logic::model::ScoreResult;
use flowwatch_core::logic::observation::{Domain, EmailMessage, NetworkFlow, Observation, PacketRecord};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// `{domain, records}` batch for `/train` and `/analyze`
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub domain: Domain,
    #[serde(default)]
    pub records: Vec<serde_json::Value>,
}

impl BatchRequest {
    /// Parse every record with the schema of `domain`.
    ///
    /// Network records are either full connection summaries (`NetworkFlow`)
    /// or collector-style packet records (`src_ip, dst_ip, bytes, packets,
    /// protocol, process`), which are scored as one-record flows.
    pub fn observations(self) -> AppResult<Vec<Observation>> {
        let domain = self.domain;
        let arrival = Utc::now();

        self.records
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let parsed = match domain {
                    Domain::Network => parse_network(value, arrival),
                    Domain::Email => serde_json::from_value::<EmailMessage>(value)
                        .map(Observation::Email)
                        .map_err(|e| e.to_string()),
                };
                parsed.map_err(|e| AppError::ValidationError(format!("record {}: {}", i, e)))
            })
            .collect()
    }
}

fn parse_network(value: serde_json::Value, arrival: DateTime<Utc>) -> Result<Observation, String> {
    let flow_error = match serde_json::from_value::<NetworkFlow>(value.clone()) {
        Ok(flow) => return Ok(Observation::Network(flow)),
        Err(e) => e,
    };

    // Not a flow summary; fall back to the packet-record shape
    let packet = serde_json::from_value::<PacketRecord>(value).map_err(|_| flow_error.to_string())?;
    packet.check().map_err(|e| e.to_string())?;

    Ok(Observation::Network(packet.to_network_flow(arrival)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrainResponse {
    pub domain: Domain,
    pub trained_on: usize,
    pub features: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub domain: Domain,
    pub anomaly_scores: Vec<f64>,
    pub decision_scores: Vec<f64>,
    pub is_anomaly: Vec<bool>,
    /// Threshold on the decision function
    pub threshold: f64,
    /// Same threshold expressed on the anomaly score
    pub score_threshold: f64,
}

impl AnalyzeResponse {
    pub fn from_scores(domain: Domain, scores: &[ScoreResult], threshold: f64, score_threshold: f64) -> Self {
        Self {
            domain,
            anomaly_scores: scores.iter().map(|s| s.anomaly_score).collect(),
            decision_scores: scores.iter().map(|s| s.decision).collect(),
            is_anomaly: scores.iter().map(|s| s.is_anomaly).collect(),
            threshold,
            score_threshold,
        }
    }
}
