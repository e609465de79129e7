//! Log Entry - một row trong anomaly log
//!
//! Mọi field là Option: rows ghi trước khi column tồn tại đọc ra null.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::decision::{Severity, VerdictRecord};
use crate::logic::flow::FinalizedFlow;
use crate::logic::model::ScoreResult;
use crate::logic::observation::{Domain, Observation};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Assigned by the store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    // Observation identity
    pub domain: Option<Domain>,
    pub source_ip: Option<String>,
    pub destination_ip: Option<String>,
    pub protocol: Option<String>,
    pub port_number: Option<i64>,
    pub bytes: Option<f64>,
    pub packets: Option<i64>,
    pub process: Option<String>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,

    // Verdict
    pub anomaly_score: Option<f64>,
    pub is_anomaly: Option<bool>,
    pub threat_class: Option<String>,
    pub confidence: Option<f64>,
    pub severity: Option<Severity>,
    pub details: Option<String>,

    /// Server-assigned log time
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogEntry {
    /// Identity fields of an observation, stamped now
    pub fn from_observation(observation: &Observation) -> Self {
        let mut entry = Self {
            domain: Some(observation.domain()),
            observed_at: Some(observation.timestamp()),
            details: Some(observation.details()),
            timestamp: Some(Utc::now()),
            ..Self::default()
        };

        match observation {
            Observation::Network(flow) => {
                entry.source_ip = Some(flow.source_ip.to_string());
                entry.destination_ip = Some(flow.destination_ip.to_string());
                entry.protocol = Some(flow.protocol.to_string());
                entry.port_number = Some(flow.port_number as i64);
                entry.bytes = Some(flow.bytes_sent + flow.bytes_received);
                entry.packets = Some(
                    i64::try_from(flow.packets_sent.saturating_add(flow.packets_received))
                        .unwrap_or(i64::MAX),
                );
                entry.process = flow.process.clone();
            }
            Observation::Email(email) => {
                entry.sender = Some(email.sender_email.clone());
                entry.recipient = Some(email.receiver_email.clone());
                entry.bytes = Some(email.email_size);
            }
        }

        entry
    }

    /// Finalized flow, described by its aggregate statistics
    pub fn from_flow(flow: &FinalizedFlow) -> Self {
        Self {
            details: Some(flow.summary()),
            ..Self::from_observation(&Observation::Network(flow.to_network_flow()))
        }
    }

    /// Score-only result (`/analyze`)
    pub fn with_score(mut self, score: &ScoreResult) -> Self {
        self.anomaly_score = Some(score.anomaly_score);
        self.is_anomaly = Some(score.is_anomaly);
        self
    }

    pub fn with_verdict(mut self, verdict: &VerdictRecord) -> Self {
        self.domain = Some(verdict.domain);
        self.anomaly_score = Some(verdict.anomaly_score);
        self.is_anomaly = Some(verdict.is_anomaly);
        self.threat_class = verdict.threat_class.clone();
        self.confidence = Some(verdict.confidence);
        self.severity = verdict.severity;
        if self.details.is_none() {
            self.details = Some(verdict.details.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::fixtures;

    #[test]
    fn test_network_identity() {
        let entry = LogEntry::from_observation(&Observation::Network(fixtures::network_flow()));

        assert_eq!(entry.domain, Some(Domain::Network));
        assert_eq!(entry.source_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(entry.protocol.as_deref(), Some("TCP"));
        assert_eq!(entry.packets, Some(38));
        assert_eq!(entry.sender, None);
        assert_eq!(entry.details.as_deref(), Some("Network traffic from 10.0.0.1 to 10.0.0.2"));
        assert!(entry.timestamp.is_some());
        assert!(entry.is_anomaly.is_none());
    }

    #[test]
    fn test_packet_count_clamps_to_column_range() {
        let mut flow = fixtures::network_flow();
        flow.packets_sent = u64::MAX;
        flow.packets_received = 1;

        let entry = LogEntry::from_observation(&Observation::Network(flow.clone()));
        assert_eq!(entry.packets, Some(i64::MAX));

        flow.packets_received = 0;
        let entry = LogEntry::from_observation(&Observation::Network(flow));
        assert_eq!(entry.packets, Some(i64::MAX));
    }

    #[test]
    fn test_flow_row_keeps_flow_summary() {
        use crate::logic::decision::decide;
        use crate::logic::flow::{CloseReason, FlowKey, FlowState};

        let now = fixtures::fixed_time();
        let packet = fixtures::packet(1, 2, 100, now);
        let mut state = FlowState::new(FlowKey::from_packet(&packet), now);
        state.update(&packet, now);
        let flow = FinalizedFlow::new(state, CloseReason::PacketThreshold);

        let score = ScoreResult {
            domain: Domain::Network,
            raw_score: -0.4,
            decision: 0.05,
            anomaly_score: 0.6,
            is_anomaly: false,
            threshold: -0.1,
            score_threshold: 0.55,
        };
        let verdict = decide(&score, None, "Network traffic from 10.0.0.1 to 10.0.0.2".into(), now);

        let entry = LogEntry::from_flow(&flow).with_verdict(&verdict);

        assert_eq!(entry.details, Some(flow.summary()));
        assert_eq!(entry.packets, Some(1));
        assert_eq!(entry.confidence, Some(0.6));
    }

    #[test]
    fn test_email_identity() {
        let entry = LogEntry::from_observation(&Observation::Email(fixtures::email()));

        assert_eq!(entry.sender.as_deref(), Some("alice@example.com"));
        assert_eq!(entry.recipient.as_deref(), Some("bob@example.org"));
        assert_eq!(entry.source_ip, None);
        assert_eq!(entry.bytes, Some(4_096.0));
    }
}
