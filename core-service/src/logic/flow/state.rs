//! Flow state - aggregate statistics cho một connection đang sống

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::key::FlowKey;
use crate::constants::EPSILON;
use crate::logic::features::avg_packet_size;
use crate::logic::observation::{NetworkFlow, PacketRecord};

// ============================================================================
// FLOW STATE
// ============================================================================

/// Mutable aggregate owned by the aggregator.
///
/// `initiator` keeps the orientation of the first packet: traffic from the
/// initiator counts as sent, traffic towards it as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowState {
    pub initiator: FlowKey,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub min_packet_size: f64,
    pub max_packet_size: f64,
    /// Welford running moments over per-record packet sizes
    pub mean_packet_size: f64,
    m2: f64,
    samples: u64,
    pub process: Option<String>,
}

impl FlowState {
    pub fn new(initiator: FlowKey, at: DateTime<Utc>) -> Self {
        Self {
            initiator,
            packets_sent: 0,
            packets_received: 0,
            bytes_sent: 0,
            bytes_received: 0,
            first_seen: at,
            last_seen: at,
            min_packet_size: f64::INFINITY,
            max_packet_size: 0.0,
            mean_packet_size: 0.0,
            m2: 0.0,
            samples: 0,
            process: None,
        }
    }

    /// Fold one packet record into the aggregate
    pub fn update(&mut self, packet: &PacketRecord, at: DateTime<Utc>) {
        let key = FlowKey::from_packet(packet);

        if key == self.initiator {
            self.packets_sent = self.packets_sent.saturating_add(packet.packets);
            self.bytes_sent = self.bytes_sent.saturating_add(packet.bytes);
        } else {
            self.packets_received = self.packets_received.saturating_add(packet.packets);
            self.bytes_received = self.bytes_received.saturating_add(packet.bytes);
        }

        // last_seen chỉ tăng, packet đến trễ không kéo lùi
        if at > self.last_seen {
            self.last_seen = at;
        }
        if at < self.first_seen {
            self.first_seen = at;
        }

        let size = avg_packet_size(packet.bytes as f64, packet.packets as f64);
        self.min_packet_size = self.min_packet_size.min(size);
        self.max_packet_size = self.max_packet_size.max(size);

        self.samples += 1;
        let delta = size - self.mean_packet_size;
        self.mean_packet_size += delta / self.samples as f64;
        self.m2 += delta * (size - self.mean_packet_size);

        if self.process.is_none() {
            self.process = packet.process.clone();
        }
    }

    pub fn total_packets(&self) -> u64 {
        self.packets_sent.saturating_add(self.packets_received)
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_sent.saturating_add(self.bytes_received)
    }

    /// Population variance of packet size (0 with fewer than two samples)
    pub fn packet_size_variance(&self) -> f64 {
        if self.samples < 2 {
            0.0
        } else {
            self.m2 / self.samples as f64
        }
    }

    pub fn packet_size_std(&self) -> f64 {
        self.packet_size_variance().sqrt()
    }

    /// Seconds between first and last packet
    pub fn duration_secs(&self) -> f64 {
        let millis = (self.last_seen - self.first_seen).num_milliseconds().max(0);
        millis as f64 / 1000.0
    }

    /// True when the flow has been idle longer than `timeout_secs`
    pub fn is_expired(&self, now: DateTime<Utc>, timeout_secs: u64) -> bool {
        let idle = (now - self.last_seen).num_milliseconds();
        idle > (timeout_secs as i64).saturating_mul(1000)
    }
}

// ============================================================================
// FINALIZED FLOW
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    PacketThreshold,
    InactivityTimeout,
    Shutdown,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::PacketThreshold => "packet_threshold",
            CloseReason::InactivityTimeout => "inactivity_timeout",
            CloseReason::Shutdown => "shutdown",
        }
    }
}

/// A flow removed from the table, ready for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedFlow {
    pub state: FlowState,
    pub reason: CloseReason,
}

impl FinalizedFlow {
    pub fn new(state: FlowState, reason: CloseReason) -> Self {
        Self { state, reason }
    }

    pub fn key(&self) -> &FlowKey {
        &self.state.initiator
    }

    pub fn duration_secs(&self) -> f64 {
        self.state.duration_secs()
    }

    pub fn bytes_per_second(&self) -> f64 {
        self.state.total_bytes() as f64 / (self.duration_secs() + EPSILON)
    }

    pub fn packets_per_second(&self) -> f64 {
        self.state.total_packets() as f64 / (self.duration_secs() + EPSILON)
    }

    /// One-line description stored with the flow's log row
    pub fn summary(&self) -> String {
        let state = &self.state;
        format!(
            "Flow {} closed by {}: {} packets, {} bytes in {:.3}s ({:.1} B/s, {:.1} pkt/s), \
             packet size {:.1}±{:.1} [{:.1}, {:.1}]",
            state.initiator,
            self.reason.as_str(),
            state.total_packets(),
            state.total_bytes(),
            self.duration_secs(),
            self.bytes_per_second(),
            self.packets_per_second(),
            state.mean_packet_size,
            state.packet_size_std(),
            state.min_packet_size,
            state.max_packet_size,
        )
    }

    /// Connection-level observation for the network scorer
    pub fn to_network_flow(&self) -> NetworkFlow {
        let state = &self.state;
        NetworkFlow {
            timestamp: state.first_seen,
            source_ip: state.initiator.source_ip,
            destination_ip: state.initiator.destination_ip,
            protocol: state.initiator.protocol,
            packet_size: avg_packet_size(state.total_bytes() as f64, state.total_packets() as f64),
            connection_duration: self.duration_secs(),
            port_number: state.initiator.destination_port,
            packets_sent: state.packets_sent,
            packets_received: state.packets_received,
            bytes_sent: state.bytes_sent as f64,
            bytes_received: state.bytes_received as f64,
            process: state.process.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::fixtures;

    #[test]
    fn test_welford_moments() {
        let now = fixtures::fixed_time();
        let first = fixtures::packet(1, 2, 100, now);
        let mut state = FlowState::new(FlowKey::from_packet(&first), now);

        for bytes in [100, 200, 300] {
            state.update(&fixtures::packet(1, 2, bytes, now), now);
        }

        assert!((state.mean_packet_size - 200.0).abs() < 1e-3);
        // Population variance of 100/200/300
        assert!((state.packet_size_variance() - 6666.666).abs() < 1.0);
        assert!((state.min_packet_size - 100.0).abs() < 1e-3);
        assert!((state.max_packet_size - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_last_seen_never_moves_back() {
        let now = fixtures::fixed_time();
        let later = now + chrono::Duration::seconds(5);
        let first = fixtures::packet(1, 2, 100, now);
        let mut state = FlowState::new(FlowKey::from_packet(&first), now);

        state.update(&fixtures::packet(1, 2, 100, later), later);
        state.update(&fixtures::packet(1, 2, 100, now), now);

        assert_eq!(state.last_seen, later);
        assert!((state.duration_secs() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_counters_saturate() {
        let now = fixtures::fixed_time();
        let first = fixtures::packet(1, 2, u64::MAX, now);
        let mut state = FlowState::new(FlowKey::from_packet(&first), now);

        state.update(&first, now);
        state.update(&first, now);
        state.update(&fixtures::reply_packet(2, 1, u64::MAX, now), now);

        assert_eq!(state.bytes_sent, u64::MAX);
        assert_eq!(state.total_bytes(), u64::MAX);
        assert_eq!(state.total_packets(), 3);
        assert!(state.mean_packet_size.is_finite());
    }

    #[test]
    fn test_summary_reports_size_spread() {
        let now = fixtures::fixed_time();
        let later = now + chrono::Duration::seconds(2);
        let first = fixtures::packet(1, 2, 100, now);
        let mut state = FlowState::new(FlowKey::from_packet(&first), now);
        state.update(&first, now);
        state.update(&fixtures::reply_packet(2, 1, 300, later), later);

        let summary = FinalizedFlow::new(state, CloseReason::InactivityTimeout).summary();

        assert!(summary.starts_with("Flow 10.0.0.1:50000 -> 10.0.0.2:443 (TCP) closed by inactivity_timeout"));
        assert!(summary.contains("2 packets, 400 bytes in 2.000s"));
        assert!(summary.contains("packet size 200.0±100.0 [100.0, 300.0]"));
    }

    #[test]
    fn test_expiry_is_strictly_greater_than_timeout() {
        let now = fixtures::fixed_time();
        let state = FlowState::new(FlowKey::from_packet(&fixtures::packet(1, 2, 1, now)), now);

        assert!(!state.is_expired(now + chrono::Duration::seconds(60), 60));
        assert!(state.is_expired(now + chrono::Duration::seconds(61), 60));
    }
}
