//! Network Feature Extraction
//!
//! Trích xuất 11 features từ một connection-level NetworkFlow.

use super::layout::{network_index as idx, FEATURE_COUNT};
use super::vector::{FeatureSource, FeatureVector};
use super::{hour_of_day, weekday};
use crate::constants::EPSILON;
use crate::logic::observation::{Domain, NetworkFlow, Protocol};

/// Average packet size, guarded against zero packets
pub fn avg_packet_size(bytes: f64, packets: f64) -> f64 {
    bytes / (packets + EPSILON)
}

impl FeatureSource for NetworkFlow {
    const DOMAIN: Domain = Domain::Network;

    fn features(&self) -> FeatureVector {
        let mut values = [0.0f64; FEATURE_COUNT];

        values[idx::PACKET_SIZE] = self.packet_size;
        values[idx::CONNECTION_DURATION] = self.connection_duration;
        values[idx::PORT_NUMBER] = self.port_number as f64;
        values[idx::PACKETS_SENT] = self.packets_sent as f64;
        values[idx::PACKETS_RECEIVED] = self.packets_received as f64;
        values[idx::BYTES_SENT] = self.bytes_sent;
        values[idx::BYTES_RECEIVED] = self.bytes_received;
        values[idx::HOUR] = hour_of_day(&self.timestamp);
        values[idx::WEEKDAY] = weekday(&self.timestamp);
        values[idx::IS_TCP] = if self.protocol == Protocol::Tcp { 1.0 } else { 0.0 };
        values[idx::IS_UDP] = if self.protocol == Protocol::Udp { 1.0 } else { 0.0 };

        FeatureVector::from_values(Domain::Network, values)
    }
}
