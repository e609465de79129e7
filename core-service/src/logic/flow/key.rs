//! Flow identity
//!
//! Hai chiều của cùng một conversation map về cùng một canonical key.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::logic::observation::{PacketRecord, Protocol};

/// 5-tuple flow identity. Missing ports are 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub source_ip: IpAddr,
    pub destination_ip: IpAddr,
    pub source_port: u16,
    pub destination_port: u16,
    pub protocol: Protocol,
}

impl FlowKey {
    /// Key oriented the way the packet travelled
    pub fn from_packet(packet: &PacketRecord) -> Self {
        Self {
            source_ip: packet.source_ip,
            destination_ip: packet.destination_ip,
            source_port: packet.source_port.unwrap_or(0),
            destination_port: packet.destination_port.unwrap_or(0),
            protocol: packet.protocol,
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            source_ip: self.destination_ip,
            destination_ip: self.source_ip,
            source_port: self.destination_port,
            destination_port: self.source_port,
            protocol: self.protocol,
        }
    }

    /// Direction-independent form: the lower (ip, port) endpoint comes first
    pub fn canonical(&self) -> Self {
        if (self.source_ip, self.source_port) <= (self.destination_ip, self.destination_port) {
            *self
        } else {
            self.reversed()
        }
    }

    /// True when `other` is this key or its reverse
    pub fn same_conversation(&self, other: &FlowKey) -> bool {
        self.canonical() == other.canonical()
    }

    /// Shard index derived from the canonical key
    pub fn shard(&self, shards: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        self.canonical().hash(&mut hasher);
        (hasher.finish() % shards.max(1) as u64) as usize
    }
}

impl std::fmt::Display for FlowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} ({})",
            self.source_ip, self.source_port, self.destination_ip, self.destination_port, self.protocol
        )
    }
}
