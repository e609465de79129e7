//! Observation Types
//!
//! Các record đầu vào từ collectors (packet sniffer, mailbox poller).
//! Immutable sau khi nhận - không chứa logic scoring.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::PipelineResult;
use crate::logic::features::avg_packet_size;

// ============================================================================
// DOMAIN
// ============================================================================

/// Observation domain - each domain has its own feature layout and models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Network,
    Email,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Network, Domain::Email];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Network => "network",
            Domain::Email => "email",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// PROTOCOL
// ============================================================================

/// Transport protocol. Parsed case-insensitively; anything unknown is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    Tcp,
    Udp,
    Other,
}

impl Protocol {
    /// IANA protocol number lookup (TCP=6, UDP=17, unknown=0)
    pub fn number(&self) -> u8 {
        match self {
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
            Protocol::Other => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Other => "OTHER",
        }
    }
}

impl From<String> for Protocol {
    fn from(value: String) -> Self {
        Protocol::from(value.as_str())
    }
}

impl From<&str> for Protocol {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "tcp" | "6" => Protocol::Tcp,
            "udp" | "17" => Protocol::Udp,
            _ => Protocol::Other,
        }
    }
}

impl From<Protocol> for String {
    fn from(value: Protocol) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// PACKET RECORD (collector input for flow aggregation)
// ============================================================================

fn default_packets() -> u64 {
    1
}

/// One packet (or pre-summarised burst) reported by a packet collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PacketRecord {
    #[serde(alias = "src_ip")]
    pub source_ip: IpAddr,
    #[serde(alias = "dst_ip")]
    pub destination_ip: IpAddr,
    #[serde(default, alias = "src_port")]
    pub source_port: Option<u16>,
    #[serde(default, alias = "dst_port")]
    pub destination_port: Option<u16>,
    pub protocol: Protocol,
    #[serde(alias = "byte_count")]
    pub bytes: u64,
    #[serde(default = "default_packets", alias = "packet_count")]
    #[validate(range(min = 1))]
    pub packets: u64,
    #[serde(default, alias = "process_name")]
    pub process: Option<String>,
    /// Capture time; arrival time is used when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PacketRecord {
    pub fn check(&self) -> PipelineResult<()> {
        self.validate()?;
        Ok(())
    }

    /// Connection summary for a record scored on its own, shaped like a
    /// one-record flow: everything counts as sent, duration 0.
    pub fn to_network_flow(&self, arrival: DateTime<Utc>) -> NetworkFlow {
        NetworkFlow {
            timestamp: self.timestamp.unwrap_or(arrival),
            source_ip: self.source_ip,
            destination_ip: self.destination_ip,
            protocol: self.protocol,
            packet_size: avg_packet_size(self.bytes as f64, self.packets as f64),
            connection_duration: 0.0,
            port_number: self.destination_port.unwrap_or(0),
            packets_sent: self.packets,
            packets_received: 0,
            bytes_sent: self.bytes as f64,
            bytes_received: 0.0,
            process: self.process.clone(),
        }
    }
}

// ============================================================================
// NETWORK FLOW (fully-featured network observation)
// ============================================================================

/// Connection-level network observation.
///
/// Produced by the flow aggregator or submitted directly by a collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct NetworkFlow {
    pub timestamp: DateTime<Utc>,
    pub source_ip: IpAddr,
    pub destination_ip: IpAddr,
    pub protocol: Protocol,
    #[validate(range(min = 0.0))]
    pub packet_size: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub connection_duration: f64,
    #[serde(default)]
    pub port_number: u16,
    pub packets_sent: u64,
    #[serde(default)]
    pub packets_received: u64,
    #[validate(range(min = 0.0))]
    pub bytes_sent: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub bytes_received: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
}

// ============================================================================
// EMAIL MESSAGE
// ============================================================================

/// Message-level email observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EmailMessage {
    pub timestamp: DateTime<Utc>,
    #[validate(length(min = 1))]
    pub sender_email: String,
    #[serde(default)]
    pub receiver_email: String,
    pub num_recipients: u32,
    #[validate(range(min = 0.0))]
    pub email_size: f64,
    #[serde(default)]
    pub has_attachment: bool,
    #[serde(default)]
    pub num_attachments: u32,
    #[serde(default)]
    pub subject_length: u32,
    #[serde(default)]
    pub body_length: u32,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default)]
    pub is_forward: bool,
}

impl EmailMessage {
    /// Domain part of the sender address (empty when there is no `@`)
    pub fn sender_domain(&self) -> &str {
        self.sender_email
            .split_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or("")
    }
}

// ============================================================================
// OBSERVATION
// ============================================================================

/// A scorable observation from either domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "record", rename_all = "lowercase")]
pub enum Observation {
    Network(NetworkFlow),
    Email(EmailMessage),
}

impl Observation {
    pub fn domain(&self) -> Domain {
        match self {
            Observation::Network(_) => Domain::Network,
            Observation::Email(_) => Domain::Email,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Observation::Network(flow) => flow.timestamp,
            Observation::Email(email) => email.timestamp,
        }
    }

    /// Reject malformed records before they reach the scorer
    pub fn check(&self) -> PipelineResult<()> {
        match self {
            Observation::Network(flow) => flow.validate()?,
            Observation::Email(email) => email.validate()?,
        }
        Ok(())
    }

    /// Human-readable summary for verdict details
    pub fn details(&self) -> String {
        match self {
            Observation::Network(flow) => format!(
                "Network traffic from {} to {}",
                flow.source_ip, flow.destination_ip
            ),
            Observation::Email(email) => format!(
                "Email from {} to {}",
                email.sender_email, email.receiver_email
            ),
        }
    }
}

impl From<NetworkFlow> for Observation {
    fn from(flow: NetworkFlow) -> Self {
        Observation::Network(flow)
    }
}

impl From<EmailMessage> for Observation {
    fn from(email: EmailMessage) -> Self {
        Observation::Email(email)
    }
}
