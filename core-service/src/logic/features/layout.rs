//! Feature Layout - Centralized Feature Definition
//!
//! **CRITICAL: This file controls the feature schema of both domains**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! Persisted detectors store the layout hash they were trained on and are
//! refused at load when it differs.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::logic::observation::Domain;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 1;

/// Number of features per vector (same for both domains)
pub const FEATURE_COUNT: usize = 11;

// ============================================================================
// FEATURE LAYOUTS (Authoritative source)
// ============================================================================

pub const NETWORK_LAYOUT: [&str; FEATURE_COUNT] = [
    "packet_size",         // 0: Average bytes per packet
    "connection_duration", // 1: Seconds between first and last packet
    "port_number",         // 2: Destination port
    "packets_sent",        // 3
    "packets_received",    // 4
    "bytes_sent",          // 5
    "bytes_received",      // 6
    "hour",                // 7: Hour of day (UTC)
    "weekday",             // 8: Monday = 0
    "is_tcp",              // 9: One-hot protocol
    "is_udp",              // 10
];

pub const EMAIL_LAYOUT: [&str; FEATURE_COUNT] = [
    "num_recipients",       // 0
    "email_size",           // 1
    "has_attachment",       // 2: 0/1
    "num_attachments",      // 3
    "subject_length",       // 4
    "body_length",          // 5
    "is_reply",             // 6: 0/1
    "is_forward",           // 7: 0/1
    "hour",                 // 8
    "weekday",              // 9
    "sender_domain_length", // 10
];

/// Indices into the network vector
pub mod network_index {
    pub const PACKET_SIZE: usize = 0;
    pub const CONNECTION_DURATION: usize = 1;
    pub const PORT_NUMBER: usize = 2;
    pub const PACKETS_SENT: usize = 3;
    pub const PACKETS_RECEIVED: usize = 4;
    pub const BYTES_SENT: usize = 5;
    pub const BYTES_RECEIVED: usize = 6;
    pub const HOUR: usize = 7;
    pub const WEEKDAY: usize = 8;
    pub const IS_TCP: usize = 9;
    pub const IS_UDP: usize = 10;
}

/// Indices into the email vector
pub mod email_index {
    pub const NUM_RECIPIENTS: usize = 0;
    pub const EMAIL_SIZE: usize = 1;
    pub const HAS_ATTACHMENT: usize = 2;
    pub const NUM_ATTACHMENTS: usize = 3;
    pub const SUBJECT_LENGTH: usize = 4;
    pub const BODY_LENGTH: usize = 5;
    pub const IS_REPLY: usize = 6;
    pub const IS_FORWARD: usize = 7;
    pub const HOUR: usize = 8;
    pub const WEEKDAY: usize = 9;
    pub const SENDER_DOMAIN_LENGTH: usize = 10;
}

/// Feature names in vector order for a domain
pub fn layout(domain: Domain) -> &'static [&'static str; FEATURE_COUNT] {
    match domain {
        Domain::Network => &NETWORK_LAYOUT,
        Domain::Email => &EMAIL_LAYOUT,
    }
}

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over version, domain and the ordered feature names
pub fn compute_layout_hash(domain: Domain) -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);
    hasher.update(domain.as_str().as_bytes());
    hasher.update(&[0]);

    for name in layout(domain) {
        hasher.update(name.as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

pub fn layout_hash(domain: Domain) -> u32 {
    compute_layout_hash(domain)
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Layout description stored alongside trained artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub domain: Domain,
    pub version: u8,
    pub hash: u32,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current(domain: Domain) -> Self {
        Self {
            domain,
            version: FEATURE_VERSION,
            hash: layout_hash(domain),
            feature_names: layout(domain).iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.domain, self.version, self.hash)
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct LayoutMismatchError {
    pub domain: Domain,
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

impl std::fmt::Display for LayoutMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} feature layout mismatch: expected v{} (hash: {:08x}), got v{} (hash: {:08x})",
            self.domain,
            self.expected_version,
            self.expected_hash,
            self.actual_version,
            self.actual_hash
        )
    }
}

impl std::error::Error for LayoutMismatchError {}

pub fn validate_layout(domain: Domain, version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash(domain);

    if version != FEATURE_VERSION || hash != current_hash {
        return Err(LayoutMismatchError {
            domain,
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: version,
            actual_hash: hash,
        });
    }

    Ok(())
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

pub fn feature_index(domain: Domain, name: &str) -> Option<usize> {
    layout(domain).iter().position(|&n| n == name)
}

pub fn feature_name(domain: Domain, index: usize) -> Option<&'static str> {
    layout(domain).get(index).copied()
}
