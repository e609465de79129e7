//! Shared test fixtures

use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, TimeZone, Utc};

use super::observation::{EmailMessage, NetworkFlow, PacketRecord, Protocol};

/// Wednesday 2024-01-10 14:30:00 UTC
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 14, 30, 0).unwrap()
}

pub fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

pub fn network_flow() -> NetworkFlow {
    NetworkFlow {
        timestamp: fixed_time(),
        source_ip: ip(1),
        destination_ip: ip(2),
        protocol: Protocol::Tcp,
        packet_size: 512.0,
        connection_duration: 2.5,
        port_number: 443,
        packets_sent: 20,
        packets_received: 18,
        bytes_sent: 10_240.0,
        bytes_received: 9_216.0,
        process: None,
    }
}

pub fn email() -> EmailMessage {
    EmailMessage {
        timestamp: fixed_time(),
        sender_email: "alice@example.com".to_string(),
        receiver_email: "bob@example.org".to_string(),
        num_recipients: 2,
        email_size: 4_096.0,
        has_attachment: false,
        num_attachments: 0,
        subject_length: 42,
        body_length: 800,
        is_reply: true,
        is_forward: false,
    }
}

pub fn packet(src: u8, dst: u8, bytes: u64, at: DateTime<Utc>) -> PacketRecord {
    PacketRecord {
        source_ip: ip(src),
        destination_ip: ip(dst),
        source_port: Some(50_000),
        destination_port: Some(443),
        protocol: Protocol::Tcp,
        bytes,
        packets: 1,
        process: None,
        timestamp: Some(at),
    }
}

/// Same connection seen from the responder side
pub fn reply_packet(src: u8, dst: u8, bytes: u64, at: DateTime<Utc>) -> PacketRecord {
    PacketRecord {
        source_port: Some(443),
        destination_port: Some(50_000),
        ..packet(src, dst, bytes, at)
    }
}

/// Route `log` output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
