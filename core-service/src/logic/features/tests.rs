//! Feature extraction tests across both domains

use crate::logic::features::layout::{email_index, network_index, FEATURE_COUNT};
use crate::logic::features::{extract, FeatureSource};
use crate::logic::fixtures;
use crate::logic::observation::{Domain, Observation, Protocol};

#[test]
fn test_network_vector_order() {
    let flow = fixtures::network_flow();
    let vector = flow.features();

    assert_eq!(vector.domain(), Domain::Network);
    assert_eq!(vector.as_slice().len(), FEATURE_COUNT);
    assert_eq!(vector.get(network_index::PACKET_SIZE), 512.0);
    assert_eq!(vector.get(network_index::CONNECTION_DURATION), 2.5);
    assert_eq!(vector.get(network_index::PORT_NUMBER), 443.0);
    assert_eq!(vector.get(network_index::PACKETS_SENT), 20.0);
    assert_eq!(vector.get(network_index::PACKETS_RECEIVED), 18.0);
    assert_eq!(vector.get(network_index::BYTES_SENT), 10_240.0);
    assert_eq!(vector.get(network_index::BYTES_RECEIVED), 9_216.0);
    assert_eq!(vector.get(network_index::HOUR), 14.0);
    assert_eq!(vector.get(network_index::WEEKDAY), 2.0); // Wednesday
    assert_eq!(vector.get(network_index::IS_TCP), 1.0);
    assert_eq!(vector.get(network_index::IS_UDP), 0.0);
}

#[test]
fn test_protocol_one_hot() {
    let mut flow = fixtures::network_flow();

    flow.protocol = Protocol::Udp;
    let udp = flow.features();
    assert_eq!(udp.get(network_index::IS_TCP), 0.0);
    assert_eq!(udp.get(network_index::IS_UDP), 1.0);

    flow.protocol = Protocol::Other;
    let other = flow.features();
    assert_eq!(other.get(network_index::IS_TCP), 0.0);
    assert_eq!(other.get(network_index::IS_UDP), 0.0);
}

#[test]
fn test_email_vector_order() {
    let email = fixtures::email();
    let vector = email.features();

    assert_eq!(vector.domain(), Domain::Email);
    assert_eq!(vector.get(email_index::NUM_RECIPIENTS), 2.0);
    assert_eq!(vector.get(email_index::EMAIL_SIZE), 4_096.0);
    assert_eq!(vector.get(email_index::HAS_ATTACHMENT), 0.0);
    assert_eq!(vector.get(email_index::SUBJECT_LENGTH), 42.0);
    assert_eq!(vector.get(email_index::BODY_LENGTH), 800.0);
    assert_eq!(vector.get(email_index::IS_REPLY), 1.0);
    assert_eq!(vector.get(email_index::IS_FORWARD), 0.0);
    assert_eq!(vector.get(email_index::HOUR), 14.0);
    assert_eq!(vector.get(email_index::WEEKDAY), 2.0);
    assert_eq!(vector.get(email_index::SENDER_DOMAIN_LENGTH), "example.com".len() as f64);
}

#[test]
fn test_missing_sender_domain_is_zero() {
    let mut email = fixtures::email();
    email.sender_email = "localuser".to_string();

    let vector = email.features();
    assert_eq!(vector.get(email_index::SENDER_DOMAIN_LENGTH), 0.0);
}

#[test]
fn test_extract_is_deterministic() {
    let observation = Observation::Email(fixtures::email());

    let first = extract(&observation);
    let second = extract(&observation);

    assert_eq!(first, second);
    assert!(first.validate().is_ok());
}

#[test]
fn test_get_by_name() {
    let vector = fixtures::network_flow().features();
    assert_eq!(vector.get_by_name("port_number"), Some(443.0));
    assert_eq!(vector.get_by_name("subject_length"), None);
}
