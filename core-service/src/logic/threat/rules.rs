//! Fallback Classification Rules
//!
//! Bảng rule có thứ tự cho từng domain, rule đầu tiên match sẽ thắng.
//! Dùng khi không có ONNX classifier hoặc inference lỗi. Không bao giờ fail.

use super::types::Classification;
use crate::logic::features::layout::{email_index as email, network_index as net};
use crate::logic::features::FeatureVector;
use crate::logic::observation::Domain;

// ============================================================================
// THRESHOLDS
// ============================================================================

pub const DDOS_MIN_PACKETS_SENT: f64 = 500.0;
pub const DDOS_MAX_PACKETS_RECEIVED: f64 = 100.0;
pub const PRIVILEGED_PORT_LIMIT: f64 = 1024.0;
pub const COMMON_SERVICE_PORTS: [f64; 4] = [80.0, 443.0, 22.0, 21.0];
pub const EXFILTRATION_MIN_BYTES_SENT: f64 = 100_000.0;

pub const PHISHING_MAX_SUBJECT_LENGTH: f64 = 30.0;
pub const SPAM_MIN_RECIPIENTS: f64 = 50.0;
pub const LEAKAGE_MIN_EMAIL_SIZE: f64 = 10_000.0;
pub const LEAKAGE_MIN_ATTACHMENTS: f64 = 3.0;
pub const MALWARE_MAX_EMAIL_SIZE: f64 = 500.0;

// ============================================================================
// RULE TABLES
// ============================================================================

pub struct Rule {
    pub label: &'static str,
    pub confidence: f64,
    pub matches: fn(&FeatureVector) -> bool,
}

fn is_ddos(f: &FeatureVector) -> bool {
    f.get(net::PACKETS_SENT) > DDOS_MIN_PACKETS_SENT
        && f.get(net::PACKETS_RECEIVED) < DDOS_MAX_PACKETS_RECEIVED
}

fn is_port_scan(f: &FeatureVector) -> bool {
    let port = f.get(net::PORT_NUMBER);
    port < PRIVILEGED_PORT_LIMIT && !COMMON_SERVICE_PORTS.contains(&port)
}

fn is_exfiltration(f: &FeatureVector) -> bool {
    f.get(net::BYTES_SENT) > EXFILTRATION_MIN_BYTES_SENT
}

fn is_phishing(f: &FeatureVector) -> bool {
    f.get(email::SUBJECT_LENGTH) < PHISHING_MAX_SUBJECT_LENGTH
        && f.get(email::HAS_ATTACHMENT) > 0.0
        && f.get(email::NUM_RECIPIENTS) == 1.0
}

fn is_spam(f: &FeatureVector) -> bool {
    f.get(email::NUM_RECIPIENTS) > SPAM_MIN_RECIPIENTS
}

fn is_data_leakage(f: &FeatureVector) -> bool {
    f.get(email::EMAIL_SIZE) > LEAKAGE_MIN_EMAIL_SIZE
        && f.get(email::NUM_ATTACHMENTS) > LEAKAGE_MIN_ATTACHMENTS
}

fn is_malware(f: &FeatureVector) -> bool {
    f.get(email::NUM_ATTACHMENTS) > 0.0 && f.get(email::EMAIL_SIZE) < MALWARE_MAX_EMAIL_SIZE
}

pub const NETWORK_RULES: &[Rule] = &[
    Rule { label: "ddos", confidence: 0.85, matches: is_ddos },
    Rule { label: "port_scan", confidence: 0.75, matches: is_port_scan },
    Rule { label: "data_exfiltration", confidence: 0.80, matches: is_exfiltration },
];

pub const NETWORK_DEFAULT: (&str, f64) = ("suspicious", 0.70);

pub const EMAIL_RULES: &[Rule] = &[
    Rule { label: "phishing", confidence: 0.80, matches: is_phishing },
    Rule { label: "spam", confidence: 0.85, matches: is_spam },
    Rule { label: "data_leakage", confidence: 0.90, matches: is_data_leakage },
    Rule { label: "malware", confidence: 0.75, matches: is_malware },
];

pub const EMAIL_DEFAULT: (&str, f64) = ("suspicious_email", 0.70);

/// Evaluate the domain's rule table, first match wins
pub fn classify_by_rules(features: &FeatureVector) -> Classification {
    let (rules, default) = match features.domain() {
        Domain::Network => (NETWORK_RULES, NETWORK_DEFAULT),
        Domain::Email => (EMAIL_RULES, EMAIL_DEFAULT),
    };

    rules
        .iter()
        .find(|rule| (rule.matches)(features))
        .map(|rule| Classification::from_rule(rule.label, rule.confidence))
        .unwrap_or_else(|| Classification::from_rule(default.0, default.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::features::FEATURE_COUNT;

    fn network(set: &[(usize, f64)]) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        values[net::PORT_NUMBER] = 443.0;
        for (i, v) in set {
            values[*i] = *v;
        }
        FeatureVector::from_values(Domain::Network, values)
    }

    fn email(set: &[(usize, f64)]) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        values[email::SUBJECT_LENGTH] = 60.0;
        values[email::EMAIL_SIZE] = 2_000.0;
        values[email::NUM_RECIPIENTS] = 3.0;
        for (i, v) in set {
            values[*i] = *v;
        }
        FeatureVector::from_values(Domain::Email, values)
    }

    #[test]
    fn test_ddos_takes_precedence() {
        // Matches ddos, port_scan and exfiltration at once
        let f = network(&[
            (net::PACKETS_SENT, 1000.0),
            (net::PACKETS_RECEIVED, 10.0),
            (net::PORT_NUMBER, 53.0),
            (net::BYTES_SENT, 500_000.0),
        ]);
        let c = classify_by_rules(&f);
        assert_eq!(c.threat_class.as_deref(), Some("ddos"));
        assert_eq!(c.confidence, 0.85);
    }

    #[test]
    fn test_network_rules_in_order() {
        let scan = classify_by_rules(&network(&[(net::PORT_NUMBER, 135.0), (net::BYTES_SENT, 500_000.0)]));
        assert_eq!(scan.threat_class.as_deref(), Some("port_scan"));

        let ssh = classify_by_rules(&network(&[(net::PORT_NUMBER, 22.0)]));
        assert_eq!(ssh.threat_class.as_deref(), Some("suspicious"));
        assert_eq!(ssh.confidence, 0.70);

        let exfil = classify_by_rules(&network(&[(net::BYTES_SENT, 200_000.0)]));
        assert_eq!(exfil.threat_class.as_deref(), Some("data_exfiltration"));
        assert_eq!(exfil.confidence, 0.80);

        // High port with nothing else is generic
        let high = classify_by_rules(&network(&[(net::PORT_NUMBER, 8080.0)]));
        assert_eq!(high.threat_class.as_deref(), Some("suspicious"));
    }

    #[test]
    fn test_email_rules_in_order() {
        let phishing = classify_by_rules(&email(&[
            (email::SUBJECT_LENGTH, 12.0),
            (email::HAS_ATTACHMENT, 1.0),
            (email::NUM_RECIPIENTS, 1.0),
            (email::NUM_ATTACHMENTS, 1.0),
            (email::EMAIL_SIZE, 200.0),
        ]));
        assert_eq!(phishing.threat_class.as_deref(), Some("phishing"));

        let spam = classify_by_rules(&email(&[(email::NUM_RECIPIENTS, 120.0)]));
        assert_eq!(spam.threat_class.as_deref(), Some("spam"));
        assert_eq!(spam.confidence, 0.85);

        let leakage = classify_by_rules(&email(&[
            (email::EMAIL_SIZE, 50_000.0),
            (email::NUM_ATTACHMENTS, 5.0),
        ]));
        assert_eq!(leakage.threat_class.as_deref(), Some("data_leakage"));
        assert_eq!(leakage.confidence, 0.90);

        let malware = classify_by_rules(&email(&[
            (email::EMAIL_SIZE, 300.0),
            (email::NUM_ATTACHMENTS, 1.0),
        ]));
        assert_eq!(malware.threat_class.as_deref(), Some("malware"));

        let other = classify_by_rules(&email(&[]));
        assert_eq!(other.threat_class.as_deref(), Some("suspicious_email"));
        assert_eq!(other.confidence, 0.70);
    }
}
