//! Verdict record + fallback-confidence policy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::severity::Severity;
use crate::logic::model::ScoreResult;
use crate::logic::observation::Domain;
use crate::logic::threat::{Classification, ClassificationMethod};

/// Final decision for one observation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub domain: Domain,
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    pub threat_class: Option<String>,
    pub confidence: f64,
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classified_by: Option<ClassificationMethod>,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

/// Compose scorer and classifier output.
///
/// - not anomalous → no threat class, confidence = anomaly score
/// - anomalous with a label → classifier confidence
/// - anomalous without a label → confidence = anomaly score
pub fn decide(
    score: &ScoreResult,
    classification: Option<&Classification>,
    details: String,
    timestamp: DateTime<Utc>,
) -> VerdictRecord {
    let labelled = classification
        .filter(|_| score.is_anomaly)
        .and_then(|c| c.threat_class.as_ref().map(|label| (label.clone(), c.confidence)));

    let (threat_class, confidence) = match labelled {
        Some((label, confidence)) => (Some(label), confidence),
        None => (None, score.anomaly_score),
    };

    VerdictRecord {
        domain: score.domain,
        is_anomaly: score.is_anomaly,
        anomaly_score: score.anomaly_score,
        threat_class,
        confidence,
        severity: score
            .is_anomaly
            .then(|| Severity::from_score(score.anomaly_score)),
        classified_by: classification.filter(|_| score.is_anomaly).map(|c| c.method),
        timestamp,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(anomaly_score: f64, is_anomaly: bool) -> ScoreResult {
        ScoreResult {
            domain: Domain::Network,
            raw_score: -0.7,
            decision: if is_anomaly { -0.2 } else { 0.1 },
            anomaly_score,
            is_anomaly,
            threshold: -0.1,
            score_threshold: 0.65,
        }
    }

    #[test]
    fn test_normal_verdict_uses_score_as_confidence() {
        // Even a stray classification is ignored for normal observations
        let stray = Classification::from_rule("ddos", 0.85);
        let verdict = decide(&score(0.55, false), Some(&stray), "x".into(), Utc::now());

        assert!(!verdict.is_anomaly);
        assert_eq!(verdict.threat_class, None);
        assert_eq!(verdict.confidence, 0.55);
        assert_eq!(verdict.severity, None);
        assert_eq!(verdict.classified_by, None);
    }

    #[test]
    fn test_labelled_anomaly_uses_classifier_confidence() {
        let c = Classification::from_rule("port_scan", 0.75);
        let verdict = decide(&score(0.82, true), Some(&c), "x".into(), Utc::now());

        assert_eq!(verdict.threat_class.as_deref(), Some("port_scan"));
        assert_eq!(verdict.confidence, 0.75);
        assert_eq!(verdict.severity, Some(Severity::Critical));
        assert_eq!(verdict.classified_by, Some(ClassificationMethod::Rules));
    }

    #[test]
    fn test_unlabelled_anomaly_uses_score() {
        let c = Classification::from_model("normal", 0.99);
        let verdict = decide(&score(0.7, true), Some(&c), "x".into(), Utc::now());

        assert_eq!(verdict.threat_class, None);
        assert_eq!(verdict.confidence, 0.7);
        assert_eq!(verdict.severity, Some(Severity::High));

        let verdict = decide(&score(0.7, true), None, "x".into(), Utc::now());
        assert_eq!(verdict.confidence, 0.7);
    }
}
