//! Threshold Mapping
//!
//! Ngưỡng được định nghĩa trên decision function (`raw - offset`).
//! Anomaly score `1 / (1 + exp(raw))` giảm đơn điệu theo raw, nên ngưỡng
//! tương đương trên score là `1 / (1 + exp(threshold + offset))`:
//!
//! `decision < threshold  <=>  anomaly_score > score_threshold`

use serde::{Deserialize, Serialize};

/// Map a raw isolation score (lower = more anomalous) to 0..1 (higher = more anomalous)
pub fn anomaly_score(raw_score: f64) -> f64 {
    1.0 / (1.0 + raw_score.exp())
}

/// Per-model threshold in both representations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Threshold on the decision function
    pub decision_threshold: f64,
    /// Equivalent threshold on the transformed anomaly score
    pub score_threshold: f64,
}

impl ThresholdConfig {
    pub fn new(decision_threshold: f64, offset: f64) -> Self {
        Self {
            decision_threshold,
            score_threshold: anomaly_score(decision_threshold + offset),
        }
    }

    pub fn is_anomaly(&self, decision: f64) -> bool {
        decision < self.decision_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_score_range() {
        for raw in [-1.0, -0.75, -0.5, -0.25, -1e-9] {
            let score = anomaly_score(raw);
            assert!(score > 0.5 && score < 1.0, "raw {} -> {}", raw, score);
        }
        assert!(anomaly_score(-0.9) > anomaly_score(-0.4));
    }

    #[test]
    fn test_representations_agree() {
        let offset = -0.55;
        let threshold = ThresholdConfig::new(-0.1, offset);

        for raw in [-0.95, -0.7, -0.66, -0.64, -0.5, -0.3] {
            let decision = raw - offset;
            let by_decision = threshold.is_anomaly(decision);
            let by_score = anomaly_score(raw) > threshold.score_threshold;
            assert_eq!(by_decision, by_score, "disagree at raw {}", raw);
        }
    }
}
