//! Threat Types
//!
//! Core types cho threat classification.
//! KHÔNG chứa logic - chỉ data structures.

use serde::{Deserialize, Serialize};

/// How a classification was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMethod {
    /// Pre-trained ONNX classifier
    Model,
    /// Ordered rule table
    Rules,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::Model => "model",
            ClassificationMethod::Rules => "rules",
        }
    }
}

/// Classifier output for one anomalous observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Threat category, `None` when the model says the traffic is normal
    pub threat_class: Option<String>,
    /// 0.0 - 1.0
    pub confidence: f64,
    pub method: ClassificationMethod,
}

impl Classification {
    pub fn from_rule(label: &str, confidence: f64) -> Self {
        Self {
            threat_class: Some(label.to_string()),
            confidence,
            method: ClassificationMethod::Rules,
        }
    }

    pub fn from_model(label: &str, confidence: f64) -> Self {
        Self {
            threat_class: normalize_label(label),
            confidence,
            method: ClassificationMethod::Model,
        }
    }
}

/// Labels meaning "no threat" collapse to `None`
pub fn normalize_label(label: &str) -> Option<String> {
    let trimmed = label.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "normal" | "benign" => None,
        _ => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_labels_are_not_threats() {
        assert_eq!(normalize_label("normal"), None);
        assert_eq!(normalize_label("Benign "), None);
        assert_eq!(normalize_label("ddos"), Some("ddos".to_string()));

        let c = Classification::from_model("normal", 0.93);
        assert!(c.threat_class.is_none());
        assert_eq!(c.method, ClassificationMethod::Model);
    }
}
