//! Model Module - Unsupervised outlier scoring
//!
//! StandardScaler + IsolationForest cho từng domain, train qua `/train`,
//! persist dạng JSON, load lúc startup.
//!
//! - `scaler` / `isolation_forest`: the fitted model
//! - `threshold`: decision-function ↔ anomaly-score thresholds
//! - `scorer`: per-domain snapshots + `score()`
//! - `trainer`: fit from feature vectors
//! - `registry`: artifact files

pub mod scaler;
pub mod isolation_forest;
pub mod threshold;
pub mod scorer;
pub mod trainer;
pub mod registry;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

// Re-export common types
pub use isolation_forest::IsolationForest;
pub use registry::ModelRegistry;
pub use scaler::StandardScaler;
pub use scorer::{AnomalyScorer, OutlierModel, ScoreResult};
pub use threshold::{anomaly_score, ThresholdConfig};
pub use trainer::OutlierTrainer;

/// Which artifacts are currently loaded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub network_detector: bool,
    pub email_detector: bool,
    pub network_threat_classifier: bool,
    pub email_threat_classifier: bool,
}
