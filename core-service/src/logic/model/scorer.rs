//! Anomaly Scorer
//!
//! Giữ một `Arc<OutlierModel>` snapshot cho mỗi domain. Scoring clone Arc
//! rồi tính ngoài lock; `/train` swap model mới vào atomically.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ndarray::{Array1, ArrayView1};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::isolation_forest::IsolationForest;
use super::scaler::StandardScaler;
use super::threshold::{anomaly_score, ThresholdConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::logic::config::ScorerConfig;
use crate::logic::features::{FeatureVector, LayoutInfo, FEATURE_COUNT};
use crate::logic::observation::Domain;

// ============================================================================
// SCORE RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub domain: Domain,
    /// Isolation forest `score_samples`, lower = more anomalous
    pub raw_score: f64,
    /// `raw_score - offset`
    pub decision: f64,
    /// 0..1, higher = more anomalous
    pub anomaly_score: f64,
    pub is_anomaly: bool,
    pub threshold: f64,
    pub score_threshold: f64,
}

// ============================================================================
// OUTLIER MODEL
// ============================================================================

/// Trained scaler + forest for one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierModel {
    pub domain: Domain,
    pub layout: LayoutInfo,
    pub scaler: StandardScaler,
    pub forest: IsolationForest,
    pub trained_on: usize,
    pub trained_at: DateTime<Utc>,
}

impl OutlierModel {
    pub fn raw_score(&self, features: &FeatureVector) -> f64 {
        let scaled = Array1::from(self.scaler.transform_row(ArrayView1::from(features.as_slice())));
        self.forest.score_sample(scaled.view())
    }

    pub fn score(&self, features: &FeatureVector, decision_threshold: f64) -> ScoreResult {
        let threshold = ThresholdConfig::new(decision_threshold, self.forest.offset);
        let raw_score = self.raw_score(features);
        let decision = raw_score - self.forest.offset;

        ScoreResult {
            domain: self.domain,
            raw_score,
            decision,
            anomaly_score: anomaly_score(raw_score),
            is_anomaly: threshold.is_anomaly(decision),
            threshold: threshold.decision_threshold,
            score_threshold: threshold.score_threshold,
        }
    }

    /// Consistency checks for a model read from disk
    pub fn check(&self) -> Result<(), String> {
        if self.layout.domain != self.domain {
            return Err(format!(
                "artifact layout is for {}, expected {}",
                self.layout.domain, self.domain
            ));
        }
        self.layout.validate().map_err(|e| e.to_string())?;
        self.scaler.check(FEATURE_COUNT)?;
        self.forest.check(FEATURE_COUNT)?;
        Ok(())
    }
}

// ============================================================================
// SCORER
// ============================================================================

pub struct AnomalyScorer {
    network: RwLock<Option<Arc<OutlierModel>>>,
    email: RwLock<Option<Arc<OutlierModel>>>,
    config: ScorerConfig,
}

impl AnomalyScorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self {
            network: RwLock::new(None),
            email: RwLock::new(None),
            config,
        }
    }

    fn slot(&self, domain: Domain) -> &RwLock<Option<Arc<OutlierModel>>> {
        match domain {
            Domain::Network => &self.network,
            Domain::Email => &self.email,
        }
    }

    /// Swap in a model for its domain
    pub fn install(&self, model: Arc<OutlierModel>) {
        let domain = model.domain;
        *self.slot(domain).write() = Some(model);
        log::info!("{} detector installed", domain);
    }

    pub fn model(&self, domain: Domain) -> Option<Arc<OutlierModel>> {
        self.slot(domain).read().clone()
    }

    pub fn is_ready(&self, domain: Domain) -> bool {
        self.slot(domain).read().is_some()
    }

    pub fn decision_threshold(&self, domain: Domain) -> f64 {
        self.config.threshold(domain)
    }

    /// Both threshold representations for the loaded model
    pub fn threshold(&self, domain: Domain) -> PipelineResult<ThresholdConfig> {
        let model = self.model(domain).ok_or(PipelineError::ModelNotReady(domain))?;
        Ok(ThresholdConfig::new(self.decision_threshold(domain), model.forest.offset))
    }

    pub fn score(&self, features: &FeatureVector) -> PipelineResult<ScoreResult> {
        let domain = features.domain();
        let model = self.model(domain).ok_or(PipelineError::ModelNotReady(domain))?;

        features
            .validate()
            .map_err(|e| PipelineError::Validation(e.to_string()))?;

        Ok(model.score(features, self.decision_threshold(domain)))
    }
}

impl Default for AnomalyScorer {
    fn default() -> Self {
        Self::new(ScorerConfig::default())
    }
}
