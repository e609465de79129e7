//! Pipeline Configuration
//!
//! Tham số cho flow aggregator, scorer và trainer. Server build config này
//! từ env vars rồi gọi `validate()` trước khi khởi tạo components.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_THRESHOLD, DEFAULT_CONTAMINATION, DEFAULT_DECISION_THRESHOLD, DEFAULT_FLOW_SHARDS,
    DEFAULT_INACTIVITY_TIMEOUT_SECS, DEFAULT_MAX_SAMPLES, DEFAULT_N_ESTIMATORS, DEFAULT_RANDOM_SEED,
    DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::error::{PipelineError, PipelineResult};
use crate::logic::observation::Domain;

// ============================================================================
// FLOW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Finalize once a flow has seen this many packets (both directions)
    pub batch_threshold: u64,
    pub inactivity_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub shards: usize,
    /// Finalize live flows when the sweeper stops
    pub flush_on_shutdown: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            batch_threshold: DEFAULT_BATCH_THRESHOLD,
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            shards: DEFAULT_FLOW_SHARDS,
            flush_on_shutdown: true,
        }
    }
}

impl FlowConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ============================================================================
// SCORER
// ============================================================================

/// Decision-function thresholds per domain (`raw - offset < threshold`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub network_threshold: f64,
    pub email_threshold: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            network_threshold: DEFAULT_DECISION_THRESHOLD,
            email_threshold: DEFAULT_DECISION_THRESHOLD,
        }
    }
}

impl ScorerConfig {
    pub fn threshold(&self, domain: Domain) -> f64 {
        match domain {
            Domain::Network => self.network_threshold,
            Domain::Email => self.email_threshold,
        }
    }
}

// ============================================================================
// TRAINING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: DEFAULT_N_ESTIMATORS,
            max_samples: DEFAULT_MAX_SAMPLES,
            contamination: DEFAULT_CONTAMINATION,
            seed: DEFAULT_RANDOM_SEED,
        }
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub flow: FlowConfig,
    pub scorer: ScorerConfig,
    pub training: TrainingConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        let flow = &self.flow;

        if flow.batch_threshold == 0 {
            return Err(PipelineError::Config("batch_threshold must be >= 1".into()));
        }
        if flow.shards == 0 {
            return Err(PipelineError::Config("shards must be >= 1".into()));
        }
        if flow.sweep_interval_secs == 0 {
            return Err(PipelineError::Config("sweep_interval_secs must be >= 1".into()));
        }
        // Sweeper phải chạy ít nhất 2 lần trong một timeout window
        if flow.sweep_interval_secs.saturating_mul(2) > flow.inactivity_timeout_secs {
            return Err(PipelineError::Config(format!(
                "sweep_interval_secs ({}) * 2 must not exceed inactivity_timeout_secs ({})",
                flow.sweep_interval_secs, flow.inactivity_timeout_secs
            )));
        }

        for threshold in [self.scorer.network_threshold, self.scorer.email_threshold] {
            if !threshold.is_finite() {
                return Err(PipelineError::Config("scorer thresholds must be finite".into()));
            }
        }

        let training = &self.training;
        if training.n_estimators == 0 || training.max_samples < 2 {
            return Err(PipelineError::Config(
                "n_estimators must be >= 1 and max_samples >= 2".into(),
            ));
        }
        if !(training.contamination > 0.0 && training.contamination <= 0.5) {
            return Err(PipelineError::Config(format!(
                "contamination must be in (0, 0.5], got {}",
                training.contamination
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.flow.batch_threshold, 10);
        assert_eq!(config.scorer.threshold(Domain::Email), -0.1);
    }

    #[test]
    fn test_sweep_interval_must_fit_timeout() {
        let mut config = PipelineConfig::default();
        config.flow.inactivity_timeout_secs = 20;
        config.flow.sweep_interval_secs = 15;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));

        config.flow.sweep_interval_secs = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_threshold_and_bad_contamination() {
        let mut config = PipelineConfig::default();
        config.flow.batch_threshold = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.training.contamination = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"flow": {"batch_threshold": 4}}"#).unwrap();
        assert_eq!(config.flow.batch_threshold, 4);
        assert_eq!(config.flow.shards, 16);
        assert_eq!(config.training.seed, 42);
    }
}
