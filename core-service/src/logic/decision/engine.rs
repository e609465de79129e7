//! Detection Engine
//!
//! Observation → check → extract → score → classify (chỉ khi anomalous)
//! → decide. Các components là instances được AppState sở hữu.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::verdict::{decide, VerdictRecord};
use crate::error::{PipelineError, PipelineResult};
use crate::logic::config::PipelineConfig;
use crate::logic::features::{extract, FeatureVector};
use crate::logic::model::{AnomalyScorer, ModelRegistry, ModelStatus, OutlierTrainer, ScoreResult};
use crate::logic::observation::{Domain, Observation};
use crate::logic::threat::ThreatClassifier;

/// Result of `/train`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub domain: Domain,
    pub trained_on: usize,
    pub features: Vec<String>,
}

pub struct DetectionEngine {
    scorer: AnomalyScorer,
    classifier: ThreatClassifier,
    trainer: OutlierTrainer,
    registry: Option<ModelRegistry>,
    // Một lock cho mỗi domain: save + install phải đi cùng nhau
    train_locks: [Mutex<()>; 2],
}

impl DetectionEngine {
    pub fn new(scorer: AnomalyScorer, classifier: ThreatClassifier, trainer: OutlierTrainer) -> Self {
        Self {
            scorer,
            classifier,
            trainer,
            registry: None,
            train_locks: Default::default(),
        }
    }

    /// Engine with every artifact found in the registry directory.
    /// Missing or rejected artifacts leave that component not ready.
    pub fn load(registry: ModelRegistry, config: &PipelineConfig) -> Self {
        let scorer = registry.load_scorer(config.scorer.clone());
        let classifier = registry.load_classifier();

        Self {
            scorer,
            classifier,
            trainer: OutlierTrainer::new(config.training.clone()),
            registry: Some(registry),
            train_locks: Default::default(),
        }
    }

    /// Persist trained detectors to `registry`
    pub fn with_registry(mut self, registry: ModelRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn scorer(&self) -> &AnomalyScorer {
        &self.scorer
    }

    pub fn classifier(&self) -> &ThreatClassifier {
        &self.classifier
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            network_detector: self.scorer.is_ready(Domain::Network),
            email_detector: self.scorer.is_ready(Domain::Email),
            network_threat_classifier: self.classifier.has_model(Domain::Network),
            email_threat_classifier: self.classifier.has_model(Domain::Email),
        }
    }

    fn train_lock(&self, domain: Domain) -> &Mutex<()> {
        match domain {
            Domain::Network => &self.train_locks[0],
            Domain::Email => &self.train_locks[1],
        }
    }

    fn features_for(domain: Domain, records: &[Observation]) -> PipelineResult<Vec<FeatureVector>> {
        records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                if record.domain() != domain {
                    return Err(PipelineError::Validation(format!(
                        "record {} is {}, expected {}",
                        i,
                        record.domain(),
                        domain
                    )));
                }
                record.check()?;
                Ok(extract(record))
            })
            .collect()
    }

    /// Fit, persist, then swap in a new detector for `domain`
    pub fn train(&self, domain: Domain, records: &[Observation]) -> PipelineResult<TrainingSummary> {
        let vectors = Self::features_for(domain, records)?;
        let model = self.trainer.fit(domain, &vectors)?;

        // Persisted artifact và model đang chạy phải là cùng một lần train
        let _guard = self.train_lock(domain).lock();
        if let Some(registry) = &self.registry {
            registry.save_outlier(&model)?;
        }

        let summary = TrainingSummary {
            domain,
            trained_on: model.trained_on,
            features: model.layout.feature_names.clone(),
        };
        self.scorer.install(Arc::new(model));

        Ok(summary)
    }

    pub fn score(&self, observation: &Observation) -> PipelineResult<ScoreResult> {
        if !self.scorer.is_ready(observation.domain()) {
            return Err(PipelineError::ModelNotReady(observation.domain()));
        }
        observation.check()?;
        self.scorer.score(&extract(observation))
    }

    /// Score a same-domain batch; fails as a whole on the first bad record
    pub fn score_batch(&self, domain: Domain, records: &[Observation]) -> PipelineResult<Vec<ScoreResult>> {
        if !self.scorer.is_ready(domain) {
            return Err(PipelineError::ModelNotReady(domain));
        }
        Self::features_for(domain, records)?
            .iter()
            .map(|vector| self.scorer.score(vector))
            .collect()
    }

    /// Full verdict for one observation
    pub fn evaluate(&self, observation: &Observation) -> PipelineResult<VerdictRecord> {
        if !self.scorer.is_ready(observation.domain()) {
            return Err(PipelineError::ModelNotReady(observation.domain()));
        }
        observation.check()?;

        let features = extract(observation);
        let score = self.scorer.score(&features)?;

        let classification = score
            .is_anomaly
            .then(|| self.classifier.classify(&features));

        let verdict = decide(&score, classification.as_ref(), observation.details(), Utc::now());

        if verdict.is_anomaly {
            log::info!(
                "Anomaly ({}): {} score={:.3} class={}",
                verdict.domain,
                verdict.details,
                verdict.anomaly_score,
                verdict.threat_class.as_deref().unwrap_or("-")
            );
        }

        Ok(verdict)
    }
}

impl Default for DetectionEngine {
    fn default() -> Self {
        Self::new(
            AnomalyScorer::default(),
            ThreatClassifier::new(),
            OutlierTrainer::default(),
        )
    }
}
