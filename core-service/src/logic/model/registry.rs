//! Model Registry - artifact paths, persistence và loading
//!
//! Layout trong `MODEL_DIR`:
//! - `{domain}_detector.json` - isolation forest + layout
//! - `{domain}_scaler.json` - standard scaler + layout
//! - `{domain}_threat_classifier.onnx` + `.classes.json`
//!
//! Thiếu artifact là trạng thái hợp lệ (component "not ready"). Artifact
//! hỏng hoặc sai layout bị từ chối với warning, không làm crash startup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::isolation_forest::IsolationForest;
use super::scaler::StandardScaler;
use super::scorer::{AnomalyScorer, OutlierModel};
use crate::error::{PipelineError, PipelineResult};
use crate::logic::config::ScorerConfig;
use crate::logic::features::LayoutInfo;
use crate::logic::observation::Domain;
use crate::logic::threat::{OnnxThreatModel, ThreatClassifier};

// ============================================================================
// ON-DISK FORMATS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DetectorArtifact {
    layout: LayoutInfo,
    forest: IsolationForest,
    trained_on: usize,
    trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerArtifact {
    layout: LayoutInfo,
    scaler: StandardScaler,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    dir: PathBuf,
}

impl ModelRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn detector_path(&self, domain: Domain) -> PathBuf {
        self.dir.join(format!("{}_detector.json", domain))
    }

    pub fn scaler_path(&self, domain: Domain) -> PathBuf {
        self.dir.join(format!("{}_scaler.json", domain))
    }

    pub fn classifier_path(&self, domain: Domain) -> PathBuf {
        self.dir.join(format!("{}_threat_classifier.onnx", domain))
    }

    pub fn classes_path(&self, domain: Domain) -> PathBuf {
        self.dir.join(format!("{}_threat_classifier.classes.json", domain))
    }

    // ------------------------------------------------------------------------
    // Outlier model
    // ------------------------------------------------------------------------

    /// Persist detector and scaler (write to temp file, then rename)
    pub fn save_outlier(&self, model: &OutlierModel) -> PipelineResult<()> {
        fs::create_dir_all(&self.dir)?;

        let detector = DetectorArtifact {
            layout: model.layout.clone(),
            forest: model.forest.clone(),
            trained_on: model.trained_on,
            trained_at: model.trained_at,
        };
        let scaler = ScalerArtifact {
            layout: model.layout.clone(),
            scaler: model.scaler.clone(),
        };

        write_atomic(&self.scaler_path(model.domain), &serde_json::to_vec(&scaler)?)?;
        write_atomic(&self.detector_path(model.domain), &serde_json::to_vec(&detector)?)?;

        log::info!("{} detector saved to {}", model.domain, self.dir.display());
        Ok(())
    }

    /// `Ok(None)` when neither file exists; an error when the pair is
    /// incomplete, unreadable or built for another feature layout.
    pub fn load_outlier(&self, domain: Domain) -> PipelineResult<Option<OutlierModel>> {
        let detector_path = self.detector_path(domain);
        let scaler_path = self.scaler_path(domain);

        match (detector_path.exists(), scaler_path.exists()) {
            (false, false) => return Ok(None),
            (true, false) => return Err(artifact_error(&scaler_path, "scaler missing for detector")),
            (false, true) => return Err(artifact_error(&detector_path, "detector missing for scaler")),
            (true, true) => {}
        }

        let detector: DetectorArtifact = read_json(&detector_path)?;
        let scaler: ScalerArtifact = read_json(&scaler_path)?;

        if detector.layout != scaler.layout {
            return Err(artifact_error(&scaler_path, "scaler layout differs from detector layout"));
        }

        let model = OutlierModel {
            domain,
            layout: detector.layout,
            scaler: scaler.scaler,
            forest: detector.forest,
            trained_on: detector.trained_on,
            trained_at: detector.trained_at,
        };
        model.check().map_err(|reason| artifact_error(&detector_path, reason))?;

        Ok(Some(model))
    }

    /// Scorer with every loadable detector installed
    pub fn load_scorer(&self, config: ScorerConfig) -> AnomalyScorer {
        let scorer = AnomalyScorer::new(config);

        for domain in Domain::ALL {
            match self.load_outlier(domain) {
                Ok(Some(model)) => scorer.install(Arc::new(model)),
                Ok(None) => log::info!("No {} detector found, train via /train", domain),
                Err(e) => log::warn!("Failed to load {} detector: {}", domain, e),
            }
        }

        scorer
    }

    // ------------------------------------------------------------------------
    // Threat classifier
    // ------------------------------------------------------------------------

    pub fn load_threat_model(&self, domain: Domain) -> PipelineResult<Option<OnnxThreatModel>> {
        let model_path = self.classifier_path(domain);
        if !model_path.exists() {
            return Ok(None);
        }
        OnnxThreatModel::load(&model_path, &self.classes_path(domain)).map(Some)
    }

    /// Classifier with every loadable ONNX model; rules cover the rest
    pub fn load_classifier(&self) -> ThreatClassifier {
        let mut classifier = ThreatClassifier::new();

        for domain in Domain::ALL {
            match self.load_threat_model(domain) {
                Ok(Some(model)) => classifier = classifier.with_model(domain, Box::new(model)),
                Ok(None) => log::info!("No {} threat classifier, using rule fallback", domain),
                Err(e) => log::warn!("Failed to load {} threat classifier: {}", domain, e),
            }
        }

        classifier
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn artifact_error(path: &Path, reason: impl std::fmt::Display) -> PipelineError {
    PipelineError::Artifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PipelineResult<T> {
    let data = fs::read(path).map_err(|e| artifact_error(path, e))?;
    serde_json::from_slice(&data).map_err(|e| artifact_error(path, e))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> PipelineResult<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
