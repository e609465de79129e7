//! ONNX Threat Model
//!
//! Load pre-trained multi-class classifier (ONNX) + class list (JSON).
//! `Session::run` cần `&mut`, nên session nằm sau Mutex.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::classifier::ThreatModel;
use super::types::Classification;
use crate::error::{PipelineError, PipelineResult};
use crate::logic::features::{FeatureVector, FEATURE_COUNT};

/// Output names emitted by common classifier converters
const PROBABILITY_OUTPUTS: [&str; 3] = ["probabilities", "output_probability", "probs"];

pub struct OnnxThreatModel {
    session: Mutex<Session>,
    output_name: String,
    classes: Vec<String>,
    path: PathBuf,
}

impl std::fmt::Debug for OnnxThreatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxThreatModel")
            .field("path", &self.path)
            .field("output_name", &self.output_name)
            .field("classes", &self.classes)
            .finish()
    }
}

fn artifact_error(path: &Path, reason: impl std::fmt::Display) -> PipelineError {
    PipelineError::Artifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Read the companion class list (JSON array of labels)
pub fn load_classes(path: &Path) -> PipelineResult<Vec<String>> {
    let data = fs::read(path).map_err(|e| artifact_error(path, e))?;
    let classes: Vec<String> = serde_json::from_slice(&data).map_err(|e| artifact_error(path, e))?;

    if classes.is_empty() {
        return Err(artifact_error(path, "class list is empty"));
    }
    Ok(classes)
}

impl OnnxThreatModel {
    pub fn load(model_path: &Path, classes_path: &Path) -> PipelineResult<Self> {
        log::info!("Loading ONNX threat classifier from: {}", model_path.display());

        if !model_path.exists() {
            return Err(artifact_error(model_path, "model not found"));
        }
        let classes = load_classes(classes_path)?;

        let session = Session::builder()
            .map_err(|e| artifact_error(model_path, format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| artifact_error(model_path, format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| artifact_error(model_path, format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| PROBABILITY_OUTPUTS.contains(&o.name.as_str()))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or_else(|| artifact_error(model_path, "No output defined"))?;

        log::info!(
            "ONNX threat classifier loaded ({} classes, output '{}')",
            classes.len(),
            output_name
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            classes,
            path: model_path.to_path_buf(),
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    fn probabilities(&self, features: &FeatureVector) -> PipelineResult<Vec<f32>> {
        let input = Array2::<f32>::from_shape_vec((1, FEATURE_COUNT), features.to_f32().to_vec())
            .map_err(|e| PipelineError::Inference(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input)
            .map_err(|e| PipelineError::Inference(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| PipelineError::Inference(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| PipelineError::Inference("No output".to_string()))?;

        let output_tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Inference(format!("Extract error: {}", e)))?;

        Ok(output_tensor.1.to_vec())
    }
}

impl ThreatModel for OnnxThreatModel {
    fn predict(&self, features: &FeatureVector) -> PipelineResult<Classification> {
        let probabilities = self.probabilities(features)?;

        if probabilities.len() != self.classes.len() {
            return Err(PipelineError::Inference(format!(
                "model returned {} probabilities for {} classes",
                probabilities.len(),
                self.classes.len()
            )));
        }

        let (best, confidence) = argmax(&probabilities)
            .ok_or_else(|| PipelineError::Inference("empty probability vector".to_string()))?;

        Ok(Classification::from_model(&self.classes[best], confidence as f64))
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Index and value of the largest probability
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
