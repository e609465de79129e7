//! Outlier Trainer - fit scaler + isolation forest cho `/train`

use chrono::Utc;
use ndarray::Array2;

use super::isolation_forest::IsolationForest;
use super::scaler::StandardScaler;
use super::scorer::OutlierModel;
use crate::error::{PipelineError, PipelineResult};
use crate::logic::config::TrainingConfig;
use crate::logic::features::{FeatureVector, LayoutInfo, FEATURE_COUNT};
use crate::logic::observation::Domain;

/// Minimum number of records accepted by `fit`
pub const MIN_TRAINING_RECORDS: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct OutlierTrainer {
    config: TrainingConfig,
}

impl OutlierTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Stack vectors into a samples x features matrix
    pub fn to_matrix(domain: Domain, vectors: &[FeatureVector]) -> PipelineResult<Array2<f64>> {
        let mut flat = Vec::with_capacity(vectors.len() * FEATURE_COUNT);
        for vector in vectors {
            if vector.domain() != domain {
                return Err(PipelineError::Validation(format!(
                    "{} record in a {} training set",
                    vector.domain(),
                    domain
                )));
            }
            flat.extend_from_slice(vector.as_slice());
        }

        Array2::from_shape_vec((vectors.len(), FEATURE_COUNT), flat)
            .map_err(|e| PipelineError::Training(e.to_string()))
    }

    pub fn fit(&self, domain: Domain, vectors: &[FeatureVector]) -> PipelineResult<OutlierModel> {
        if vectors.len() < MIN_TRAINING_RECORDS {
            return Err(PipelineError::Validation(format!(
                "at least {} records are required to train, got {}",
                MIN_TRAINING_RECORDS,
                vectors.len()
            )));
        }

        let data = Self::to_matrix(domain, vectors)?;
        let scaler = StandardScaler::fit(&data)?;
        let scaled = scaler.transform(&data);
        let forest = IsolationForest::fit(&scaled, &self.config)?;

        log::info!("{} detector trained on {} records", domain, vectors.len());

        Ok(OutlierModel {
            domain,
            layout: LayoutInfo::current(domain),
            scaler,
            forest,
            trained_on: vectors.len(),
            trained_at: Utc::now(),
        })
    }
}
