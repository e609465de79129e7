//! Feature Vector - Core data structure for model input
//!
//! Versioned, domain-tagged and immutable once built. Values are only
//! reachable through read accessors.

use serde::{Deserialize, Serialize};

use super::layout::{layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT, FEATURE_VERSION};
use crate::logic::observation::Domain;

/// Versioned Feature Vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    domain: Domain,
    version: u8,
    layout_hash: u32,
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    /// Build a vector for `domain` with the current layout
    pub fn from_values(domain: Domain, values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            domain,
            version: FEATURE_VERSION,
            layout_hash: layout_hash(domain),
            values,
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Feature by index (0.0 when out of range)
    pub fn get(&self, index: usize) -> f64 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        super::layout::feature_index(self.domain, name).map(|i| self.values[i])
    }

    /// Values as f32 for ONNX tensors
    pub fn to_f32(&self) -> [f32; FEATURE_COUNT] {
        let mut out = [0.0f32; FEATURE_COUNT];
        for (dst, src) in out.iter_mut().zip(self.values.iter()) {
            *dst = *src as f32;
        }
        out
    }

    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.domain, self.version, self.layout_hash)
    }
}

// ============================================================================
// FEATURE SOURCE TRAIT
// ============================================================================

/// Observations that can be encoded as a feature vector
pub trait FeatureSource {
    const DOMAIN: Domain;

    /// Pure, deterministic encoding - no I/O
    fn features(&self) -> FeatureVector;
}
