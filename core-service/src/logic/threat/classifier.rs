//! Threat Classifier
//!
//! Strategy theo artifact availability: ONNX model nếu có, ngược lại
//! (hoặc khi inference lỗi) dùng rule table. `classify` không bao giờ fail.

use super::rules::classify_by_rules;
use super::types::Classification;
use crate::error::PipelineResult;
use crate::logic::features::FeatureVector;
use crate::logic::observation::Domain;

/// A trained multi-class threat model
pub trait ThreatModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> PipelineResult<Classification>;

    fn name(&self) -> &str;
}

/// Per-domain classifier with rule fallback
#[derive(Default)]
pub struct ThreatClassifier {
    network: Option<Box<dyn ThreatModel>>,
    email: Option<Box<dyn ThreatModel>>,
}

impl ThreatClassifier {
    /// Rules only
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, domain: Domain, model: Box<dyn ThreatModel>) -> Self {
        match domain {
            Domain::Network => self.network = Some(model),
            Domain::Email => self.email = Some(model),
        }
        self
    }

    fn model(&self, domain: Domain) -> Option<&dyn ThreatModel> {
        match domain {
            Domain::Network => self.network.as_deref(),
            Domain::Email => self.email.as_deref(),
        }
    }

    pub fn has_model(&self, domain: Domain) -> bool {
        self.model(domain).is_some()
    }

    pub fn classify(&self, features: &FeatureVector) -> Classification {
        let domain = features.domain();

        if let Some(model) = self.model(domain) {
            match model.predict(features) {
                Ok(classification) => return classification,
                Err(e) => {
                    log::warn!(
                        "{} threat model '{}' failed ({}), using rules",
                        domain,
                        model.name(),
                        e
                    );
                }
            }
        }

        classify_by_rules(features)
    }
}
