//! Pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::logic::observation::Domain;

/// Errors surfaced by the detection pipeline.
///
/// `ModelNotReady` is a configuration state (no artifact for the domain) and
/// must stay distinguishable from bad input and internal faults.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} detector not trained yet")]
    ModelNotReady(Domain),

    #[error("Invalid observation: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Artifact {path:?}: {reason}")]
    Artifact { path: PathBuf, reason: String },

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// True when the caller sent something malformed.
    pub fn is_bad_input(&self) -> bool {
        matches!(self, PipelineError::Validation(_))
    }

    /// True when the system lacks a model for the requested domain.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, PipelineError::ModelNotReady(_))
    }
}

impl From<validator::ValidationErrors> for PipelineError {
    fn from(err: validator::ValidationErrors) -> Self {
        PipelineError::Validation(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_ready_display() {
        let err = PipelineError::ModelNotReady(Domain::Network);
        assert_eq!(err.to_string(), "network detector not trained yet");
        assert!(err.is_not_ready());
        assert!(!err.is_bad_input());
    }

    #[test]
    fn test_validation_is_bad_input() {
        let err = PipelineError::Validation("bytes must be >= 0".to_string());
        assert!(err.is_bad_input());
        assert_eq!(err.to_string(), "Invalid observation: bytes must be >= 0");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PipelineError>();
    }
}
