//! Threat Module
//!
//! Phân loại anomaly thành threat category cho từng domain.
//! Chỉ chạy khi scorer đã flag observation là anomalous.
//!
//! ## Structure
//! - `types`: Classification, ClassificationMethod
//! - `rules`: Ordered fallback rule tables
//! - `onnx`: Pre-trained ONNX classifier
//! - `classifier`: Strategy selection + fallback

pub mod types;
pub mod rules;
pub mod onnx;
pub mod classifier;

// Re-export main types for convenience
pub use classifier::{ThreatClassifier, ThreatModel};
pub use onnx::OnnxThreatModel;
pub use rules::classify_by_rules;
pub use types::{Classification, ClassificationMethod};
