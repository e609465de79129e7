//! Logic Module - Pipeline components
//!
//! Chứa các components của detection pipeline, theo thứ tự phụ thuộc:
//!
//! - `observation` - Input records (packet, flow, email)
//! - `features/` - Observation → FeatureVector
//! - `flow/` - Packet → connection-level flow aggregation
//! - `model/` - Isolation forest scoring + training + artifacts
//! - `threat/` - ONNX classifier với rule fallback
//! - `decision/` - Verdict composition, DetectionEngine
//! - `audit/` - Append-only SQLite log

pub mod observation;
pub mod config;

pub mod features;
pub mod flow;
pub mod model;
pub mod threat;
pub mod decision;
pub mod audit;

#[cfg(test)]
pub(crate) mod fixtures;
