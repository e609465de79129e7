//! Decision Module
//!
//! Gộp ScoreResult + Classification thành VerdictRecord.
//!
//! - `severity`: score → low/medium/high/critical
//! - `verdict`: VerdictRecord + `decide()`
//! - `engine`: DetectionEngine (end-to-end evaluation, training)

pub mod severity;
pub mod verdict;
pub mod engine;


// Re-export
pub use engine::{DetectionEngine, TrainingSummary};
pub use severity::Severity;
pub use verdict::{decide, VerdictRecord};
