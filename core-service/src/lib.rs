//! FlowWatch Core - Flow Aggregation, Anomaly Scoring & Threat Classification
//!
//! Pipeline:
//!
//! ```text
//! PacketRecord ──► FlowAggregator ──► NetworkFlow ─┐
//!                                                  ├──► FeatureVector ──► AnomalyScorer
//! EmailMessage ────────────────────────────────────┘                         │
//!                                                                 (anomaly?) ▼
//!                           AuditLog ◄── VerdictRecord ◄── decide ◄── ThreatClassifier
//! ```
//!
//! The HTTP surface lives in `flowwatch-server`; this crate has no transport code.

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{PipelineError, PipelineResult};
