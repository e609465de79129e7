//! Features Module - Feature Extraction Engine
//!
//! Observation → FeatureVector, theo layout cố định của từng domain.
//! Pure functions: không I/O, không state.

pub mod layout;
pub mod vector;
pub mod network;
pub mod email;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Datelike, Timelike, Utc};

use crate::logic::observation::Observation;

// Re-export common types
pub use layout::{LayoutInfo, FEATURE_COUNT, FEATURE_VERSION};
pub use network::avg_packet_size;
pub use vector::{FeatureSource, FeatureVector};

/// Encode any observation with its domain's layout
pub fn extract(observation: &Observation) -> FeatureVector {
    match observation {
        Observation::Network(flow) => flow.features(),
        Observation::Email(email) => email.features(),
    }
}

pub(crate) fn hour_of_day(ts: &DateTime<Utc>) -> f64 {
    ts.hour() as f64
}

/// Monday = 0 ... Sunday = 6
pub(crate) fn weekday(ts: &DateTime<Utc>) -> f64 {
    ts.weekday().num_days_from_monday() as f64
}

pub(crate) fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
