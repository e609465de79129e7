//! Request / response models

pub mod analysis;
pub mod ingest;

pub use analysis::*;
pub use ingest::*;
