//! HTTP handlers

pub mod health;
pub mod train;
pub mod analyze;
pub mod predict;
pub mod ingest;
pub mod logs;
pub mod models;
