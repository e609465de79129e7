//! Audit Module - Persistence logger cho observations + verdicts

pub mod entry;
pub mod query;
pub mod store;


pub use entry::LogEntry;
pub use query::{LogFilter, LogStatistics};
pub use store::{AuditLog, LogListing};
