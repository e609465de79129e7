//! Central Configuration Constants
//!
//! Single source of truth for pipeline defaults.

/// App name (used for the data directory)
pub const APP_NAME: &str = "flowwatch";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Denominator guard for ratio / rate features
pub const EPSILON: f64 = 1e-6;

// ============================================
// Flow aggregation
// ============================================

/// Packets per flow before it is finalized
pub const DEFAULT_BATCH_THRESHOLD: u64 = 10;

/// Inactivity timeout (seconds) before a flow is expired
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 60;

/// Sweep interval (seconds) for the expiry task
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 15;

/// Number of lock shards in the flow table
pub const DEFAULT_FLOW_SHARDS: usize = 16;

// ============================================
// Anomaly scoring
// ============================================

/// Default threshold on the isolation-forest decision function
pub const DEFAULT_DECISION_THRESHOLD: f64 = -0.1;

/// Isolation forest defaults
pub const DEFAULT_N_ESTIMATORS: usize = 100;
pub const DEFAULT_MAX_SAMPLES: usize = 256;
pub const DEFAULT_CONTAMINATION: f64 = 0.1;
pub const DEFAULT_RANDOM_SEED: u64 = 42;

// ============================================
// Audit log
// ============================================

/// Attempts for a log append before giving up
pub const LOG_APPEND_ATTEMPTS: u32 = 3;

/// Backoff between log append attempts (milliseconds)
pub const LOG_APPEND_BACKOFF_MS: u64 = 25;

// ============================================
// Helper functions for default paths
// ============================================

/// Base data directory, e.g. `~/.local/share/flowwatch`
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(APP_NAME)
}

/// Default directory holding model artifacts
pub fn default_model_dir() -> std::path::PathBuf {
    default_data_dir().join("models")
}

/// Default SQLite file for the anomaly log
pub fn default_log_path() -> std::path::PathBuf {
    default_data_dir().join("anomalies.db")
}
