//! Configuration module

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use flowwatch_core::constants::{default_log_path, default_model_dir};
use flowwatch_core::logic::config::{FlowConfig, PipelineConfig, ScorerConfig, TrainingConfig};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Directory holding model artifacts
    pub model_dir: PathBuf,

    /// SQLite file for the anomaly log
    pub log_db_path: PathBuf,

    /// Flow aggregation settings
    pub flow: FlowConfig,

    /// Decision-function thresholds per domain
    pub scorer: ScorerConfig,

    /// Environment (development, production)
    pub environment: String,
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let flow_defaults = FlowConfig::default();
        let scorer_defaults = ScorerConfig::default();

        Self {
            port: parse_env("PORT", 8000),

            model_dir: env::var("MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_model_dir()),

            log_db_path: env::var("LOG_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_log_path()),

            flow: FlowConfig {
                batch_threshold: parse_env("FLOW_BATCH_THRESHOLD", flow_defaults.batch_threshold),
                inactivity_timeout_secs: parse_env(
                    "FLOW_INACTIVITY_TIMEOUT_SECS",
                    flow_defaults.inactivity_timeout_secs,
                ),
                sweep_interval_secs: parse_env("FLOW_SWEEP_INTERVAL_SECS", flow_defaults.sweep_interval_secs),
                shards: parse_env("FLOW_SHARDS", flow_defaults.shards),
                flush_on_shutdown: parse_env("FLUSH_FLOWS_ON_SHUTDOWN", flow_defaults.flush_on_shutdown),
            },

            scorer: ScorerConfig {
                network_threshold: parse_env("NETWORK_THRESHOLD", scorer_defaults.network_threshold),
                email_threshold: parse_env("EMAIL_THRESHOLD", scorer_defaults.email_threshold),
            },

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Core pipeline settings derived from this config
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            flow: self.flow.clone(),
            scorer: self.scorer.clone(),
            training: TrainingConfig::default(),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
