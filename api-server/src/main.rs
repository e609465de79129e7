//! FlowWatch Decision API
//!
//! HTTP adapter over `flowwatch-core`: collectors submit packets, flows and
//! emails; the server answers with verdicts and keeps the anomaly log.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FLOWWATCH SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌────────────────┐  ┌────────────────────┐  │
//! │  │  API      │  │ FlowAggregator │  │  Flow Sweeper      │  │
//! │  │  (Axum)   │──│ (sharded map)  │──│  (tokio task)      │  │
//! │  └─────┬─────┘  └───────┬────────┘  └─────────┬──────────┘  │
//! │        └────────────────┼─────────────────────┘             │
//! │                         ▼                                   │
//! │   DetectionEngine ──► VerdictRecord ──► AuditLog (SQLite)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod models;
mod handlers;
mod pipeline;
mod error;


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use flowwatch_core::logic::audit::AuditLog;
use flowwatch_core::logic::decision::DetectionEngine;
use flowwatch_core::logic::flow::{spawn_sweeper, FlowAggregator};
use flowwatch_core::logic::model::ModelRegistry;
use tokio::sync::mpsc;
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};

/// Capacity of the sweeper → consumer channel
const FLOW_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging (core `log` records are bridged into tracing)
    let json_logs = config.is_production();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "flowwatch_server=debug,flowwatch_core=info,tower_http=debug".into()))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let pipeline = config.pipeline();
    pipeline.validate().context("Invalid pipeline configuration")?;

    tracing::info!("FlowWatch server starting ({})...", config.environment);
    tracing::info!("Models: {}", config.model_dir.display());
    tracing::info!("Anomaly log: {}", config.log_db_path.display());

    let engine = Arc::new(DetectionEngine::load(ModelRegistry::new(&config.model_dir), &pipeline));
    let status = engine.status();
    tracing::info!(
        "Detectors ready: network={} email={}",
        status.network_detector,
        status.email_detector
    );

    let audit_log = Arc::new(
        AuditLog::open(&config.log_db_path).context("Failed to open anomaly log")?,
    );
    let aggregator = Arc::new(FlowAggregator::new(&pipeline.flow));

    // Expired flows: sweeper → channel → consumer
    let (flow_tx, flow_rx) = mpsc::channel(FLOW_CHANNEL_CAPACITY);
    let consumer = pipeline::spawn_flow_consumer(engine.clone(), audit_log.clone(), flow_rx);
    let sweeper = spawn_sweeper(
        aggregator.clone(),
        pipeline.flow.sweep_interval(),
        pipeline.flow.flush_on_shutdown,
        flow_tx,
    );

    let state = AppState {
        engine,
        aggregator,
        audit_log,
        config: config.clone(),
    };

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Sweeper drops its sender on exit, which ends the consumer
    tracing::info!("Shutting down flow sweeper...");
    sweeper.shutdown().await;
    if let Err(e) = consumer.await {
        tracing::error!("Flow consumer failed: {}", e);
    }

    tracing::info!("FlowWatch server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DetectionEngine>,
    pub aggregator: Arc<FlowAggregator>,
    pub audit_log: Arc<AuditLog>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))

        // Detectors
        .route("/train", post(handlers::train::train))
        .route("/analyze", post(handlers::analyze::analyze))
        .route("/models/status", get(handlers::models::status))

        // Verdicts
        .route("/predict/network", post(handlers::predict::network))
        .route("/predict/email", post(handlers::predict::email))
        .route("/ingest/packets", post(handlers::ingest::packets))

        // Anomaly log
        .route("/logs", get(handlers::logs::list))
        .route("/logs/statistics", get(handlers::logs::statistics))

        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
