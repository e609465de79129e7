//! Finalized flow → verdict → anomaly log

use std::sync::Arc;

use flowwatch_core::logic::audit::{AuditLog, LogEntry};
use flowwatch_core::logic::decision::{DetectionEngine, VerdictRecord};
use flowwatch_core::logic::flow::FinalizedFlow;
use flowwatch_core::logic::observation::Observation;
use flowwatch_core::PipelineError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Outcome of deciding and logging one finalized flow
#[derive(Debug)]
pub struct ProcessedFlow {
    /// `None` when the network detector is not trained
    pub verdict: Option<VerdictRecord>,
    /// Set when the row could not be written to the anomaly log
    pub log_error: Option<PipelineError>,
}

impl ProcessedFlow {
    pub fn is_logged(&self) -> bool {
        self.log_error.is_none()
    }
}

/// Decide and log one finalized flow.
///
/// Never fails: a flow without a verdict is still logged with empty verdict
/// columns, and a log failure is reported alongside the verdict.
pub fn process_flow(engine: &DetectionEngine, audit_log: &AuditLog, flow: &FinalizedFlow) -> ProcessedFlow {
    let entry = LogEntry::from_flow(flow);

    let verdict = match engine.evaluate(&Observation::Network(flow.to_network_flow())) {
        Ok(verdict) => Some(verdict),
        Err(err) if err.is_not_ready() => {
            tracing::debug!("Flow {} logged without verdict: {}", flow.key(), err);
            None
        }
        Err(err) => {
            tracing::warn!("Flow {} could not be scored: {}", flow.key(), err);
            None
        }
    };

    let entry = match &verdict {
        Some(verdict) => entry.with_verdict(verdict),
        None => entry,
    };

    let log_error = audit_log.append(&entry).err();
    if let Some(e) = &log_error {
        tracing::error!(
            "Failed to log {} flow {}: {}",
            flow.reason.as_str(),
            flow.key(),
            e
        );
    }

    ProcessedFlow { verdict, log_error }
}

/// Consume flows from the sweeper until the channel closes
pub fn spawn_flow_consumer(
    engine: Arc<DetectionEngine>,
    audit_log: Arc<AuditLog>,
    mut rx: mpsc::Receiver<FinalizedFlow>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(flow) = rx.recv().await {
            let engine = engine.clone();
            let audit_log = audit_log.clone();

            let result =
                tokio::task::spawn_blocking(move || process_flow(&engine, &audit_log, &flow)).await;

            if let Err(e) = result {
                tracing::error!("Flow processing task failed: {}", e);
            }
        }
        tracing::info!("Flow consumer stopped");
    })
}
