//! Flow Aggregator - sharded flow table
//!
//! Mỗi shard là một `Mutex<HashMap<FlowKey, FlowState>>` theo hash của
//! canonical key. Threshold path và sweep path đều remove dưới cùng shard
//! lock nên một flow chỉ được finalize đúng một lần.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::key::FlowKey;
use super::state::{CloseReason, FinalizedFlow, FlowState};
use crate::error::PipelineResult;
use crate::logic::config::FlowConfig;
use crate::logic::observation::PacketRecord;

type Shard = Mutex<HashMap<FlowKey, FlowState>>;

/// Counters for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorStats {
    pub packets_ingested: u64,
    pub flows_created: u64,
    pub flows_finalized: u64,
    pub active_flows: usize,
}

pub struct FlowAggregator {
    shards: Vec<Shard>,
    batch_threshold: u64,
    inactivity_timeout_secs: u64,
    packets_ingested: AtomicU64,
    flows_created: AtomicU64,
    flows_finalized: AtomicU64,
}

impl FlowAggregator {
    pub fn new(config: &FlowConfig) -> Self {
        let shards = (0..config.shards.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();

        Self {
            shards,
            batch_threshold: config.batch_threshold.max(1),
            inactivity_timeout_secs: config.inactivity_timeout_secs,
            packets_ingested: AtomicU64::new(0),
            flows_created: AtomicU64::new(0),
            flows_finalized: AtomicU64::new(0),
        }
    }

    fn shard_for(&self, key: &FlowKey) -> &Shard {
        &self.shards[key.shard(self.shards.len())]
    }

    /// Ingest a packet stamped with the current time when it carries none
    pub fn ingest(&self, packet: &PacketRecord) -> PipelineResult<Option<FinalizedFlow>> {
        self.ingest_at(packet, Utc::now())
    }

    /// Ingest a packet; `arrival` is used when the record has no timestamp.
    ///
    /// Returns the finalized flow when this packet pushes the total packet
    /// count to the batch threshold.
    pub fn ingest_at(
        &self,
        packet: &PacketRecord,
        arrival: DateTime<Utc>,
    ) -> PipelineResult<Option<FinalizedFlow>> {
        packet.check()?;

        let at = packet.timestamp.unwrap_or(arrival);
        let key = FlowKey::from_packet(packet);
        let canonical = key.canonical();

        self.packets_ingested.fetch_add(1, Ordering::Relaxed);

        let mut shard = self.shard_for(&canonical).lock();

        let state = shard.entry(canonical).or_insert_with(|| {
            self.flows_created.fetch_add(1, Ordering::Relaxed);
            log::debug!("New flow {}", key);
            FlowState::new(key, at)
        });
        state.update(packet, at);

        if state.total_packets() < self.batch_threshold {
            return Ok(None);
        }

        let finalized = shard
            .remove(&canonical)
            .map(|state| FinalizedFlow::new(state, CloseReason::PacketThreshold));
        drop(shard);

        if finalized.is_some() {
            self.flows_finalized.fetch_add(1, Ordering::Relaxed);
        }
        Ok(finalized)
    }

    /// Finalize every flow idle for longer than the inactivity timeout
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<FinalizedFlow> {
        let mut expired = Vec::new();

        for shard in &self.shards {
            let mut guard = shard.lock();
            let keys: Vec<FlowKey> = guard
                .iter()
                .filter(|(_, state)| state.is_expired(now, self.inactivity_timeout_secs))
                .map(|(key, _)| *key)
                .collect();

            for key in keys {
                if let Some(state) = guard.remove(&key) {
                    expired.push(FinalizedFlow::new(state, CloseReason::InactivityTimeout));
                }
            }
        }

        if !expired.is_empty() {
            self.flows_finalized.fetch_add(expired.len() as u64, Ordering::Relaxed);
            log::debug!("Swept {} expired flows", expired.len());
        }
        expired
    }

    /// Finalize all live flows (shutdown)
    pub fn drain(&self) -> Vec<FinalizedFlow> {
        let mut drained = Vec::new();

        for shard in &self.shards {
            let mut guard = shard.lock();
            drained.extend(
                guard
                    .drain()
                    .map(|(_, state)| FinalizedFlow::new(state, CloseReason::Shutdown)),
            );
        }

        self.flows_finalized.fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained
    }

    pub fn active_flows(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    /// Snapshot of a live flow, in either orientation
    pub fn get(&self, key: &FlowKey) -> Option<FlowState> {
        let canonical = key.canonical();
        self.shard_for(&canonical).lock().get(&canonical).cloned()
    }

    pub fn stats(&self) -> AggregatorStats {
        AggregatorStats {
            packets_ingested: self.packets_ingested.load(Ordering::Relaxed),
            flows_created: self.flows_created.load(Ordering::Relaxed),
            flows_finalized: self.flows_finalized.load(Ordering::Relaxed),
            active_flows: self.active_flows(),
        }
    }
}

impl Default for FlowAggregator {
    fn default() -> Self {
        Self::new(&FlowConfig::default())
    }
}
