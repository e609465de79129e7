//! Flow Sweeper - background expiry task
//!
//! Chạy `sweep_expired` mỗi `sweep_interval`, gửi flows hết hạn qua channel.
//! Dừng qua watch channel; có thể drain các flows còn sống khi shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::aggregator::FlowAggregator;
use super::state::FinalizedFlow;

pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the task and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::error!("Flow sweeper task failed: {}", e);
        }
    }
}

/// Spawn the sweeper on the current tokio runtime
pub fn spawn_sweeper(
    aggregator: Arc<FlowAggregator>,
    interval: Duration,
    flush_on_shutdown: bool,
    sink: mpsc::Sender<FinalizedFlow>,
) -> SweeperHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(sweeper_loop(
        aggregator,
        interval,
        flush_on_shutdown,
        sink,
        shutdown_rx,
    ));

    log::info!("Flow sweeper started (interval: {}s)", interval.as_secs());
    SweeperHandle { shutdown, task }
}

async fn sweeper_loop(
    aggregator: Arc<FlowAggregator>,
    interval: Duration,
    flush_on_shutdown: bool,
    sink: mpsc::Sender<FinalizedFlow>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(dropped) = forward(&sink, aggregator.sweep_expired(Utc::now())).await {
                    log::warn!(
                        "Flow consumer closed, stopping sweeper ({} expired flows discarded)",
                        dropped
                    );
                    return;
                }
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    if flush_on_shutdown {
        let remaining = aggregator.drain();
        log::info!("Flushing {} live flows on shutdown", remaining.len());
        if let Err(dropped) = forward(&sink, remaining).await {
            log::warn!(
                "Flow consumer closed during shutdown flush ({} flows discarded)",
                dropped
            );
        }
    }

    log::info!("Flow sweeper stopped");
}

/// Gửi lần lượt; nếu consumer đã đóng trả về số flows bị bỏ (kể cả flow đang gửi)
async fn forward(
    sink: &mpsc::Sender<FinalizedFlow>,
    flows: Vec<FinalizedFlow>,
) -> Result<(), usize> {
    let total = flows.len();
    for (sent, flow) in flows.into_iter().enumerate() {
        if sink.send(flow).await.is_err() {
            return Err(total - sent);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::FlowConfig;
    use crate::logic::fixtures;

    fn finalized(n: u8) -> Vec<FinalizedFlow> {
        let agg = FlowAggregator::new(&FlowConfig::default());
        for i in 0..n {
            agg.ingest(&fixtures::packet(1, 10 + i, 100, fixtures::fixed_time()))
                .unwrap();
        }
        agg.drain()
    }

    #[tokio::test]
    async fn test_forward_delivers_all() {
        let (tx, mut rx) = mpsc::channel(8);
        assert_eq!(forward(&tx, finalized(3)).await, Ok(()));
        for _ in 0..3 {
            assert!(rx.recv().await.is_some());
        }
    }

    #[tokio::test]
    async fn test_forward_counts_discarded_when_closed() {
        let (tx, mut rx) = mpsc::channel(8);
        rx.close();
        assert_eq!(forward(&tx, finalized(3)).await, Err(3));
    }

    #[tokio::test]
    async fn test_sweeper_stops_when_consumer_closed() {
        let config = FlowConfig {
            inactivity_timeout_secs: 1,
            ..FlowConfig::default()
        };
        let agg = Arc::new(FlowAggregator::new(&config));
        let stale = Utc::now() - chrono::Duration::seconds(30);
        agg.ingest(&fixtures::packet(1, 2, 100, stale)).unwrap();
        agg.ingest(&fixtures::packet(1, 3, 100, stale)).unwrap();

        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let handle = spawn_sweeper(Arc::clone(&agg), Duration::from_millis(20), true, tx);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !handle.task.is_finished() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("sweeper should stop once the consumer is gone");

        // Expired flows left the table even though nobody received them
        assert_eq!(agg.active_flows(), 0);
        handle.shutdown().await;
    }
}
