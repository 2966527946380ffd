//! Periodic metrics polling.

use crate::framework::{ActorSystem, SystemMetrics};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Number of snapshots kept by default.
pub const DEFAULT_HISTORY: usize = 60;

/// Polls [`ActorSystem::get_metrics`] at a fixed interval, logs each snapshot and keeps
/// the most recent ones in memory.
///
/// Polling never blocks on actors, so a slow handler cannot delay a snapshot.
pub struct MetricsCollector {
    history: Arc<Mutex<VecDeque<SystemMetrics>>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl MetricsCollector {
    /// Starts polling `system` every `interval`, keeping at most `capacity` snapshots.
    pub fn spawn(system: ActorSystem, interval: Duration, capacity: usize) -> Self {
        let history = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poll(
            system,
            interval.max(Duration::from_millis(1)),
            capacity.max(1),
            history.clone(),
            cancel.clone(),
        ));
        Self {
            history,
            cancel,
            handle,
        }
    }

    pub fn latest(&self) -> Option<SystemMetrics> {
        self.history.lock().back().cloned()
    }

    /// Collected snapshots, oldest first.
    pub fn history(&self) -> Vec<SystemMetrics> {
        self.history.lock().iter().cloned().collect()
    }

    /// Stops polling and waits for the poller to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

async fn poll(
    system: ActorSystem,
    interval: Duration,
    capacity: usize,
    history: Arc<Mutex<VecDeque<SystemMetrics>>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    debug!(?interval, "Metrics collector started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let metrics = system.get_metrics();
                info!(
                    system = %metrics.system_name,
                    actors = metrics.total_actors,
                    running = metrics.by_status.running,
                    processed = metrics.messages_processed,
                    failed = metrics.messages_failed,
                    queued = metrics.queued_messages,
                    throughput = metrics.throughput_per_sec,
                    "Metrics"
                );
                let mut history = history.lock();
                if history.len() == capacity {
                    history.pop_front();
                }
                history.push_back(metrics);
            }
        }
    }
    debug!("Metrics collector stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_history_is_bounded() {
        let system = ActorSystem::new("collector");
        system.start(&CancellationToken::new()).unwrap();

        let collector = MetricsCollector::spawn(system.clone(), Duration::from_millis(5), 3);
        tokio::time::sleep(Duration::from_millis(60)).await;

        let history = collector.history();
        assert_eq!(history.len(), 3);
        assert_eq!(collector.latest().unwrap().system_name, "collector");

        collector.shutdown().await;
        system.stop().await.unwrap();
    }
}
