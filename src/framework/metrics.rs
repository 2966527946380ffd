//! # System Metrics
//!
//! [`SystemMetrics`] is a read-only snapshot derived from the live registry every time
//! [`ActorSystem::get_metrics`](crate::framework::ActorSystem::get_metrics) is called. It is
//! never stored, so there is nothing to keep consistent beyond the registry itself.
//!
//! Collecting a snapshot only reads per-actor atomics; it never waits on a handler, so a
//! poller can call it at a fixed interval without queueing behind a slow actor.
//!
//! Message counters are summed over the actors that are currently registered. When an
//! actor is removed its counters leave the aggregate with it; `actors_spawned_total` and
//! `actors_removed_total` are lifetime totals of the system.

use crate::framework::actor::{ActorStats, ActorStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Number of registered actors in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub starting: usize,
    pub running: usize,
    pub restarting: usize,
    pub stopped: usize,
    pub failed: usize,
}

impl StatusCounts {
    fn add(&mut self, status: ActorStatus) {
        match status {
            ActorStatus::Starting => self.starting += 1,
            ActorStatus::Running => self.running += 1,
            ActorStatus::Restarting => self.restarting += 1,
            ActorStatus::Stopped => self.stopped += 1,
            ActorStatus::Failed => self.failed += 1,
        }
    }
}

/// Snapshot of an actor system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemMetrics {
    pub system_name: String,
    pub total_actors: usize,
    pub by_status: StatusCounts,
    pub by_type: BTreeMap<String, usize>,
    pub messages_received: u64,
    pub messages_processed: u64,
    pub messages_failed: u64,
    pub restarts: u64,
    pub queued_messages: usize,
    pub actors_spawned_total: u64,
    pub actors_removed_total: u64,
    pub uptime_ms: u64,
    /// Handled messages (successful or failed) per second of uptime.
    pub throughput_per_sec: f64,
    pub collected_at: DateTime<Utc>,
}

/// Lifetime totals kept by the system alongside the registry.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Lifetime {
    pub(crate) spawned: u64,
    pub(crate) removed: u64,
    pub(crate) uptime: Duration,
}

impl SystemMetrics {
    pub(crate) fn aggregate(
        system_name: &str,
        actors: impl IntoIterator<Item = ActorStats>,
        lifetime: Lifetime,
    ) -> Self {
        let mut metrics = SystemMetrics {
            system_name: system_name.to_string(),
            total_actors: 0,
            by_status: StatusCounts::default(),
            by_type: BTreeMap::new(),
            messages_received: 0,
            messages_processed: 0,
            messages_failed: 0,
            restarts: 0,
            queued_messages: 0,
            actors_spawned_total: lifetime.spawned,
            actors_removed_total: lifetime.removed,
            uptime_ms: lifetime.uptime.as_millis() as u64,
            throughput_per_sec: 0.0,
            collected_at: Utc::now(),
        };

        for stats in actors {
            metrics.total_actors += 1;
            metrics.by_status.add(stats.status);
            *metrics
                .by_type
                .entry(stats.actor.actor_type().to_string())
                .or_default() += 1;
            metrics.messages_received += stats.received;
            metrics.messages_processed += stats.processed;
            metrics.messages_failed += stats.failed;
            metrics.restarts += stats.restarts;
            metrics.queued_messages += stats.queued;
        }

        let secs = lifetime.uptime.as_secs_f64();
        if secs > 0.0 {
            metrics.throughput_per_sec =
                (metrics.messages_processed + metrics.messages_failed) as f64 / secs;
        }
        metrics
    }

    /// Fraction of handled messages that failed, or 0 when nothing was handled.
    pub fn failure_rate(&self) -> f64 {
        let handled = self.messages_processed + self.messages_failed;
        if handled == 0 {
            0.0
        } else {
            self.messages_failed as f64 / handled as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::actor::ActorRef;
    use crate::framework::SupervisionPolicy;

    fn stats(
        id: &str,
        actor_type: &str,
        status: ActorStatus,
        processed: u64,
        failed: u64,
    ) -> ActorStats {
        ActorStats {
            actor: ActorRef::new(id, actor_type),
            policy: SupervisionPolicy::Restart,
            status,
            received: processed + failed + 1,
            processed,
            failed,
            restarts: failed,
            queued: 1,
        }
    }

    #[test]
    fn test_aggregate_counts() {
        let actors = vec![
            stats("driver-1", "driver", ActorStatus::Running, 4, 0),
            stats("driver-2", "driver", ActorStatus::Restarting, 2, 1),
            stats("matcher", "matcher", ActorStatus::Running, 10, 1),
        ];
        let lifetime = Lifetime {
            spawned: 5,
            removed: 2,
            uptime: Duration::from_secs(2),
        };

        let metrics = SystemMetrics::aggregate("test", actors, lifetime);
        assert_eq!(metrics.total_actors, 3);
        assert_eq!(metrics.by_status.running, 2);
        assert_eq!(metrics.by_status.restarting, 1);
        assert_eq!(metrics.by_type.get("driver"), Some(&2));
        assert_eq!(metrics.messages_processed, 16);
        assert_eq!(metrics.messages_failed, 2);
        assert_eq!(metrics.messages_received, 21);
        assert_eq!(metrics.queued_messages, 3);
        assert_eq!(metrics.actors_spawned_total, 5);
        assert!((metrics.throughput_per_sec - 9.0).abs() < f64::EPSILON);
        assert!((metrics.failure_rate() - 2.0 / 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        let metrics = SystemMetrics::aggregate("empty", Vec::new(), Lifetime::default());
        assert_eq!(metrics.total_actors, 0);
        assert_eq!(metrics.throughput_per_sec, 0.0);
        assert_eq!(metrics.failure_rate(), 0.0);
    }
}
