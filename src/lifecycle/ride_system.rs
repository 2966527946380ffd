use crate::clients::RideClient;
use crate::config::SystemConfig;
use crate::framework::{
    ActorSystem, EscalationReport, FailureObserver, SupervisionPolicy, SystemMetrics,
};
use crate::lifecycle::metrics_collector::{MetricsCollector, DEFAULT_HISTORY};
use crate::rides::messages::{MATCHER, MATCHER_ID};
use crate::rides::{MatcherHandler, RideError, TripBook};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Failure observer that logs escalations and keeps them for inspection.
#[derive(Debug, Default)]
pub struct EscalationLog {
    reports: Mutex<Vec<EscalationReport>>,
}

impl EscalationLog {
    pub fn reports(&self) -> Vec<EscalationReport> {
        self.reports.lock().clone()
    }
}

impl FailureObserver for EscalationLog {
    fn on_escalation(&self, report: &EscalationReport) {
        error!(
            actor_id = %report.actor.id(),
            actor_type = %report.actor.actor_type(),
            reason = ?report.reason,
            error = %report.error,
            "Actor failure escalated"
        );
        self.reports.lock().push(report.clone());
    }
}

/// The runtime orchestrator for the ride-matching service.
///
/// `RideSystem` is responsible for:
/// - **Lifecycle Management**: starting the actor system and stopping it again
/// - **Dependency Wiring**: the matcher, the client and the shared [`TripBook`]
/// - **Observability**: the metrics collector and the escalation log
///
/// # Example
///
/// ```ignore
/// let system = RideSystem::new(SystemConfig::from_env())?;
///
/// system.client.register_driver("driver-1", Location::new(52.52, 13.40))?;
/// system.client.register_passenger("alice")?;
/// let trip_id = system.client.request_ride("alice", pickup, dropoff)?;
///
/// system.shutdown().await?;
/// ```
pub struct RideSystem {
    /// Client for drivers, passengers and trips
    pub client: RideClient,

    /// Outcomes written by the ride actors
    pub trip_book: TripBook,

    system: ActorSystem,
    escalations: Arc<EscalationLog>,
    collector: MetricsCollector,
}

impl RideSystem {
    /// Starts an actor system from `config`, spawns the matcher and starts metrics
    /// collection. Must be called from within a Tokio runtime.
    pub fn new(config: SystemConfig) -> Result<Self, RideError> {
        Self::with_parent(config, &CancellationToken::new())
    }

    /// Like [`new`](Self::new), but the actor system stops when `parent` is cancelled.
    pub fn with_parent(
        config: SystemConfig,
        parent: &CancellationToken,
    ) -> Result<Self, RideError> {
        let capacity = config.default_mailbox_capacity;
        let interval = config.metrics_interval();
        let system = ActorSystem::with_config(config);
        system.start(parent)?;

        let escalations = Arc::new(EscalationLog::default());
        system.set_failure_observer(escalations.clone());

        let trip_book = TripBook::new();
        system.spawn_actor(
            MATCHER,
            MATCHER_ID,
            capacity,
            MatcherHandler::new(trip_book.clone()),
            SupervisionPolicy::Resume,
        )?;

        let client = RideClient::new(system.clone(), trip_book.clone());
        let collector = MetricsCollector::spawn(system.clone(), interval, DEFAULT_HISTORY);

        info!(system = %system.name(), "Ride system ready");
        Ok(Self {
            client,
            trip_book,
            system,
            escalations,
            collector,
        })
    }

    pub fn actor_system(&self) -> &ActorSystem {
        &self.system
    }

    pub fn metrics(&self) -> SystemMetrics {
        self.system.get_metrics()
    }

    /// Snapshots taken by the metrics collector so far.
    pub fn metrics_history(&self) -> Vec<SystemMetrics> {
        self.collector.history()
    }

    pub fn escalations(&self) -> Vec<EscalationReport> {
        self.escalations.reports()
    }

    /// Shuts down the collector, then the actor system.
    ///
    /// Messages still queued in any mailbox are discarded.
    pub async fn shutdown(self) -> Result<(), RideError> {
        info!("Shutting down ride system...");
        self.collector.shutdown().await;
        self.system.stop().await?;
        info!("Ride system shutdown complete.");
        Ok(())
    }
}
