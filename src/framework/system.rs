//! # Actor System
//!
//! The [`ActorSystem`] is the root registry and lifecycle coordinator. It is constructed
//! explicitly (there is no ambient global) and is cheap to clone: every clone is a handle
//! to the same registry.
//!
//! ## Lifecycle
//!
//! ```text
//! new() --start(parent)--> Running --stop()--> Stopping --(all loops exited)--> Stopped
//! ```
//!
//! Cancelling the parent token passed to `start` triggers the same `stop`.
//!
//! Spawning and sending require `Running`. Before `start` they fail with
//! [`RuntimeError::NotStarted`], after `stop` with [`RuntimeError::ActorSystemShutdown`].
//!
//! ## Registry Locking
//!
//! The registry is a `HashMap` behind a read/write lock. Spawns and removals take the write
//! lock; sends, listings and metrics take the read lock and hold it only long enough to
//! clone an `Arc`. No lock is ever held across a handler invocation or an `.await`.
//!
//! ## Delivery Guarantees
//!
//! Messages accepted by [`ActorSystem::send_message`] for one actor are handled in the
//! order they were accepted. Delivery is at-most-once: messages still queued when an actor
//! stops (through supervision, [`ActorSystem::stop_actor`] or [`ActorSystem::stop`]) are
//! discarded, not redelivered. Callers that cannot tolerate that loss must confirm
//! processing at the application level.

use crate::config::SystemConfig;
use crate::framework::actor::{ActorCell, ActorRef, ActorStats, ActorStatus, DispatchLoop};
use crate::framework::error::RuntimeError;
use crate::framework::handler::{ActorContext, ActorHandler};
use crate::framework::mailbox::{mailbox, EnqueueError, MailboxSender};
use crate::framework::message::Message;
use crate::framework::metrics::{Lifetime, SystemMetrics};
use crate::framework::supervision::{EscalationReport, FailureObserver, SupervisionPolicy};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

const CREATED: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;
const STOPPED: u8 = 3;

/// How long `stop` waits for aborted loops after the shutdown timeout has elapsed.
const ABORT_GRACE: Duration = Duration::from_millis(100);

/// Registry entry: everything the system needs to reach and stop one actor.
struct ActorEntry {
    cell: Arc<ActorCell>,
    mailbox: MailboxSender,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct SystemInner {
    config: SystemConfig,
    state: AtomicU8,
    registry: RwLock<HashMap<String, Arc<ActorEntry>>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    observer: RwLock<Option<Arc<dyn FailureObserver>>>,
    started_at: Mutex<Option<Instant>>,
    stopped: watch::Sender<Option<Result<(), RuntimeError>>>,
    spawned_total: AtomicU64,
    removed_total: AtomicU64,
}

/// Handle to an actor system. Clones share the same registry.
#[derive(Clone)]
pub struct ActorSystem {
    inner: Arc<SystemInner>,
}

impl std::fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorSystem")
            .field("name", &self.inner.config.name)
            .field("state", &self.inner.state.load(Ordering::Acquire))
            .field("actors", &self.inner.registry.read().len())
            .finish()
    }
}

impl ActorSystem {
    /// Creates a system with default configuration. Call [`start`](Self::start) before use.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(SystemConfig::default().with_name(name))
    }

    pub fn with_config(config: SystemConfig) -> Self {
        Self {
            inner: Arc::new(SystemInner {
                config,
                state: AtomicU8::new(CREATED),
                registry: RwLock::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                observer: RwLock::new(None),
                started_at: Mutex::new(None),
                stopped: watch::channel(None).0,
                spawned_total: AtomicU64::new(0),
                removed_total: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.load(Ordering::Acquire) == RUNNING
    }

    /// Moves the system to `Running` and ties its shutdown to `parent`.
    ///
    /// Cancelling `parent` stops the system as [`stop`](Self::stop) would. Calling `start`
    /// again while running is a no-op; a stopped system cannot be restarted. Must be called
    /// from within a Tokio runtime.
    ///
    /// # Errors
    /// [`RuntimeError::ActorSystemShutdown`] if the system was stopped or `parent` is
    /// already cancelled.
    pub fn start(&self, parent: &CancellationToken) -> Result<(), RuntimeError> {
        if parent.is_cancelled() {
            return Err(RuntimeError::ActorSystemShutdown);
        }
        match self
            .inner
            .state
            .compare_exchange(CREATED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                *self.inner.started_at.lock() = Some(Instant::now());
                self.watch_parent(parent.clone());
                info!(system = %self.name(), "Actor system started");
                Ok(())
            }
            Err(RUNNING) => {
                debug!(system = %self.name(), "Actor system already started");
                Ok(())
            }
            Err(_) => Err(RuntimeError::ActorSystemShutdown),
        }
    }

    /// Stops the system once `parent` is cancelled. Holds only a weak reference, so a
    /// dropped system is not kept alive by its parent.
    fn watch_parent(&self, parent: CancellationToken) {
        let inner = Arc::downgrade(&self.inner);
        let shutdown = self.inner.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = parent.cancelled() => {
                    let Some(inner) = inner.upgrade() else {
                        return;
                    };
                    let system = ActorSystem { inner };
                    info!(system = %system.name(), "Parent cancelled, stopping actor system");
                    if let Err(e) = system.stop().await {
                        warn!(system = %system.name(), error = %e, "Stop on cancellation failed");
                    }
                }
            }
        });
    }

    /// Attaches the observer that receives escalated failures, replacing any previous one.
    pub fn set_failure_observer(&self, observer: Arc<dyn FailureObserver>) {
        *self.inner.observer.write() = Some(observer);
    }

    /// Creates an actor and launches its dispatch loop.
    ///
    /// Must be called from within a Tokio runtime. The returned [`ActorRef`] carries only
    /// the identity and type tag.
    ///
    /// # Errors
    /// - [`RuntimeError::InvalidCapacity`] if `mailbox_capacity` is 0 or above the
    ///   configured maximum.
    /// - [`RuntimeError::DuplicateActor`] if `id` is already registered. The existing actor
    ///   is left untouched.
    /// - [`RuntimeError::NotStarted`] / [`RuntimeError::ActorSystemShutdown`] if the system
    ///   is not running.
    pub fn spawn_actor<H: ActorHandler>(
        &self,
        actor_type: &str,
        id: &str,
        mailbox_capacity: usize,
        handler: H,
        policy: SupervisionPolicy,
    ) -> Result<ActorRef, RuntimeError> {
        if mailbox_capacity == 0 || mailbox_capacity > self.inner.config.max_mailbox_capacity {
            return Err(RuntimeError::InvalidCapacity(mailbox_capacity));
        }

        // State is checked under the write lock so `stop` can use the lock as a barrier
        // against spawns racing with shutdown.
        let mut registry = self.inner.registry.write();
        self.ensure_running()?;
        if registry.contains_key(id) {
            warn!(actor_id = %id, "Duplicate actor id");
            return Err(RuntimeError::DuplicateActor(id.to_string()));
        }

        let actor = ActorRef::new(id, actor_type);
        let cell = Arc::new(ActorCell::new(actor.clone(), policy));
        let (sender, receiver) = mailbox(mailbox_capacity);
        let cancel = self.inner.shutdown.child_token();
        let ctx = ActorContext::new(actor.clone(), self.clone(), cancel.clone());
        let dispatch = DispatchLoop::new(
            cell.clone(),
            Box::new(handler),
            receiver,
            ctx,
            cancel.clone(),
            self.inner.config.restart_limit(),
        );

        let entry = Arc::new(ActorEntry {
            cell: cell.clone(),
            mailbox: sender,
            cancel,
            handle: Mutex::new(None),
        });
        registry.insert(id.to_string(), entry.clone());
        *entry.handle.lock() = Some(self.inner.tracker.spawn(dispatch.run()));
        drop(registry);

        cell.transition(ActorStatus::Starting, ActorStatus::Running);
        self.inner.spawned_total.fetch_add(1, Ordering::Relaxed);
        info!(
            actor_id = %id,
            %actor_type,
            capacity = mailbox_capacity,
            ?policy,
            "Actor spawned"
        );
        Ok(actor)
    }

    /// Enqueues `message` for actor `id` without waiting.
    ///
    /// # Errors
    /// - [`RuntimeError::ActorNotFound`] if no live actor has that identity.
    /// - [`RuntimeError::MailboxFull`] if the target mailbox is at capacity.
    /// - [`RuntimeError::NotStarted`] / [`RuntimeError::ActorSystemShutdown`] if the system
    ///   is not running.
    pub fn send_message(&self, id: &str, message: Message) -> Result<(), RuntimeError> {
        self.ensure_running()?;
        let entry = self
            .inner
            .registry
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::ActorNotFound(id.to_string()))?;

        entry.cell.record_received();
        match entry.mailbox.try_enqueue(message) {
            Ok(()) => Ok(()),
            Err(EnqueueError::Full(rejected)) => {
                entry.cell.unrecord_received();
                warn!(actor_id = %id, kind = %rejected.kind(), "Mailbox full");
                Err(RuntimeError::MailboxFull(id.to_string()))
            }
            Err(EnqueueError::Closed(rejected)) => {
                // The loop exited between lookup and enqueue.
                entry.cell.unrecord_received();
                debug!(actor_id = %id, kind = %rejected.kind(), "Mailbox closed");
                Err(RuntimeError::ActorNotFound(id.to_string()))
            }
        }
    }

    /// Snapshot of the registered actors, sorted by id. May be stale as soon as it returns.
    pub fn list_actors(&self) -> Vec<ActorRef> {
        let mut actors: Vec<ActorRef> = self
            .inner
            .registry
            .read()
            .values()
            .map(|entry| entry.cell.actor().clone())
            .collect();
        actors.sort_by(|a, b| a.id().cmp(b.id()));
        actors
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.registry.read().contains_key(id)
    }

    pub fn actor_status(&self, id: &str) -> Option<ActorStatus> {
        self.inner
            .registry
            .read()
            .get(id)
            .map(|entry| entry.cell.status())
    }

    pub fn actor_stats(&self, id: &str) -> Option<ActorStats> {
        let entry = self.inner.registry.read().get(id).cloned()?;
        Some(entry.cell.stats(entry.mailbox.len()))
    }

    /// Computes a metrics snapshot from the registry. Never waits on a dispatch loop.
    pub fn get_metrics(&self) -> SystemMetrics {
        let entries: Vec<Arc<ActorEntry>> =
            self.inner.registry.read().values().cloned().collect();
        let started_at = *self.inner.started_at.lock();
        let uptime = started_at.map(|at| at.elapsed()).unwrap_or_default();
        let lifetime = Lifetime {
            spawned: self.inner.spawned_total.load(Ordering::Relaxed),
            removed: self.inner.removed_total.load(Ordering::Relaxed),
            uptime,
        };

        SystemMetrics::aggregate(
            self.name(),
            entries
                .iter()
                .map(|entry| entry.cell.stats(entry.mailbox.len())),
            lifetime,
        )
    }

    /// Stops one actor: removes it from the registry, lets its in-flight message finish and
    /// waits (bounded by the shutdown timeout) for its loop to exit. Queued messages are
    /// discarded.
    ///
    /// An actor may stop itself from its own handler. The call then returns right away and
    /// the loop exits once the handler returns.
    pub async fn stop_actor(&self, id: &str) -> Result<(), RuntimeError> {
        let entry = self
            .inner
            .registry
            .write()
            .remove(id)
            .ok_or_else(|| RuntimeError::ActorNotFound(id.to_string()))?;
        self.inner.removed_total.fetch_add(1, Ordering::Relaxed);
        entry.cancel.cancel();

        if entry.cell.is_current_task() {
            info!(actor_id = %id, "Actor stopping itself");
            return Ok(());
        }
        info!(actor_id = %id, "Stopping actor");

        let handle = entry.handle.lock().take();
        if let Some(mut handle) = handle {
            let timeout = self.inner.config.shutdown_timeout();
            if tokio::time::timeout(timeout, &mut handle).await.is_err() {
                handle.abort();
                warn!(actor_id = %id, ?timeout, "Actor did not stop in time, aborted");
                return Err(RuntimeError::ShutdownTimeout { remaining: 1 });
            }
        }
        entry.cell.set_status(ActorStatus::Stopped);
        Ok(())
    }

    /// Shuts the system down.
    ///
    /// Every dispatch loop is cancelled, finishes the message it is currently handling and
    /// exits without draining its mailbox. Returns once every loop has exited. If that takes
    /// longer than the configured shutdown timeout, the remaining loops are aborted and
    /// [`RuntimeError::ShutdownTimeout`] is returned. A concurrent or repeated call waits
    /// for the same loops and returns the same outcome.
    ///
    /// Called from inside a handler, the shutdown continues on a separate task and `stop`
    /// returns right away, since the calling loop cannot exit before its handler returns.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        let from_handler = self
            .inner
            .registry
            .read()
            .values()
            .any(|entry| entry.cell.is_current_task());
        if from_handler {
            let system = self.clone();
            tokio::spawn(async move {
                if let Err(e) = system.shutdown().await {
                    warn!(system = %system.name(), error = %e, "Deferred stop failed");
                }
            });
            return Ok(());
        }
        self.shutdown().await
    }

    async fn shutdown(&self) -> Result<(), RuntimeError> {
        loop {
            match self.inner.state.compare_exchange(
                RUNNING,
                STOPPING,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(CREATED) => {
                    if self
                        .inner
                        .state
                        .compare_exchange(CREATED, STOPPED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        self.inner.shutdown.cancel();
                        self.inner.tracker.close();
                        self.inner.stopped.send_replace(Some(Ok(())));
                        info!(system = %self.name(), "Actor system stopped before start");
                        return Ok(());
                    }
                    // Lost a race with `start`; try again from RUNNING.
                }
                Err(_) => return self.await_stopped().await,
            }
        }

        let actors = self.inner.registry.read().len();
        info!(system = %self.name(), actors, "Stopping actor system");

        // Barrier: any spawn that saw RUNNING has finished registering.
        drop(self.inner.registry.write());
        self.inner.shutdown.cancel();
        self.inner.tracker.close();

        let timeout = self.inner.config.shutdown_timeout();
        let result = match tokio::time::timeout(timeout, self.inner.tracker.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let remaining = self.inner.tracker.len();
                error!(
                    system = %self.name(),
                    remaining,
                    ?timeout,
                    "Shutdown timed out, aborting loops"
                );
                let aborts: Vec<_> = self
                    .inner
                    .registry
                    .read()
                    .values()
                    .filter_map(|entry| {
                        entry.handle.lock().as_ref().map(JoinHandle::abort_handle)
                    })
                    .collect();
                for abort in aborts {
                    abort.abort();
                }
                let _ = tokio::time::timeout(ABORT_GRACE, self.inner.tracker.wait()).await;
                Err(RuntimeError::ShutdownTimeout { remaining })
            }
        };

        let drained: Vec<Arc<ActorEntry>> = self
            .inner
            .registry
            .write()
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in &drained {
            entry.cell.set_status(ActorStatus::Stopped);
        }
        self.inner
            .removed_total
            .fetch_add(drained.len() as u64, Ordering::Relaxed);

        self.inner.state.store(STOPPED, Ordering::Release);
        self.inner.stopped.send_replace(Some(result.clone()));
        info!(system = %self.name(), "Actor system stopped");
        result
    }

    /// Waits for the stop another caller is running and returns its outcome.
    async fn await_stopped(&self) -> Result<(), RuntimeError> {
        let mut stopped = self.inner.stopped.subscribe();
        let limit = self.inner.config.shutdown_timeout() + ABORT_GRACE * 2;
        let result = match tokio::time::timeout(limit, stopped.wait_for(Option::is_some)).await {
            Ok(Ok(outcome)) => outcome.clone().unwrap_or(Ok(())),
            // The first caller was dropped before it finished.
            _ => Err(RuntimeError::ShutdownTimeout {
                remaining: self.inner.tracker.len(),
            }),
        };
        result
    }

    fn ensure_running(&self) -> Result<(), RuntimeError> {
        match self.inner.state.load(Ordering::Acquire) {
            RUNNING => Ok(()),
            CREATED => Err(RuntimeError::NotStarted),
            _ => Err(RuntimeError::ActorSystemShutdown),
        }
    }

    /// Removes `cell`'s actor from the registry if it is still the registered incarnation.
    pub(crate) fn deregister(&self, cell: &Arc<ActorCell>) -> bool {
        let mut registry = self.inner.registry.write();
        let same = registry
            .get(cell.actor().id())
            .is_some_and(|entry| Arc::ptr_eq(&entry.cell, cell));
        if same {
            registry.remove(cell.actor().id());
            self.inner.removed_total.fetch_add(1, Ordering::Relaxed);
        }
        same
    }

    pub(crate) fn report_escalation(&self, report: EscalationReport) {
        let observer = self.inner.observer.read().clone();
        match observer {
            Some(observer) => observer.on_escalation(&report),
            None => warn!(
                actor_id = %report.actor.id(),
                reason = ?report.reason,
                error = %report.error,
                "Escalated failure with no observer attached"
            ),
        }
    }
}
