//! # Actors and the Dispatch Loop
//!
//! This module defines what callers see of an actor ([`ActorRef`], [`ActorStatus`],
//! [`ActorStats`]) and the machinery behind it: the shared per-actor bookkeeping
//! (`ActorCell`) and the `DispatchLoop` that drains one actor's mailbox.
//!
//! ## Concurrency Model
//!
//! Every actor gets its own Tokio task running a dispatch loop. The loop is the only
//! consumer of the actor's mailbox and invokes the handler for one message at a time, so a
//! single actor never processes two messages concurrently. Loops of different actors never
//! share a mailbox and never wait on each other, which is why a slow handler only ever
//! delays its own actor.
//!
//! The loop suspends in exactly one place: waiting for the next message or for its
//! cancellation token. The handler itself runs to completion; cancellation is only observed
//! between messages.

use crate::framework::handler::{ActorContext, ActorHandler};
use crate::framework::mailbox::MailboxReceiver;
use crate::framework::message::MessageId;
use crate::framework::supervision::{
    Directive, EscalationReason, EscalationReport, RestartHistory, RestartLimit,
    SupervisionPolicy,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::task::{AbortHandle, Id};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, error, info, warn, Instrument};

/// Opaque, immutable handle to an actor: identity and type tag only.
///
/// It never exposes the mailbox or the handler; all interaction goes through
/// [`ActorSystem::send_message`](crate::framework::ActorSystem::send_message).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ActorRef {
    id: String,
    actor_type: String,
}

impl ActorRef {
    pub(crate) fn new(id: impl Into<String>, actor_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            actor_type: actor_type.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }
}

impl std::fmt::Display for ActorRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.id)
    }
}

/// Lifecycle status of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ActorStatus {
    Starting,
    Running,
    Restarting,
    Stopped,
    Failed,
}

impl ActorStatus {
    fn as_u8(self) -> u8 {
        match self {
            ActorStatus::Starting => 0,
            ActorStatus::Running => 1,
            ActorStatus::Restarting => 2,
            ActorStatus::Stopped => 3,
            ActorStatus::Failed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => ActorStatus::Starting,
            1 => ActorStatus::Running,
            2 => ActorStatus::Restarting,
            3 => ActorStatus::Stopped,
            _ => ActorStatus::Failed,
        }
    }
}

/// Point-in-time counters for one actor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActorStats {
    pub actor: ActorRef,
    pub policy: SupervisionPolicy,
    pub status: ActorStatus,
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
    pub restarts: u64,
    pub queued: usize,
}

/// Bookkeeping shared between the registry and the actor's dispatch loop.
///
/// Status and counters are atomics so metrics can read them without ever waiting on the
/// handler.
#[derive(Debug)]
pub(crate) struct ActorCell {
    actor: ActorRef,
    policy: SupervisionPolicy,
    status: AtomicU8,
    received: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    restarts: AtomicU64,
    loop_task: OnceLock<Id>,
}

impl ActorCell {
    pub(crate) fn new(actor: ActorRef, policy: SupervisionPolicy) -> Self {
        Self {
            actor,
            policy,
            status: AtomicU8::new(ActorStatus::Starting.as_u8()),
            received: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            restarts: AtomicU64::new(0),
            loop_task: OnceLock::new(),
        }
    }

    pub(crate) fn actor(&self) -> &ActorRef {
        &self.actor
    }

    pub(crate) fn status(&self) -> ActorStatus {
        ActorStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set_status(&self, status: ActorStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
    }

    /// Moves `from -> to` only if the actor is still in `from`.
    pub(crate) fn transition(&self, from: ActorStatus, to: ActorStatus) -> bool {
        self.status
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the caller is running inside this actor's dispatch loop, i.e. in its handler.
    pub(crate) fn is_current_task(&self) -> bool {
        match (self.loop_task.get(), tokio::task::try_id()) {
            (Some(loop_task), Some(current)) => *loop_task == current,
            _ => false,
        }
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Undoes `record_received` for a send the mailbox rejected.
    pub(crate) fn unrecord_received(&self) {
        self.received.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn stats(&self, queued: usize) -> ActorStats {
        ActorStats {
            actor: self.actor.clone(),
            policy: self.policy,
            status: self.status(),
            received: self.received.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            queued,
        }
    }
}

/// The failed message that ended a dispatch loop.
struct Failure {
    message_id: Option<MessageId>,
    message_kind: Option<String>,
    error: String,
}

enum Exit {
    /// Cancelled by `stop`/`stop_actor`, or the mailbox was closed.
    Cancelled,
    /// Supervision ended the actor (`Stop`, `Escalate` or `GiveUp`).
    Supervised(Directive, Failure),
    /// `on_start` failed.
    StartFailed(Failure),
}

/// The sequential consumer of one actor's mailbox.
pub(crate) struct DispatchLoop {
    cell: Arc<ActorCell>,
    handler: Box<dyn ActorHandler>,
    mailbox: MailboxReceiver,
    ctx: ActorContext,
    cancel: CancellationToken,
    limit: RestartLimit,
    history: RestartHistory,
}

impl DispatchLoop {
    pub(crate) fn new(
        cell: Arc<ActorCell>,
        handler: Box<dyn ActorHandler>,
        mailbox: MailboxReceiver,
        ctx: ActorContext,
        cancel: CancellationToken,
        limit: RestartLimit,
    ) -> Self {
        Self {
            cell,
            handler,
            mailbox,
            ctx,
            cancel,
            limit,
            history: RestartHistory::default(),
        }
    }

    /// Runs the loop on its own task and watches it.
    ///
    /// A panicking handler unwinds out of the loop task; the watcher sees the panic in the
    /// `JoinError`, marks the actor `Failed` and removes it from the registry so it is
    /// never left as a phantom entry. Aborting the watcher aborts the loop with it.
    pub(crate) async fn run(self) {
        let cell = self.cell.clone();
        let ctx = self.ctx.clone();
        let task = tokio::spawn(self.run_loop());
        let _abort = AbortOnDrop(task.abort_handle());

        match task.await {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                let actor = cell.actor().clone();
                ctx.system().deregister(&cell);
                cell.set_status(ActorStatus::Failed);
                error!(
                    actor_id = %actor.id(),
                    actor_type = %actor.actor_type(),
                    "Handler panicked"
                );
                ctx.system().report_escalation(EscalationReport {
                    actor,
                    reason: EscalationReason::Crashed,
                    error: "handler panicked".to_string(),
                    message_id: None,
                    message_kind: None,
                });
            }
            Err(_) => {
                ctx.system().deregister(&cell);
                cell.set_status(ActorStatus::Stopped);
                warn!(actor_id = %cell.actor().id(), "Dispatch loop aborted");
            }
        }
    }

    async fn run_loop(mut self) {
        let actor_id = self.cell.actor().id().to_owned();
        let actor_type = self.cell.actor().actor_type().to_owned();
        let _ = self.cell.loop_task.set(tokio::task::id());
        debug!(%actor_id, %actor_type, "Dispatch loop started");

        let exit = self.dispatch().await;

        let final_status = match &exit {
            Exit::Cancelled => ActorStatus::Stopped,
            Exit::Supervised(directive, _) => directive.next_status(),
            Exit::StartFailed(_) => ActorStatus::Failed,
        };
        self.cell.set_status(final_status);
        self.ctx.system().deregister(&self.cell);

        let discarded = self.mailbox.close_and_discard();
        if discarded > 0 {
            warn!(%actor_id, discarded, "Discarded queued messages");
        }

        self.handler.on_stop(&self.ctx).await;

        match exit {
            Exit::Cancelled => info!(%actor_id, %actor_type, "Actor stopped"),
            Exit::Supervised(Directive::Escalate, failure) => {
                error!(%actor_id, %actor_type, error = %failure.error, "Escalating failure");
                self.report(EscalationReason::Escalated, failure);
            }
            Exit::Supervised(Directive::GiveUp, failure) => {
                error!(
                    %actor_id,
                    %actor_type,
                    max_restarts = self.limit.max_restarts,
                    error = %failure.error,
                    "Restart limit exceeded"
                );
                self.report(EscalationReason::RestartLimitExceeded, failure);
            }
            Exit::Supervised(_, failure) => info!(
                %actor_id,
                %actor_type,
                error = %failure.error,
                "Actor stopped by supervision"
            ),
            Exit::StartFailed(failure) => {
                error!(%actor_id, %actor_type, error = %failure.error, "on_start failed");
                self.report(EscalationReason::Crashed, failure);
            }
        }
    }

    async fn dispatch(&mut self) -> Exit {
        if let Err(e) = self.handler.on_start(&self.ctx).await {
            return Exit::StartFailed(Failure {
                message_id: None,
                message_kind: None,
                error: e.to_string(),
            });
        }

        while let Some(message) = self.mailbox.dequeue(&self.cancel).await {
            let message_id = message.id();
            let kind = message.kind().to_owned();
            let span = debug_span!("dispatch", actor_id = %self.cell.actor().id(), %kind);

            match self.handler.handle(message, &self.ctx).instrument(span).await {
                Ok(()) => {
                    self.cell.processed.fetch_add(1, Ordering::Relaxed);
                    debug!(actor_id = %self.cell.actor().id(), %kind, %message_id, "Processed");
                }
                Err(e) => {
                    self.cell.failed.fetch_add(1, Ordering::Relaxed);
                    let now = Instant::now();
                    let recent = self.history.recent(now, self.limit.window);
                    let directive = self.cell.policy.decide(recent, self.limit);
                    warn!(
                        actor_id = %self.cell.actor().id(),
                        %kind,
                        %message_id,
                        error = %e,
                        ?directive,
                        "Handler failed"
                    );

                    match directive {
                        Directive::Resume => {}
                        Directive::Restart => self.restart(now).await,
                        Directive::Stop | Directive::Escalate | Directive::GiveUp => {
                            return Exit::Supervised(
                                directive,
                                Failure {
                                    message_id: Some(message_id),
                                    message_kind: Some(kind),
                                    error: e.to_string(),
                                },
                            );
                        }
                    }
                }
            }
        }

        Exit::Cancelled
    }

    async fn restart(&mut self, now: Instant) {
        self.cell.set_status(ActorStatus::Restarting);
        self.handler.on_restart(&self.ctx).await;
        self.history.record(now);
        let restarts = self.cell.restarts.fetch_add(1, Ordering::Relaxed) + 1;
        self.cell.transition(ActorStatus::Restarting, ActorStatus::Running);
        info!(actor_id = %self.cell.actor().id(), restarts, "Actor restarted");
    }

    fn report(&self, reason: EscalationReason, failure: Failure) {
        self.ctx.system().report_escalation(EscalationReport {
            actor: self.cell.actor().clone(),
            reason,
            error: failure.error,
            message_id: failure.message_id,
            message_kind: failure.message_kind,
        });
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip_through_cell() {
        let cell = ActorCell::new(ActorRef::new("driver-1", "driver"), SupervisionPolicy::Stop);
        assert_eq!(cell.status(), ActorStatus::Starting);

        assert!(cell.transition(ActorStatus::Starting, ActorStatus::Running));
        assert!(!cell.transition(ActorStatus::Starting, ActorStatus::Running));
        assert_eq!(cell.status(), ActorStatus::Running);

        cell.set_status(ActorStatus::Failed);
        assert_eq!(cell.status(), ActorStatus::Failed);
    }

    #[test]
    fn test_stats_snapshot() {
        let cell = ActorCell::new(ActorRef::new("p-1", "passenger"), SupervisionPolicy::Restart);
        cell.record_received();
        cell.record_received();
        cell.unrecord_received();

        let stats = cell.stats(4);
        assert_eq!(stats.actor.to_string(), "passenger/p-1");
        assert_eq!(stats.received, 1);
        assert_eq!(stats.queued, 4);
        assert_eq!(stats.policy, SupervisionPolicy::Restart);
    }
}
