//! # Supervision
//!
//! What happens to an actor when its handler fails.
//!
//! A [`SupervisionPolicy`] is attached at spawn time and governs the actor for its whole
//! lifetime. On every failure the dispatch loop asks [`SupervisionPolicy::decide`] for a
//! [`Directive`]; the decision is a pure function of the policy, the number of restarts
//! already performed inside the current window and the configured [`RestartLimit`].
//!
//! | Policy     | Directive                          | Next status |
//! |------------|------------------------------------|-------------|
//! | `Restart`  | `Restart` (or `GiveUp` past limit) | `Running` (`Failed`) |
//! | `Resume`   | `Resume`                           | `Running`   |
//! | `Stop`     | `Stop`                             | `Stopped`   |
//! | `Escalate` | `Escalate`                         | `Stopped`   |
//!
//! The failed message is never retried, and queued messages are neither replayed nor
//! dropped by a restart.

use crate::framework::actor::{ActorRef, ActorStatus};
use crate::framework::message::MessageId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Strategy applied when an actor's handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupervisionPolicy {
    /// Reset handler state (via `on_restart`) and keep consuming the mailbox.
    Restart,
    /// Keep consuming the mailbox without touching handler state.
    Resume,
    /// Stop the actor and discard its mailbox.
    Stop,
    /// Report the failure to the system's failure observer, then stop.
    Escalate,
}

/// Outcome of a supervision decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Restart,
    Resume,
    Stop,
    Escalate,
    /// Restart was requested but the restart limit is exhausted.
    GiveUp,
}

impl Directive {
    /// Status the actor ends up in once the directive has been applied.
    pub fn next_status(self) -> ActorStatus {
        match self {
            Directive::Restart | Directive::Resume => ActorStatus::Running,
            Directive::Stop | Directive::Escalate => ActorStatus::Stopped,
            Directive::GiveUp => ActorStatus::Failed,
        }
    }
}

/// Maximum number of restarts allowed inside a sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartLimit {
    pub max_restarts: u32,
    pub window: Duration,
}

impl Default for RestartLimit {
    fn default() -> Self {
        Self {
            max_restarts: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl SupervisionPolicy {
    pub fn decide(self, recent_restarts: usize, limit: RestartLimit) -> Directive {
        match self {
            SupervisionPolicy::Restart if recent_restarts >= limit.max_restarts as usize => {
                Directive::GiveUp
            }
            SupervisionPolicy::Restart => Directive::Restart,
            SupervisionPolicy::Resume => Directive::Resume,
            SupervisionPolicy::Stop => Directive::Stop,
            SupervisionPolicy::Escalate => Directive::Escalate,
        }
    }
}

/// Sliding-window record of restart instants, owned by one dispatch loop.
#[derive(Debug, Default)]
pub(crate) struct RestartHistory {
    restarts: VecDeque<Instant>,
}

impl RestartHistory {
    /// Restarts still inside `window` as of `now`. Older entries are pruned.
    pub(crate) fn recent(&mut self, now: Instant, window: Duration) -> usize {
        while let Some(&oldest) = self.restarts.front() {
            if now.duration_since(oldest) > window {
                self.restarts.pop_front();
            } else {
                break;
            }
        }
        self.restarts.len()
    }

    pub(crate) fn record(&mut self, at: Instant) {
        self.restarts.push_back(at);
    }
}

/// Why a failure reached the failure observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EscalationReason {
    /// The actor's policy is `Escalate`.
    Escalated,
    /// A `Restart` actor failed more often than its restart limit allows.
    RestartLimitExceeded,
    /// The handler panicked or failed in `on_start`.
    Crashed,
}

/// Failure details handed to a [`FailureObserver`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EscalationReport {
    pub actor: ActorRef,
    pub reason: EscalationReason,
    pub error: String,
    pub message_id: Option<MessageId>,
    pub message_kind: Option<String>,
}

/// Receives failures that supervision surfaces outside the failing actor.
///
/// Called from the failing actor's dispatch loop, so implementations should return quickly.
pub trait FailureObserver: Send + Sync {
    fn on_escalation(&self, report: &EscalationReport);
}
