//! Generic actor runtime.
//!
//! This module provides the building blocks for running many independent actors, each
//! with a bounded mailbox, a sequential dispatch loop and a supervision policy, under one
//! explicitly constructed [`ActorSystem`].
//!
//! # Main Components
//!
//! - [`ActorSystem`] - Registry and lifecycle coordinator (spawn, send, list, metrics, stop)
//! - [`ActorHandler`] - Trait that business logic implements to receive messages
//! - [`Message`] - Immutable envelope with a JSON payload
//! - [`SupervisionPolicy`] - What happens to an actor after a failed message
//! - [`SystemMetrics`] - Read-only snapshot of the whole system
//! - [`RuntimeError`] / [`HandlerError`] - Error types
//!
//! # Testing
//!
//! See the [`mock`] module for scripted and recording handlers.

pub mod actor;
pub mod error;
pub mod handler;
pub(crate) mod mailbox;
pub mod message;
pub mod metrics;
pub mod mock;
pub mod supervision;
pub mod system;

pub use actor::{ActorRef, ActorStats, ActorStatus};
pub use error::{HandlerError, RuntimeError};
pub use handler::{handler_fn, ActorContext, ActorHandler, HandlerFn};
pub use message::{Message, MessageId};
pub use metrics::{StatusCounts, SystemMetrics};
pub use supervision::{
    Directive, EscalationReason, EscalationReport, FailureObserver, RestartLimit,
    SupervisionPolicy,
};
pub use system::ActorSystem;
