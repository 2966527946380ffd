//! # Actor Handlers
//!
//! The behaviour of an actor is supplied by the caller as an [`ActorHandler`]: a capability
//! that processes one [`Message`] at a time and reports success or failure. The runtime only
//! depends on this trait, never on the concrete business types behind it.
//!
//! # Provided Methods (Hooks)
//! Besides [`ActorHandler::handle`], the trait has lifecycle hooks with default
//! implementations that do nothing:
//! - [`ActorHandler::on_start`] runs inside the dispatch loop before the first message.
//! - [`ActorHandler::on_restart`] runs after a failure under the `Restart` policy. Handlers
//!   that keep state across messages should reset it here. It is **not** called under
//!   `Resume`.
//! - [`ActorHandler::on_stop`] runs once when the loop exits.
//!
//! For stateless behaviour, [`handler_fn`] turns a closure into a handler.

use crate::framework::actor::ActorRef;
use crate::framework::error::{HandlerError, RuntimeError};
use crate::framework::message::Message;
use crate::framework::system::ActorSystem;
use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Processes one message at a time on behalf of a single actor.
///
/// The dispatch loop never calls `handle` concurrently for the same actor, so `&mut self`
/// state needs no locking.
///
/// # Cancellation
/// The runtime cannot interrupt a handler mid-execution. Handlers doing long-running work
/// should check [`ActorContext::is_cancelled`] (or race [`ActorContext::cancelled`]) and
/// return early when the actor is being stopped.
#[async_trait]
pub trait ActorHandler: Send + 'static {
    /// Handles one message. An `Err` is routed to the actor's supervision policy.
    async fn handle(&mut self, message: Message, ctx: &ActorContext) -> Result<(), HandlerError>;

    /// Called once before the first message is dequeued. A failure here marks the actor
    /// `Failed` and removes it.
    async fn on_start(&mut self, _ctx: &ActorContext) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Called after a failed message when the policy decides to restart.
    async fn on_restart(&mut self, _ctx: &ActorContext) {}

    /// Called once when the dispatch loop exits, whatever the reason.
    async fn on_stop(&mut self, _ctx: &ActorContext) {}
}

/// What a handler sees of its own actor and of the system around it.
#[derive(Clone)]
pub struct ActorContext {
    myself: ActorRef,
    system: ActorSystem,
    cancel: CancellationToken,
}

impl ActorContext {
    pub(crate) fn new(myself: ActorRef, system: ActorSystem, cancel: CancellationToken) -> Self {
        Self {
            myself,
            system,
            cancel,
        }
    }

    pub fn myself(&self) -> &ActorRef {
        &self.myself
    }

    pub fn system(&self) -> &ActorSystem {
        &self.system
    }

    /// Sends `message` to another actor through the system.
    pub fn send(&self, id: &str, message: Message) -> Result<(), RuntimeError> {
        self.system.send_message(id, message)
    }

    /// Builds a typed message with this actor as sender and sends it to `id`.
    pub fn tell<T: Serialize>(
        &self,
        id: &str,
        kind: &str,
        payload: &T,
    ) -> Result<(), HandlerError> {
        let message = Message::typed(kind, payload, Some(self.myself.id()))?;
        self.send(id, message)?;
        Ok(())
    }

    /// True once this actor (or the whole system) is stopping.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when this actor (or the whole system) starts stopping.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Handler built from a synchronous closure. See [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

/// Adapts a closure into an [`ActorHandler`].
///
/// ```rust
/// use ride_actors::framework::{handler_fn, HandlerError};
///
/// let handler = handler_fn(|msg| match msg.kind() {
///     "boom" => Err(HandlerError::new("boom")),
///     _ => Ok(()),
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: FnMut(&Message) -> Result<(), HandlerError> + Send + 'static,
{
    HandlerFn { f }
}

#[async_trait]
impl<F> ActorHandler for HandlerFn<F>
where
    F: FnMut(&Message) -> Result<(), HandlerError> + Send + 'static,
{
    async fn handle(&mut self, message: Message, _ctx: &ActorContext) -> Result<(), HandlerError> {
        (self.f)(&message)
    }
}
