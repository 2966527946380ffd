use crate::framework::{ActorStats, ActorStatus, ActorSystem, Message, RuntimeError};

/// Trait for domain clients to inherit the common operations on the actor system.
///
/// Implementors only provide access to the system and an error mapping; sending and
/// status lookups come for free.
pub trait ActorClient: Send + Sync {
    /// The domain-specific error type.
    type Error: From<RuntimeError> + Send + Sync;

    /// Access the underlying actor system.
    fn system(&self) -> &ActorSystem;

    /// Map runtime errors to the domain error type.
    fn map_error(e: RuntimeError) -> Self::Error {
        e.into()
    }

    /// Send a message to an actor.
    #[tracing::instrument(skip(self, message), fields(kind = %message.kind()))]
    fn send(&self, id: &str, message: Message) -> Result<(), Self::Error> {
        tracing::debug!("Sending message");
        self.system().send_message(id, message).map_err(Self::map_error)
    }

    /// Current status of an actor, or `None` if it is not registered.
    fn status(&self, id: &str) -> Option<ActorStatus> {
        self.system().actor_status(id)
    }

    fn stats(&self, id: &str) -> Option<ActorStats> {
        self.system().actor_stats(id)
    }
}
