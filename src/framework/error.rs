//! # Runtime Errors
//!
//! This module defines the error types returned by the actor runtime.
//!
//! Spawn-time and send-time failures ([`RuntimeError`]) are always returned synchronously
//! to the caller. Handler failures ([`HandlerError`]) never travel back to the sender; they
//! are consumed by the failing actor's supervision policy.

use std::fmt;

/// Errors returned by [`ActorSystem`](crate::framework::ActorSystem) operations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Actor already exists: {0}")]
    DuplicateActor(String),
    #[error("Invalid mailbox capacity: {0}")]
    InvalidCapacity(usize),
    #[error("Actor not found: {0}")]
    ActorNotFound(String),
    #[error("Mailbox full for actor: {0}")]
    MailboxFull(String),
    #[error("Actor system is shut down")]
    ActorSystemShutdown,
    #[error("Actor system has not been started")]
    NotStarted,
    #[error("Shutdown timed out with {remaining} dispatch loop(s) still running")]
    ShutdownTimeout { remaining: usize },
}

/// Failure signal returned by an [`ActorHandler`](crate::framework::ActorHandler).
///
/// The runtime treats the contents as opaque: it only logs the text and hands the
/// failure to the supervision policy. The optional source keeps the original error
/// around for observers that want to inspect it.
#[derive(Debug)]
pub struct HandlerError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an underlying error, using its `Display` output as the message.
    pub fn from_source<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::new(message)
    }
}

impl From<RuntimeError> for HandlerError {
    fn from(err: RuntimeError) -> Self {
        HandlerError::from_source(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::from_source(err)
    }
}
