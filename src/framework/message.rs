//! # Messages
//!
//! The immutable envelope delivered to actors.
//!
//! A [`Message`] is stamped with a unique identity and a creation time when it is built and
//! is never mutated afterwards: every field is private and only exposed through getters.
//! Because of that, a delivered message can be shared with observers (metrics, tracing)
//! without synchronization.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identity of a message.
pub type MessageId = Uuid;

/// An immutable message envelope.
///
/// The payload is opaque to the runtime. It is carried as a JSON value so the service layer
/// can build messages straight from inbound requests; [`Message::typed`] and
/// [`Message::payload_as`] convert to and from strongly typed payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    kind: String,
    payload: Value,
    sender: Option<String>,
    correlation_id: Option<String>,
    trace_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl Message {
    /// Builds a message from a kind, an opaque payload and an optional sender identity.
    pub fn new(kind: impl Into<String>, payload: Value, sender: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            payload,
            sender: sender.map(str::to_owned),
            correlation_id: None,
            trace_id: None,
            created_at: Utc::now(),
        }
    }

    /// Builds a message whose payload is the JSON form of `payload`.
    pub fn typed<T: Serialize>(
        kind: impl Into<String>,
        payload: &T,
        sender: Option<&str>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_value(payload)?, sender))
    }

    /// Attaches a correlation identifier while the message is still being built.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Attaches a trace identifier while the message is still being built.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Decodes the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
