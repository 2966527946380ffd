//! # Test Handlers
//!
//! Utilities for testing actors and the code that talks to them without hand-writing a
//! handler for every scenario.
//!
//! - [`MockHandler`] is scripted with expectations, one per message, in the order the
//!   messages are expected to arrive. Each expectation decides whether that message
//!   succeeds or fails (and optionally how long it takes). [`MockHandler::verify`] asserts
//!   that every expectation was consumed and nothing unexpected arrived.
//! - [`RecordingHandler`] accepts everything, records what it saw and can be told to fail
//!   on specific message kinds. It also counts `on_restart` calls.
//!
//! Both hand out an [`ActorHandler`] that is moved into the actor system while the test
//! keeps the original to inspect afterwards.
//!
//! # Example
//! ```ignore
//! let mut mock = MockHandler::new();
//! mock.expect_kind("boom").return_err("bad request");
//! mock.expect_kind("ping").return_ok();
//!
//! system.spawn_actor("matcher", "matcher", 8, mock.handler(), SupervisionPolicy::Restart)?;
//! // ... send "boom", then "ping", wait ...
//! mock.verify();
//! ```

use crate::framework::error::HandlerError;
use crate::framework::handler::{ActorContext, ActorHandler};
use crate::framework::message::Message;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

struct Expectation {
    kind: String,
    delay: Option<Duration>,
    response: Result<(), String>,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    observed: Vec<String>,
    unexpected: Vec<String>,
    restarts: usize,
}

/// An expectation-driven handler for fluent testing.
#[derive(Clone, Default)]
pub struct MockHandler {
    state: Arc<Mutex<MockState>>,
}

impl MockHandler {
    /// Creates a mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects the next message to have kind `kind`.
    pub fn expect_kind(&mut self, kind: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            kind: kind.into(),
            delay: None,
            state: self.state.clone(),
        }
    }

    /// Returns the handler to spawn. All handlers share this mock's state.
    pub fn handler(&self) -> MockActor {
        MockActor {
            state: self.state.clone(),
        }
    }

    /// Kinds of every message handled so far, in order.
    pub fn observed(&self) -> Vec<String> {
        self.state.lock().observed.clone()
    }

    pub fn restarts(&self) -> usize {
        self.state.lock().restarts
    }

    /// Panics unless every expectation was met and no unexpected message arrived.
    pub fn verify(&self) {
        let state = self.state.lock();
        if !state.unexpected.is_empty() {
            panic!("Unexpected messages: {:?}", state.unexpected);
        }
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }
}

/// Builder for a single expectation.
pub struct ExpectationBuilder {
    kind: String,
    delay: Option<Duration>,
    state: Arc<Mutex<MockState>>,
}

impl ExpectationBuilder {
    /// Makes the handler take `delay` before answering.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sets the expectation to succeed.
    pub fn return_ok(self) {
        self.push(Ok(()));
    }

    /// Sets the expectation to fail with `error`.
    pub fn return_err(self, error: impl Into<String>) {
        self.push(Err(error.into()));
    }

    fn push(self, response: Result<(), String>) {
        self.state.lock().expectations.push_back(Expectation {
            kind: self.kind,
            delay: self.delay,
            response,
        });
    }
}

/// The [`ActorHandler`] side of a [`MockHandler`].
pub struct MockActor {
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl ActorHandler for MockActor {
    async fn handle(&mut self, message: Message, _ctx: &ActorContext) -> Result<(), HandlerError> {
        let expectation = {
            let mut state = self.state.lock();
            state.observed.push(message.kind().to_string());
            state.expectations.pop_front()
        };

        match expectation {
            Some(exp) if exp.kind == message.kind() => {
                if let Some(delay) = exp.delay {
                    tokio::time::sleep(delay).await;
                }
                exp.response.map_err(HandlerError::new)
            }
            other => {
                let mut state = self.state.lock();
                state.unexpected.push(message.kind().to_string());
                if let Some(exp) = other {
                    // Keep the unmatched expectation for the next message.
                    state.expectations.push_front(exp);
                }
                Err(HandlerError::new(format!(
                    "unexpected message kind: {}",
                    message.kind()
                )))
            }
        }
    }

    async fn on_restart(&mut self, _ctx: &ActorContext) {
        self.state.lock().restarts += 1;
    }
}

// =============================================================================
// RECORDING HANDLER
// =============================================================================

#[derive(Default)]
struct Recording {
    messages: Vec<Message>,
    restarts: usize,
    stopped: bool,
}

/// Accepts every message and records it.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    recording: Arc<Mutex<Recording>>,
    failing_kinds: Arc<HashSet<String>>,
    delay: Option<Duration>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails (after recording) every message whose kind is in `kinds`.
    pub fn failing_on<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_kinds = Arc::new(kinds.into_iter().map(Into::into).collect());
        self
    }

    /// Makes every message take `delay` to handle.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the handler to spawn. It records into this handler's shared log.
    pub fn handler(&self) -> RecordingHandler {
        self.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.recording.lock().messages.clone()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.recording
            .lock()
            .messages
            .iter()
            .map(|m| m.kind().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.recording.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn restarts(&self) -> usize {
        self.recording.lock().restarts
    }

    /// Whether `on_stop` has run.
    pub fn stopped(&self) -> bool {
        self.recording.lock().stopped
    }
}

#[async_trait]
impl ActorHandler for RecordingHandler {
    async fn handle(&mut self, message: Message, _ctx: &ActorContext) -> Result<(), HandlerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let fail = self.failing_kinds.contains(message.kind());
        let kind = message.kind().to_string();
        self.recording.lock().messages.push(message);
        if fail {
            Err(HandlerError::new(format!("refusing {kind}")))
        } else {
            Ok(())
        }
    }

    async fn on_restart(&mut self, _ctx: &ActorContext) {
        self.recording.lock().restarts += 1;
    }

    async fn on_stop(&mut self, _ctx: &ActorContext) {
        self.recording.lock().stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;
    use crate::framework::{ActorSystem, SupervisionPolicy};
    use serde_json::json;

    async fn settle(mut done: impl FnMut() -> bool) {
        for _ in 0..200 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_mock_handler_with_expectations() {
        let system = ActorSystem::new("mock");
        system.start(&CancellationToken::new()).unwrap();

        let mut mock = MockHandler::new();
        mock.expect_kind("boom").return_err("bad request");
        mock.expect_kind("ping").return_ok();

        system
            .spawn_actor("matcher", "matcher", 8, mock.handler(), SupervisionPolicy::Restart)
            .unwrap();
        system.send_message("matcher", Message::new("boom", json!(null), None)).unwrap();
        system.send_message("matcher", Message::new("ping", json!(null), None)).unwrap();

        settle(|| mock.observed().len() == 2).await;
        mock.verify();
        assert_eq!(mock.restarts(), 1);

        system.stop().await.unwrap();
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected messages")]
    async fn test_mock_handler_flags_unexpected_kind() {
        let system = ActorSystem::new("mock-unexpected");
        system.start(&CancellationToken::new()).unwrap();

        let mut mock = MockHandler::new();
        mock.expect_kind("ping").return_ok();
        system
            .spawn_actor("driver", "d-1", 8, mock.handler(), SupervisionPolicy::Resume)
            .unwrap();
        system.send_message("d-1", Message::new("pong", json!(null), None)).unwrap();

        settle(|| !mock.observed().is_empty()).await;
        system.stop().await.unwrap();
        mock.verify();
    }

    #[tokio::test]
    async fn test_recording_handler_fails_on_kind() {
        let system = ActorSystem::new("recording");
        system.start(&CancellationToken::new()).unwrap();

        let recorder = RecordingHandler::new().failing_on(["boom"]);
        system
            .spawn_actor("driver", "d-1", 8, recorder.handler(), SupervisionPolicy::Resume)
            .unwrap();
        for kind in ["a", "boom", "b"] {
            system.send_message("d-1", Message::new(kind, json!(null), None)).unwrap();
        }

        settle(|| recorder.len() == 3).await;
        assert_eq!(recorder.kinds(), vec!["a", "boom", "b"]);
        assert_eq!(recorder.restarts(), 0);

        system.stop().await.unwrap();
        assert!(recorder.stopped());
    }
}
