//! # Ride Actors
//!
//! > **An in-process actor runtime for ride matching, built on Tokio.**
//!
//! Every driver, passenger and the matcher is an independent actor with a bounded mailbox.
//! Actors run concurrently with each other, handle their own messages strictly one at a
//! time and in arrival order, and recover from failed messages according to a supervision
//! policy.
//!
//! ## 🚀 Core Concepts
//!
//! ### Handlers, not actors
//! Business logic implements [`ActorHandler`](framework::ActorHandler). The runtime owns
//! the mailbox, the task and the bookkeeping; the handler only ever sees one message at a
//! time through `&mut self`, so its state needs no locks.
//!
//! ### Backpressure instead of buffering
//! [`send_message`](framework::ActorSystem::send_message) never waits. A full mailbox is
//! reported to the caller as [`MailboxFull`](framework::RuntimeError::MailboxFull) and the
//! caller decides whether to retry, drop or fail upstream.
//!
//! ### Supervision
//! A handler returning `Err` is routed to the actor's
//! [`SupervisionPolicy`](framework::SupervisionPolicy): keep going (`Resume`), reset and
//! keep going (`Restart`), stop (`Stop`) or stop and notify the observer (`Escalate`).
//! Restarts are capped per time window; a panicking handler takes down only its own actor.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! The generic runtime: [`ActorSystem`](framework::ActorSystem), mailboxes, dispatch loops,
//! supervision and metrics. It knows nothing about rides.
//!
//! ### 2. The Domain ([`rides`])
//! [`DriverHandler`](rides::DriverHandler), [`PassengerHandler`](rides::PassengerHandler)
//! and [`MatcherHandler`](rides::MatcherHandler), plus the shared
//! [`TripBook`](rides::TripBook).
//!
//! ### 3. The Interface ([`clients`])
//! [`RideClient`](clients::RideClient) turns service-layer calls into messages and runtime
//! errors into [`RideError`](rides::RideError).
//!
//! ### 4. The Orchestrator ([`lifecycle`])
//! [`RideSystem`](lifecycle::RideSystem) starts everything from a
//! [`SystemConfig`](config::SystemConfig) and shuts it down again.
//!
//! ## Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test
//! ```

pub mod clients;
pub mod config;
pub mod framework;
pub mod lifecycle;
pub mod rides;
