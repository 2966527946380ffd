//! Runtime orchestration and lifecycle management.
//!
//! # Main Components
//!
//! - [`RideSystem`] - Starts the actor system, spawns the matcher and wires the client
//! - [`MetricsCollector`] - Polls system metrics on an interval
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod metrics_collector;
pub mod ride_system;
pub mod tracing;

pub use metrics_collector::*;
pub use ride_system::*;
pub use self::tracing::*;
