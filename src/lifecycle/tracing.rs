//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging for the whole process. Call it once,
//! at the top of `main`.
//!
//! ## Configuration
//!
//! Log levels come from `RUST_LOG`. The output uses the compact format without the module
//! prefix (`with_target(false)`); the structured fields already say which actor a line is
//! about.
//!
//! ```bash
//! # Lifecycle only: system start/stop, spawns, restarts, actor exits
//! RUST_LOG=info cargo run
//!
//! # Every dispatched message, inside its `dispatch` span
//! RUST_LOG=debug cargo run
//!
//! # Runtime internals only
//! RUST_LOG=ride_actors::framework=debug cargo run
//! ```
//!
//! ## What Gets Traced
//!
//! | Level   | Events                                                                 |
//! |---------|------------------------------------------------------------------------|
//! | `info`  | system start/stop, actor spawned/stopped/restarted, trips matched      |
//! | `debug` | each processed message (`actor_id`, `kind`, `message_id`)              |
//! | `warn`  | handler failures, full mailboxes, discarded queued messages            |
//! | `error` | escalations, restart limit exceeded, panicking handlers, stop timeout  |
//!
//! ## Example Output
//!
//! With `RUST_LOG=debug`, a failing message under the `Restart` policy reads:
//!
//! ```text
//! INFO Actor spawned actor_id=driver-1 actor_type=driver capacity=256 policy=Restart
//! DEBUG dispatch: Processed actor_id=driver-1 kind=location_update message_id=6f1c...
//! WARN Handler failed actor_id=driver-1 kind=honk error=Unsupported message kind: honk
//!     directive=Restart
//! INFO Actor restarted actor_id=driver-1 restarts=1
//! ```
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
