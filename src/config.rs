//! # Configuration
//!
//! [`SystemConfig`] holds the tunables of an actor system. Every field has a default, so a
//! partial config file (or none at all) is enough:
//!
//! ```rust
//! use ride_actors::config::SystemConfig;
//!
//! let config: SystemConfig = serde_json::from_str(r#"{ "shutdown_timeout_ms": 250 }"#).unwrap();
//! assert_eq!(config.shutdown_timeout().as_millis(), 250);
//! assert_eq!(config.default_mailbox_capacity, 256);
//! ```
//!
//! ## Environment Variables
//!
//! [`SystemConfig::from_env`] overlays `RIDE_ACTORS_*` variables on the defaults:
//!
//! | Variable                                  | Field                      |
//! |-------------------------------------------|----------------------------|
//! | `RIDE_ACTORS_NAME`                        | `name`                     |
//! | `RIDE_ACTORS_DEFAULT_MAILBOX_CAPACITY`    | `default_mailbox_capacity` |
//! | `RIDE_ACTORS_MAX_MAILBOX_CAPACITY`        | `max_mailbox_capacity`     |
//! | `RIDE_ACTORS_SHUTDOWN_TIMEOUT_MS`         | `shutdown_timeout_ms`      |
//! | `RIDE_ACTORS_MAX_RESTARTS`                | `max_restarts`             |
//! | `RIDE_ACTORS_RESTART_WINDOW_MS`           | `restart_window_ms`        |
//! | `RIDE_ACTORS_METRICS_INTERVAL_MS`         | `metrics_interval_ms`      |
//!
//! Values that fail to parse are ignored with a warning.

use crate::framework::RestartLimit;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

const ENV_PREFIX: &str = "RIDE_ACTORS_";

/// Tunables for an [`ActorSystem`](crate::framework::ActorSystem).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub name: String,
    /// Capacity used by callers that do not pick one (e.g. the ride client).
    pub default_mailbox_capacity: usize,
    /// Spawns asking for a larger mailbox fail with `InvalidCapacity`.
    pub max_mailbox_capacity: usize,
    /// Upper bound on how long `stop` waits for dispatch loops.
    pub shutdown_timeout_ms: u64,
    pub max_restarts: u32,
    pub restart_window_ms: u64,
    pub metrics_interval_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "ride-actors".to_string(),
            default_mailbox_capacity: 256,
            max_mailbox_capacity: 1 << 20,
            shutdown_timeout_ms: 5_000,
            max_restarts: 10,
            restart_window_ms: 60_000,
            metrics_interval_ms: 1_000,
        }
    }
}

impl SystemConfig {
    /// Defaults overlaid with `RIDE_ACTORS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each `RIDE_ACTORS_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(name) = lookup(&format!("{ENV_PREFIX}NAME")) {
            config.name = name;
        }
        overlay(&lookup, "DEFAULT_MAILBOX_CAPACITY", &mut config.default_mailbox_capacity);
        overlay(&lookup, "MAX_MAILBOX_CAPACITY", &mut config.max_mailbox_capacity);
        overlay(&lookup, "SHUTDOWN_TIMEOUT_MS", &mut config.shutdown_timeout_ms);
        overlay(&lookup, "MAX_RESTARTS", &mut config.max_restarts);
        overlay(&lookup, "RESTART_WINDOW_MS", &mut config.restart_window_ms);
        overlay(&lookup, "METRICS_INTERVAL_MS", &mut config.metrics_interval_ms);
        config
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_interval_ms)
    }

    pub fn restart_limit(&self) -> RestartLimit {
        RestartLimit {
            max_restarts: self.max_restarts,
            window: Duration::from_millis(self.restart_window_ms),
        }
    }
}

fn overlay<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, suffix: &str, slot: &mut T) {
    let key = format!("{ENV_PREFIX}{suffix}");
    if let Some(raw) = lookup(&key) {
        match raw.trim().parse() {
            Ok(value) => *slot = value,
            Err(_) => warn!(%key, %raw, "Ignoring unparseable config value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SystemConfig::default();
        assert_eq!(config.default_mailbox_capacity, 256);
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.restart_limit(), RestartLimit::default());
    }

    #[test]
    fn test_lookup_overlay() {
        let vars: HashMap<String, String> = [
            ("RIDE_ACTORS_NAME", "dispatch-eu"),
            ("RIDE_ACTORS_SHUTDOWN_TIMEOUT_MS", "1500"),
            ("RIDE_ACTORS_MAX_RESTARTS", "not-a-number"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = SystemConfig::from_lookup(|key| vars.get(key).cloned());
        assert_eq!(config.name, "dispatch-eu");
        assert_eq!(config.shutdown_timeout_ms, 1500);
        assert_eq!(config.max_restarts, 10);
    }
}
