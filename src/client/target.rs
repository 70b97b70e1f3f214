//! Broker address resolution and MQTT options construction
//!
//! Pure functions for deriving the connection target from the caller's
//! inputs and the environment, separated from the I/O in [`super::bus`].

use rumqttc::MqttOptions;
use std::time::Duration;

/// Environment variable consulted when no explicit host is given.
pub const HOST_ENV_VAR: &str = "WOS_MQTT_HOST";

/// Host used when neither an explicit argument nor the environment
/// override is present, and the target of the single connect-time
/// fallback attempt.
pub const FALLBACK_HOST: &str = "localhost";

/// Fixed keep-alive interval for every bus connection.
pub const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Request-channel capacity handed to the rumqttc client.
const CLIENT_CHANNEL_CAPACITY: usize = 10;

/// Resolved `(host, port, keep-alive)` triple for one connect attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
}

impl ConnectionTarget {
    /// Derive the target for a connect call.
    ///
    /// Priority: explicit host argument, then the `WOS_MQTT_HOST`
    /// environment override, then `"localhost"`.
    pub fn resolve(explicit_host: Option<&str>, port: u16) -> Self {
        let env_override = std::env::var(HOST_ENV_VAR).ok();
        Self {
            host: resolve_host(explicit_host, env_override.as_deref()),
            port,
            keep_alive: KEEP_ALIVE,
        }
    }

    /// The fallback target tried once after this target fails: literal
    /// `"localhost"` on the same port.
    pub fn fallback(&self) -> Self {
        Self {
            host: FALLBACK_HOST.to_string(),
            port: self.port,
            keep_alive: self.keep_alive,
        }
    }

    /// Build rumqttc options for this target.
    ///
    /// The client id is unique per attempt so a fallback connection never
    /// collides with the half-open primary one on the broker side.
    pub fn mqtt_options(&self, app_label: &str) -> MqttOptions {
        let client_id = format!("wos-{}-{}", sanitize_label(app_label), uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options
    }

    /// Capacity for `AsyncClient::new`.
    pub fn channel_capacity(&self) -> usize {
        CLIENT_CHANNEL_CAPACITY
    }
}

/// Pure host resolution: first present, non-blank value wins.
///
/// Blank strings count as absent; an empty host falls through to the
/// next source.
pub fn resolve_host(explicit: Option<&str>, env_override: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .or_else(|| env_override.map(str::trim).filter(|h| !h.is_empty()))
        .unwrap_or(FALLBACK_HOST)
        .to_string()
}

/// MQTT client ids have a constrained alphabet on some brokers; keep the
/// label fragment to safe characters.
fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "app".to_string()
    } else {
        cleaned
    }
}
