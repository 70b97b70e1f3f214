//! Configuration for the probe binary
//!
//! TOML configuration used by `wos-probe`; the library API takes its
//! inputs as arguments and does not read config files itself.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeConfig {
    pub bus: BusSection,
    /// Topic filters subscribed at startup.
    #[serde(default)]
    pub subscriptions: Vec<String>,
}

/// Bus section: where and how to connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusSection {
    /// Explicit broker host. When absent the client resolves through the
    /// `WOS_MQTT_HOST` environment override before defaulting to
    /// localhost.
    pub host: Option<String>,
    /// Broker port, required.
    pub port: u16,
    /// Durable log sink path (default: `wos.log`).
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_log_file() -> PathBuf {
    PathBuf::from(crate::logger::DEFAULT_LOG_PATH)
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ProbeConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_applies_defaults() {
        let toml_content = r#"
[bus]
port = 1883
"#;
        let config: ProbeConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.bus.host, None);
        assert_eq!(config.bus.port, 1883);
        assert_eq!(config.bus.log_file, PathBuf::from("wos.log"));
        assert!(config.subscriptions.is_empty());
    }

    #[test]
    fn full_config_round_trips() {
        let toml_content = r#"
subscriptions = ["vos/app/#", "vos/status/+"]

[bus]
host = "bus.example"
port = 2525
log_file = "probe.log"
"#;
        let config: ProbeConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.bus.host.as_deref(), Some("bus.example"));
        assert_eq!(config.bus.port, 2525);
        assert_eq!(config.bus.log_file, PathBuf::from("probe.log"));
        assert_eq!(config.subscriptions.len(), 2);
    }

    #[test]
    fn missing_port_is_rejected() {
        let result: Result<ProbeConfig, _> = toml::from_str("[bus]\nhost = \"x\"\n");
        assert!(result.is_err());
    }
}
