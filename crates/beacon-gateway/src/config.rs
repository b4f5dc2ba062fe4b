//! Gateway configuration
//!
//! Defaults, then an optional JSON file, then environment variables
//! (a `.env` file is loaded by the binary before any of this runs).

use beacon_core::QueueSettings;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{GatewayError, Result, DEFAULT_HOST};

/// Default base URL of the Notifier's relay endpoint
pub const DEFAULT_RELAY_URL: &str = "http://localhost:3007";

/// Which agent roles this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum RoleSelection {
    Observer,
    Notifier,
    #[default]
    Both,
}

impl RoleSelection {
    pub fn runs_observer(self) -> bool {
        matches!(self, RoleSelection::Observer | RoleSelection::Both)
    }

    pub fn runs_notifier(self) -> bool {
        matches!(self, RoleSelection::Notifier | RoleSelection::Both)
    }
}

impl std::fmt::Display for RoleSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoleSelection::Observer => write!(f, "observer"),
            RoleSelection::Notifier => write!(f, "notifier"),
            RoleSelection::Both => write!(f, "both"),
        }
    }
}

/// Per-agent settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Platform credential
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,

    /// Port of this agent's status server
    pub port: u16,

    /// Log label; also names the scope file and tags notifications
    pub label: String,
}

impl AgentConfig {
    pub fn new(port: u16, label: impl Into<String>) -> Self {
        Self {
            token: String::new(),
            port,
            label: label.into(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Bind host for the status servers
    pub host: String,

    /// Directory holding the scope files
    pub data_dir: PathBuf,

    /// Platform user every notification is sent to
    pub recipient_id: String,

    /// Base URL the Observer relays to
    pub relay_url: String,

    pub settle_delay_ms: u64,

    /// Pause between starting the Notifier and the Observer
    pub startup_stagger_ms: u64,

    pub relay_timeout_ms: u64,

    /// Pending-queue settings of the Notifier
    pub queue: QueueSettings,

    pub observer: AgentConfig,

    pub notifier: AgentConfig,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            data_dir: PathBuf::from("."),
            recipient_id: String::new(),
            relay_url: DEFAULT_RELAY_URL.to_string(),
            settle_delay_ms: 5000,
            startup_stagger_ms: 3000,
            relay_timeout_ms: 5000,
            queue: QueueSettings::default(),
            observer: AgentConfig::new(3000, "Monitor"),
            notifier: AgentConfig::new(3007, "Sender"),
        }
    }
}

impl BeaconConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the scope-file directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_recipient(mut self, recipient_id: impl Into<String>) -> Self {
        self.recipient_id = recipient_id.into();
        self
    }

    pub fn with_relay_url(mut self, url: impl Into<String>) -> Self {
        self.relay_url = url.into();
        self
    }

    /// Overlay the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; unset or empty keys keep their value
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("MONITOR_TOKEN") {
            self.observer.token = token;
        }
        if let Some(token) = get("SENDER_TOKEN") {
            self.notifier.token = token;
        }
        if let Some(recipient) = get("TARGET_USER_ID") {
            self.recipient_id = recipient;
        }
        if let Some(url) = get("SENDER_BOT_URL") {
            self.relay_url = url;
        }
        if let Some(port) = get("MONITOR_PORT") {
            self.observer.port = parse_port("MONITOR_PORT", &port)?;
        }
        if let Some(port) = get("SENDER_PORT") {
            self.notifier.port = parse_port("SENDER_PORT", &port)?;
        }
        if let Some(host) = get("BEACON_HOST") {
            self.host = host;
        }
        if let Some(dir) = get("BEACON_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        Ok(self)
    }

    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that the selected roles have what they need to start
    pub fn validate(&self, roles: RoleSelection) -> Result<()> {
        if roles.runs_notifier() {
            require("SENDER_TOKEN", &self.notifier.token)?;
            require("TARGET_USER_ID", &self.recipient_id)?;
        }

        if roles.runs_observer() {
            require("MONITOR_TOKEN", &self.observer.token)?;
            let url = url::Url::parse(&self.relay_url).map_err(|e| {
                GatewayError::InvalidConfig(format!("relay url {:?}: {}", self.relay_url, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(GatewayError::InvalidConfig(format!(
                    "relay url must be http(s), got {}",
                    url.scheme()
                )));
            }
        }

        if roles == RoleSelection::Both && self.observer.port == self.notifier.port {
            return Err(GatewayError::InvalidConfig(format!(
                "observer and notifier both listen on port {}",
                self.observer.port
            )));
        }

        if self.observer.label == self.notifier.label {
            return Err(GatewayError::InvalidConfig(format!(
                "agent labels must differ, both are {:?}",
                self.observer.label
            )));
        }

        if self.queue.capacity == 0 {
            return Err(GatewayError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Listen address of an agent's status server
    pub fn socket_addr(&self, agent: &AgentConfig) -> Result<SocketAddr> {
        format!("{}:{}", self.host, agent.port)
            .parse()
            .map_err(|e| GatewayError::InvalidConfig(format!("listen address: {}", e)))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn startup_stagger(&self) -> Duration {
        Duration::from_millis(self.startup_stagger_ms)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_millis(self.relay_timeout_ms)
    }
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| GatewayError::InvalidConfig(format!("{} is not a port: {:?}", key, value)))
}

fn require(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidConfig(format!("{} is required", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::OverflowPolicy;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn complete() -> BeaconConfig {
        BeaconConfig::default()
            .apply_vars(vars(&[
                ("MONITOR_TOKEN", "monitor-token"),
                ("SENDER_TOKEN", "sender-token"),
                ("TARGET_USER_ID", "42"),
            ]))
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = BeaconConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.observer.port, 3000);
        assert_eq!(config.notifier.port, 3007);
        assert_eq!(config.observer.label, "Monitor");
        assert_eq!(config.notifier.label, "Sender");
        assert_eq!(config.relay_url, DEFAULT_RELAY_URL);
        assert_eq!(config.settle_delay(), Duration::from_secs(5));
        assert_eq!(config.relay_timeout(), Duration::from_secs(5));
        assert_eq!(config.queue.capacity, 1000);
    }

    #[test]
    fn test_env_overlay() {
        let config = BeaconConfig::default()
            .apply_vars(vars(&[
                ("MONITOR_TOKEN", "m"),
                ("SENDER_TOKEN", "s"),
                ("TARGET_USER_ID", "42"),
                ("SENDER_BOT_URL", "http://notifier:9000"),
                ("MONITOR_PORT", "8080"),
                ("BEACON_DATA_DIR", "/var/lib/beacon"),
                ("SENDER_PORT", ""),
            ]))
            .unwrap();

        assert_eq!(config.observer.token, "m");
        assert_eq!(config.notifier.token, "s");
        assert_eq!(config.recipient_id, "42");
        assert_eq!(config.relay_url, "http://notifier:9000");
        assert_eq!(config.observer.port, 8080);
        assert_eq!(config.notifier.port, 3007);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/beacon"));
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let err = BeaconConfig::default()
            .apply_vars(vars(&[("SENDER_PORT", "seven")]))
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfig(m) if m.contains("SENDER_PORT")));
    }

    #[test]
    fn test_validate_per_role() {
        assert!(complete().validate(RoleSelection::Both).is_ok());

        let observer_only = BeaconConfig::default()
            .apply_vars(vars(&[("MONITOR_TOKEN", "m")]))
            .unwrap();
        assert!(observer_only.validate(RoleSelection::Observer).is_ok());
        assert!(observer_only.validate(RoleSelection::Notifier).is_err());

        let mut no_recipient = complete();
        no_recipient.recipient_id.clear();
        assert!(no_recipient.validate(RoleSelection::Notifier).is_err());
    }

    #[test]
    fn test_validate_relay_url() {
        let config = complete().with_relay_url("not a url");
        assert!(config.validate(RoleSelection::Observer).is_err());

        let config = complete().with_relay_url("ftp://notifier");
        assert!(config.validate(RoleSelection::Observer).is_err());

        // the Notifier never calls the relay
        let config = complete().with_relay_url("not a url");
        assert!(config.validate(RoleSelection::Notifier).is_ok());
    }

    #[test]
    fn test_validate_port_clash() {
        let mut config = complete();
        config.notifier.port = config.observer.port;
        assert!(config.validate(RoleSelection::Both).is_err());
        assert!(config.validate(RoleSelection::Observer).is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = BeaconConfig::default().with_host("127.0.0.1");
        let addr = config.socket_addr(&config.notifier).unwrap();
        assert_eq!(addr.port(), 3007);

        let config = BeaconConfig::default().with_host("not a host");
        assert!(config.socket_addr(&config.observer).is_err());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.json");
        std::fs::write(
            &path,
            r#"{ "settle_delay_ms": 250, "queue": { "overflow": "reject" } }"#,
        )
        .unwrap();

        let config = BeaconConfig::from_file(&path).unwrap();
        assert_eq!(config.settle_delay(), Duration::from_millis(250));
        assert_eq!(config.queue.overflow, OverflowPolicy::Reject);
        assert_eq!(config.queue.capacity, 1000);
        assert_eq!(config.notifier.label, "Sender");
    }

    #[test]
    fn test_file_keeps_tokens_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beacon.json");

        let mut config = BeaconConfig::default().with_recipient("42");
        config.observer = AgentConfig::new(4000, "Watcher");
        config.to_file(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(!saved.contains("token"));

        let parsed = BeaconConfig::from_file(&path).unwrap();
        assert_eq!(parsed.observer, AgentConfig::new(4000, "Watcher"));
        assert_eq!(parsed.recipient_id, "42");
    }
}
