//! Error types for Beacon Core
//!
//! Persistence failures are reported but never stop event handling; the
//! in-memory scope stays authoritative for the running process.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for Beacon operations
pub type Result<T> = std::result::Result<T, BeaconError>;

/// Main error type for Beacon operations
#[derive(Error, Debug)]
pub enum BeaconError {
    /// Reading or writing the scope file failed
    #[error("Persistence error at {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The recipient could not be resolved on the platform
    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    /// The final send was rejected or failed in transit
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Relay call timed out after {0:?}")]
    RelayTimeout(Duration),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Pending queue full ({0} entries)")]
    QueueFull(usize),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BeaconError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BeaconError::Persistence {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for BeaconError {
    fn from(e: serde_json::Error) -> Self {
        BeaconError::Serialization(e.to_string())
    }
}
