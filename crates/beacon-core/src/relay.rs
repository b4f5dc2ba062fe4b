//! Relay boundary between Observer and Notifier
//!
//! - [`RelayClient`] is the Observer side: one HTTP POST per record with a
//!   bounded wait, never retried.
//! - [`RelayLink`] is the Notifier side: it hands a received record to the
//!   Notifier's agent loop and waits for the outcome.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::agent::AgentCommand;
use crate::delivery::{DeliveryOutcome, DeliveryStrategy};
use crate::types::NotificationRecord;
use crate::{BeaconError, Result};

/// Path of the Notifier's relay endpoint
pub const RELAY_PATH: &str = "/send-notification";

/// Default wait budget for one relay call
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Status field of a relay response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayStatus {
    Success,
    Error,
    Queued,
}

/// Body returned by `POST /send-notification`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayResponse {
    pub status: RelayStatus,
    pub message: String,
}

impl From<DeliveryOutcome> for RelayResponse {
    fn from(outcome: DeliveryOutcome) -> Self {
        match outcome {
            DeliveryOutcome::Sent => RelayResponse {
                status: RelayStatus::Success,
                message: "Notification sent".to_string(),
            },
            DeliveryOutcome::Queued => RelayResponse {
                status: RelayStatus::Queued,
                message: "Bot not ready, notification queued".to_string(),
            },
            DeliveryOutcome::Failed(message) => RelayResponse {
                status: RelayStatus::Error,
                message,
            },
        }
    }
}

impl From<RelayResponse> for DeliveryOutcome {
    fn from(response: RelayResponse) -> Self {
        match response.status {
            RelayStatus::Success => DeliveryOutcome::Sent,
            RelayStatus::Queued => DeliveryOutcome::Queued,
            RelayStatus::Error => DeliveryOutcome::Failed(response.message),
        }
    }
}

/// HTTP client the Observer uses to reach the Notifier
#[derive(Debug, Clone)]
pub struct RelayClient {
    endpoint: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BeaconError::InvalidConfig(format!("relay client: {}", e)))?;

        Ok(Self {
            endpoint: format!("{}{}", base_url.as_ref().trim_end_matches('/'), RELAY_PATH),
            timeout,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST the record to the Notifier and return its verdict
    pub async fn forward(&self, record: &NotificationRecord) -> Result<RelayResponse> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<RelayResponse>()
                .await
                .map_err(|e| self.transport_error(e));
        }

        // error replies still carry a RelayResponse body
        match response.json::<RelayResponse>().await {
            Ok(body) => Ok(body),
            Err(_) => Err(BeaconError::Relay(format!(
                "notifier responded with {}",
                status
            ))),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> BeaconError {
        if e.is_timeout() {
            BeaconError::RelayTimeout(self.timeout)
        } else {
            BeaconError::Relay(e.to_string())
        }
    }
}

#[async_trait]
impl DeliveryStrategy for RelayClient {
    fn is_ready(&self) -> bool {
        true
    }

    async fn dispatch(&mut self, record: NotificationRecord) -> DeliveryOutcome {
        match self.forward(&record).await {
            Ok(response) => {
                match response.status {
                    RelayStatus::Success => tracing::info!("✅ Sent notification to Sender Bot"),
                    RelayStatus::Queued => {
                        tracing::info!("⏳ Sender Bot queued notification: {}", response.message)
                    }
                    RelayStatus::Error => {
                        tracing::error!("❌ Sender Bot failed to deliver: {}", response.message)
                    }
                }
                response.into()
            }
            Err(e) => {
                tracing::error!("❌ Failed to notify Sender Bot: {}", e);
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Notifier-side entry point for relayed records
#[derive(Debug, Clone)]
pub struct RelayLink {
    commands: mpsc::Sender<AgentCommand>,
}

impl RelayLink {
    pub fn new(commands: mpsc::Sender<AgentCommand>) -> Self {
        Self { commands }
    }

    /// Deliver now if the Notifier is ready, otherwise queue it
    pub async fn forward(&self, record: NotificationRecord) -> DeliveryOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        let command = AgentCommand::Relay {
            record,
            reply: reply_tx,
        };

        if self.commands.send(command).await.is_err() {
            return DeliveryOutcome::Failed(
                BeaconError::AgentUnavailable("notifier loop stopped".to_string()).to_string(),
            );
        }

        reply_rx.await.unwrap_or_else(|_| {
            DeliveryOutcome::Failed(
                BeaconError::AgentUnavailable("notifier dropped the request".to_string())
                    .to_string(),
            )
        })
    }
}
