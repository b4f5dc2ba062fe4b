//! Role-specific delivery
//!
//! The Notifier delivers locally through a
//! [`NotificationSender`](crate::sender::NotificationSender); the Observer
//! forwards through a [`RelayClient`](crate::relay::RelayClient). The agent
//! loop only sees this trait.

use async_trait::async_trait;

use crate::types::NotificationRecord;

/// Result of handing a record to a delivery strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Delivered to the recipient
    Sent,
    /// Held in the pending queue; must not be retried by the caller
    Queued,
    /// Delivery attempted (or refused) and failed; carries the cause
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DeliveryOutcome::Failed(_))
    }
}

#[async_trait]
pub trait DeliveryStrategy: Send {
    /// Whether records can be handed on right now
    fn is_ready(&self) -> bool;

    /// Records waiting for the strategy to become ready
    fn pending(&self) -> usize {
        0
    }

    /// Called once, when the agent's platform session authenticates.
    ///
    /// A strategy holding a backlog reports the remaining count through
    /// `progress`, first as soon as it is ready and then as records leave.
    async fn activate(&mut self, progress: &(dyn Fn(usize) + Send + Sync)) {
        let _ = progress;
    }

    /// Hand on a record observed by this agent
    async fn dispatch(&mut self, record: NotificationRecord) -> DeliveryOutcome;

    /// Hand on a record relayed from another agent
    async fn accept_relayed(&mut self, record: NotificationRecord) -> DeliveryOutcome {
        let _ = record;
        DeliveryOutcome::Failed("this agent does not accept relayed notifications".to_string())
    }
}
