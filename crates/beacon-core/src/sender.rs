//! NotificationSender - the Notifier's outbound channel to the recipient
//!
//! The sender starts `NotReady`. Until the platform session authenticates,
//! every record is parked in the [`DeliveryQueue`]. The transition to `Ready`
//! is one-way and drains the queue before anything else is processed.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::delivery::{DeliveryOutcome, DeliveryStrategy};
use crate::queue::{DeliveryQueue, DrainReport, Enqueued, QueueSettings};
use crate::types::NotificationRecord;
use crate::Result;

/// A resolved platform user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: String,
    pub name: String,
}

/// Direct-message capability of the platform client
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn resolve_user(&self, user_id: &str) -> Result<Recipient>;

    async fn send_direct(&self, recipient: &Recipient, content: &str) -> Result<()>;
}

/// A single delivery attempt for one record
#[async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, record: &NotificationRecord) -> Result<()>;
}

/// Render the direct message for a record
pub fn format_message(record: &NotificationRecord) -> String {
    format!(
        "🎉 **New Member Alert!** [{}]\n📆 {}\n🕐 {}\n👤 `{}`\n🆔 `{}`\n🏠 {}",
        record.source,
        record.date,
        record.time,
        record.subject_name,
        record.subject_id,
        record.community_name
    )
}

/// Messenger bound to the one fixed recipient.
///
/// The recipient is looked up on first use and kept. A failed lookup is not
/// kept, so the next delivery tries again.
pub struct DirectChannel<M: ?Sized> {
    recipient_id: String,
    resolved: Mutex<Option<Recipient>>,
    messenger: Arc<M>,
}

impl<M: Messenger + ?Sized> DirectChannel<M> {
    pub fn new(messenger: Arc<M>, recipient_id: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            resolved: Mutex::new(None),
            messenger,
        }
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    /// The resolved recipient, looking it up if not known yet
    pub async fn recipient(&self) -> Result<Recipient> {
        let cached = self.resolved.lock().clone();
        if let Some(recipient) = cached {
            return Ok(recipient);
        }
        let recipient = self.messenger.resolve_user(&self.recipient_id).await?;
        *self.resolved.lock() = Some(recipient.clone());
        Ok(recipient)
    }
}

#[async_trait]
impl<M: Messenger + ?Sized> Deliver for DirectChannel<M> {
    /// Send once to the recipient. No retry.
    async fn deliver(&self, record: &NotificationRecord) -> Result<()> {
        let recipient = self.recipient().await?;
        self.messenger
            .send_direct(&recipient, &format_message(record))
            .await?;

        tracing::info!(
            "✅ Sent DM to {} for: {} from {} (Source: {})",
            recipient.name,
            record.subject_name,
            record.community_name,
            record.source
        );
        Ok(())
    }
}

/// Readiness of the outbound channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    NotReady,
    Ready,
}

pub struct NotificationSender<M: ?Sized> {
    channel: DirectChannel<M>,
    queue: DeliveryQueue,
    state: SenderState,
    drain_interval: Duration,
}

impl<M: Messenger + ?Sized> NotificationSender<M> {
    pub fn new(messenger: Arc<M>, recipient_id: impl Into<String>, settings: &QueueSettings) -> Self {
        Self {
            channel: DirectChannel::new(messenger, recipient_id),
            queue: DeliveryQueue::from_settings(settings),
            state: SenderState::NotReady,
            drain_interval: settings.drain_interval(),
        }
    }

    pub fn ready(&self) -> bool {
        self.state == SenderState::Ready
    }

    pub fn state(&self) -> SenderState {
        self.state
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    pub fn recipient_id(&self) -> &str {
        self.channel.recipient_id()
    }

    /// One delivery attempt, regardless of readiness
    pub async fn deliver(&self, record: &NotificationRecord) -> Result<()> {
        self.channel.deliver(record).await
    }

    /// Move to `Ready` and drain the backlog.
    ///
    /// Only the first call drains; later calls are no-ops.
    pub async fn mark_ready(&mut self) -> DrainReport {
        self.mark_ready_with(|_| {}).await
    }

    /// [`Self::mark_ready`], reporting the backlog length to `progress` once
    /// the state has flipped and again after each record leaves the queue.
    pub async fn mark_ready_with<F>(&mut self, progress: F) -> DrainReport
    where
        F: Fn(usize) + Send,
    {
        if self.state == SenderState::Ready {
            return DrainReport::default();
        }
        self.state = SenderState::Ready;
        progress(self.queue.len());

        match self.channel.recipient().await {
            Ok(recipient) => tracing::info!("🎯 Target user: {}", recipient.name),
            Err(e) => tracing::warn!(
                "⚠️ Could not resolve recipient {}: {}",
                self.channel.recipient_id(),
                e
            ),
        }

        let report = self
            .queue
            .drain_into(&self.channel, self.drain_interval, progress)
            .await;
        if report.delivered + report.failed > 0 {
            tracing::info!(
                "📤 Pending notifications processed: {} sent, {} dropped",
                report.delivered,
                report.failed
            );
        }
        report
    }

    /// Deliver now if ready, otherwise park the record in the queue
    pub async fn submit(&mut self, record: NotificationRecord) -> DeliveryOutcome {
        if !self.ready() {
            let name = record.subject_name.clone();
            return match self.queue.enqueue(record) {
                Ok(Enqueued::Discarded(_)) => DeliveryOutcome::Queued,
                Ok(_) => {
                    tracing::info!(
                        "⏳ Bot not ready, queued notification for {} ({} pending)",
                        name,
                        self.queue.len()
                    );
                    DeliveryOutcome::Queued
                }
                Err(e) => {
                    tracing::warn!("⏳ Bot not ready and {}: {}", e, name);
                    DeliveryOutcome::Failed(e.to_string())
                }
            };
        }

        match self.deliver(&record).await {
            Ok(()) => DeliveryOutcome::Sent,
            Err(e) => {
                tracing::error!("❌ Failed to send DM for {}: {}", record.subject_name, e);
                DeliveryOutcome::Failed(e.to_string())
            }
        }
    }
}

#[async_trait]
impl<M: Messenger + ?Sized> DeliveryStrategy for NotificationSender<M> {
    fn is_ready(&self) -> bool {
        self.ready()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    async fn activate(&mut self, progress: &(dyn Fn(usize) + Send + Sync)) {
        self.mark_ready_with(progress).await;
    }

    async fn dispatch(&mut self, record: NotificationRecord) -> DeliveryOutcome {
        self.submit(record).await
    }

    async fn accept_relayed(&mut self, record: NotificationRecord) -> DeliveryOutcome {
        self.submit(record).await
    }
}
