//! DeliveryQueue - pending notifications while the outbound channel is not ready
//!
//! Records are appended at the tail and delivered from the head, one at a
//! time, each delivery awaited before the next is dequeued. The queue is
//! bounded; what happens on overflow is an explicit [`OverflowPolicy`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::sender::Deliver;
use crate::types::NotificationRecord;
use crate::{BeaconError, Result};

/// What to do with a record that arrives when the queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the head to make room for the new record
    #[default]
    DropOldest,
    /// Discard the new record; the caller still sees it as queued
    DropNewest,
    /// Refuse the new record with [`BeaconError::QueueFull`]
    Reject,
}

/// Queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Maximum pending records
    pub capacity: usize,

    /// Overflow policy
    pub overflow: OverflowPolicy,

    /// Pause between deliveries while draining, in milliseconds
    pub drain_interval_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            capacity: 1000,
            overflow: OverflowPolicy::DropOldest,
            drain_interval_ms: 1000,
        }
    }
}

impl QueueSettings {
    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

/// How an enqueue was absorbed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enqueued {
    /// Appended at the tail
    Accepted,
    /// Appended after evicting the oldest record
    Evicted(NotificationRecord),
    /// Queue full; the new record was discarded
    Discarded(NotificationRecord),
}

/// Counts from one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Bounded FIFO of pending notifications
#[derive(Debug)]
pub struct DeliveryQueue {
    entries: VecDeque<NotificationRecord>,
    capacity: usize,
    overflow: OverflowPolicy,
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::from_settings(&QueueSettings::default())
    }
}

impl DeliveryQueue {
    pub fn new(capacity: usize, overflow: OverflowPolicy) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            overflow,
        }
    }

    pub fn from_settings(settings: &QueueSettings) -> Self {
        Self::new(settings.capacity, settings.overflow)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.entries.iter()
    }

    /// Append a record at the tail, applying the overflow policy when full
    pub fn enqueue(&mut self, record: NotificationRecord) -> Result<Enqueued> {
        if self.entries.len() < self.capacity {
            self.entries.push_back(record);
            return Ok(Enqueued::Accepted);
        }

        match self.overflow {
            OverflowPolicy::DropOldest => {
                let evicted = self.entries.pop_front();
                self.entries.push_back(record);
                match evicted {
                    Some(old) => {
                        tracing::warn!(
                            "Pending queue full, dropped oldest notification for {}",
                            old.subject_name
                        );
                        Ok(Enqueued::Evicted(old))
                    }
                    None => Ok(Enqueued::Accepted),
                }
            }
            OverflowPolicy::DropNewest => {
                tracing::warn!(
                    "Pending queue full, discarded notification for {}",
                    record.subject_name
                );
                Ok(Enqueued::Discarded(record))
            }
            OverflowPolicy::Reject => Err(BeaconError::QueueFull(self.capacity)),
        }
    }

    /// Remove the head record
    pub fn dequeue(&mut self) -> Option<NotificationRecord> {
        self.entries.pop_front()
    }

    /// Deliver every pending record in arrival order.
    ///
    /// Each record is removed before its delivery is attempted and is not
    /// retried on failure. The length is re-checked after every delivery, so
    /// records appended meanwhile are picked up by the same pass.
    ///
    /// `progress` receives the remaining length each time a record leaves.
    pub async fn drain_into<D, F>(
        &mut self,
        target: &D,
        pause: Duration,
        progress: F,
    ) -> DrainReport
    where
        D: Deliver + ?Sized,
        F: Fn(usize) + Send,
    {
        let mut report = DrainReport::default();
        if self.entries.is_empty() {
            return report;
        }

        tracing::info!("📤 Processing {} pending notifications...", self.entries.len());

        while let Some(record) = self.dequeue() {
            progress(self.entries.len());
            match target.deliver(&record).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(
                        "❌ Dropped pending notification for {} from {}: {}",
                        record.subject_name,
                        record.community_name,
                        e
                    );
                }
            }

            if !pause.is_zero() && !self.entries.is_empty() {
                tokio::time::sleep(pause).await;
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, RecordingTarget};

    #[test]
    fn test_fifo_order() {
        let mut queue = DeliveryQueue::default();
        queue.enqueue(record("r1")).unwrap();
        queue.enqueue(record("r2")).unwrap();

        assert_eq!(queue.dequeue().unwrap().subject_name, "r1");
        assert_eq!(queue.dequeue().unwrap().subject_name, "r2");
        assert!(queue.dequeue().is_none());
    }

    #[tokio::test]
    async fn test_drain_preserves_order_regardless_of_latency() {
        let mut queue = DeliveryQueue::default();
        queue.enqueue(record("slow")).unwrap();
        queue.enqueue(record("fast")).unwrap();

        let target = RecordingTarget::new()
            .with_latency("slow", Duration::from_millis(40));
        let report = queue.drain_into(&target, Duration::ZERO, |_| {}).await;

        assert_eq!(report, DrainReport { delivered: 2, failed: 0 });
        assert_eq!(target.delivered(), vec!["slow", "fast"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_drain_drops_failures_without_retry() {
        let mut queue = DeliveryQueue::default();
        queue.enqueue(record("a")).unwrap();
        queue.enqueue(record("b")).unwrap();
        queue.enqueue(record("c")).unwrap();

        let target = RecordingTarget::new().failing_on("b");
        let report = queue.drain_into(&target, Duration::ZERO, |_| {}).await;

        assert_eq!(report, DrainReport { delivered: 2, failed: 1 });
        assert_eq!(target.attempts(), vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_drain_empty_is_noop() {
        let mut queue = DeliveryQueue::default();
        let target = RecordingTarget::new();

        let first = queue.drain_into(&target, Duration::from_secs(5), |_| {}).await;
        let second = queue.drain_into(&target, Duration::from_secs(5), |_| {}).await;

        assert_eq!(first, DrainReport::default());
        assert_eq!(second, DrainReport::default());
        assert!(target.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_pauses_between_deliveries() {
        let mut queue = DeliveryQueue::default();
        queue.enqueue(record("a")).unwrap();
        queue.enqueue(record("b")).unwrap();
        queue.enqueue(record("c")).unwrap();

        let started = tokio::time::Instant::now();
        queue
            .drain_into(&RecordingTarget::new(), Duration::from_secs(1), |_| {})
            .await;

        // two gaps, none after the last delivery
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_drain_reports_remaining_as_records_leave() {
        let mut queue = DeliveryQueue::default();
        queue.enqueue(record("a")).unwrap();
        queue.enqueue(record("b")).unwrap();
        queue.enqueue(record("c")).unwrap();

        let seen = parking_lot::Mutex::new(Vec::new());
        let target = RecordingTarget::new().failing_on("b");
        queue
            .drain_into(&target, Duration::ZERO, |remaining| seen.lock().push(remaining))
            .await;

        assert_eq!(*seen.lock(), vec![2, 1, 0]);
    }

    #[test]
    fn test_overflow_drop_oldest() {
        let mut queue = DeliveryQueue::new(2, OverflowPolicy::DropOldest);
        queue.enqueue(record("a")).unwrap();
        queue.enqueue(record("b")).unwrap();

        let outcome = queue.enqueue(record("c")).unwrap();
        assert!(matches!(outcome, Enqueued::Evicted(r) if r.subject_name == "a"));

        let names: Vec<_> = queue.iter().map(|r| r.subject_name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_overflow_drop_newest() {
        let mut queue = DeliveryQueue::new(1, OverflowPolicy::DropNewest);
        queue.enqueue(record("a")).unwrap();

        let outcome = queue.enqueue(record("b")).unwrap();
        assert!(matches!(outcome, Enqueued::Discarded(r) if r.subject_name == "b"));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.iter().next().unwrap().subject_name, "a");
    }

    #[test]
    fn test_overflow_reject() {
        let mut queue = DeliveryQueue::new(1, OverflowPolicy::Reject);
        queue.enqueue(record("a")).unwrap();

        let err = queue.enqueue(record("b")).unwrap_err();
        assert!(matches!(err, BeaconError::QueueFull(1)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_settings_deserialize_policy() {
        let settings: QueueSettings =
            serde_json::from_str(r#"{"capacity": 10, "overflow": "reject"}"#).unwrap();
        assert_eq!(settings.capacity, 10);
        assert_eq!(settings.overflow, OverflowPolicy::Reject);
        assert_eq!(settings.drain_interval_ms, 1000);
    }
}
