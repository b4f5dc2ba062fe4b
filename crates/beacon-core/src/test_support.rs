//! Fakes shared by unit tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::platform::CommunityDirectory;
use crate::scope::ScopeSet;
use crate::sender::{Deliver, Messenger, Recipient};
use crate::types::{CommunityId, NotificationRecord};
use crate::{BeaconError, Result};

pub(crate) fn record(name: &str) -> NotificationRecord {
    NotificationRecord {
        subject_name: name.to_string(),
        subject_id: format!("id-{}", name),
        community_name: "Rustaceans".to_string(),
        community_id: CommunityId::from("900"),
        date: "October 19, 2026".to_string(),
        time: "03:04:05 PM".to_string(),
        timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 15, 4, 5).unwrap(),
        source: "Monitor".to_string(),
    }
}

/// Messenger that knows one recipient, `target`, and records every send
pub(crate) struct RecordingMessenger {
    sent: Mutex<Vec<String>>,
    resolve_calls: AtomicUsize,
    reject_sends: bool,
}

impl RecordingMessenger {
    pub(crate) fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            resolve_calls: AtomicUsize::new(0),
            reject_sends: false,
        }
    }

    pub(crate) fn rejecting_sends(mut self) -> Self {
        self.reject_sends = true;
        self
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Subject names pulled back out of the rendered messages
    pub(crate) fn sent_subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|m| {
                let start = m.find("👤 `")? + "👤 `".len();
                let end = m[start..].find('`')? + start;
                Some(m[start..end].to_string())
            })
            .collect()
    }

    pub(crate) fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn resolve_user(&self, user_id: &str) -> Result<Recipient> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if user_id == "target" {
            Ok(Recipient {
                id: user_id.to_string(),
                name: "owner".to_string(),
            })
        } else {
            Err(BeaconError::RecipientNotFound(user_id.to_string()))
        }
    }

    async fn send_direct(&self, _recipient: &Recipient, content: &str) -> Result<()> {
        if self.reject_sends {
            return Err(BeaconError::Delivery("send rejected".to_string()));
        }
        self.sent.lock().push(content.to_string());
        Ok(())
    }
}

/// Delivery target with per-record latency and failures
pub(crate) struct RecordingTarget {
    latency: HashMap<String, Duration>,
    failing: HashSet<String>,
    attempts: Mutex<Vec<String>>,
    delivered: Mutex<Vec<String>>,
}

impl RecordingTarget {
    pub(crate) fn new() -> Self {
        Self {
            latency: HashMap::new(),
            failing: HashSet::new(),
            attempts: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_latency(mut self, name: &str, latency: Duration) -> Self {
        self.latency.insert(name.to_string(), latency);
        self
    }

    pub(crate) fn failing_on(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self
    }

    pub(crate) fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }

    pub(crate) fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }
}

#[async_trait]
impl Deliver for RecordingTarget {
    async fn deliver(&self, record: &NotificationRecord) -> Result<()> {
        self.attempts.lock().push(record.subject_name.clone());
        if let Some(latency) = self.latency.get(&record.subject_name) {
            tokio::time::sleep(*latency).await;
        }
        if self.failing.contains(&record.subject_name) {
            return Err(BeaconError::Delivery("recipient unreachable".to_string()));
        }
        self.delivered.lock().push(record.subject_name.clone());
        Ok(())
    }
}

/// Directory returning a fixed membership snapshot
pub(crate) struct StaticDirectory(ScopeSet);

impl StaticDirectory {
    pub(crate) fn empty() -> Self {
        Self(ScopeSet::new())
    }
}

#[async_trait]
impl CommunityDirectory for StaticDirectory {
    async fn live_communities(&self) -> ScopeSet {
        self.0.clone()
    }
}
