//! Shared domain types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::platform::Community;

/// Source label used when a relayed record does not name its producer
pub const DEFAULT_SOURCE: &str = "Monitor Bot";

/// Opaque identifier of a community on the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunityId(pub String);

impl CommunityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommunityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CommunityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CommunityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Role an agent plays in the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Watches communities and forwards detected joins
    Observer,
    /// Owns recipient delivery and watches its own communities
    Notifier,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Observer => write!(f, "observer"),
            AgentRole::Notifier => write!(f, "notifier"),
        }
    }
}

/// Raw "member joined" observation reported by the platform client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberJoined {
    pub user_id: String,
    pub username: String,
    pub community: Community,
}

/// One detected join event, ready for delivery.
///
/// Field names on the wire match the relay payload the Notifier accepts on
/// `POST /send-notification`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "username")]
    pub subject_name: String,

    #[serde(rename = "userId")]
    pub subject_id: String,

    #[serde(rename = "guildName")]
    pub community_name: String,

    #[serde(rename = "guildId")]
    pub community_id: CommunityId,

    /// Calendar date, e.g. `October 19, 2026`
    pub date: String,

    /// Clock time, e.g. `03:04:05 PM`
    pub time: String,

    /// ISO-8601 instant, always with milliseconds, e.g. `2026-10-19T15:04:05.000Z`
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: DateTime<Utc>,

    /// Which agent observed the join
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn serialize_millis<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
