//! Boundary with the chat-platform client
//!
//! The platform client turns its connection into [`PlatformEvent`]s for the
//! agent loop and answers membership snapshots through
//! [`CommunityDirectory`].

use async_trait::async_trait;

use crate::scope::ScopeSet;
use crate::types::{CommunityId, MemberJoined};

/// A community as seen by the platform client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Community {
    pub id: CommunityId,
    pub name: String,
}

impl Community {
    pub fn new(id: impl Into<CommunityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Events emitted by the platform client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    /// The session authenticated; `account` is the logged-in display name
    SessionReady { account: String },

    /// The agent joined a community
    CommunityJoined(Community),

    /// The agent left (or was removed from) a community
    CommunityLeft(Community),

    /// Someone joined a community the agent belongs to
    MemberJoined(MemberJoined),
}

/// Live view of the communities the agent currently belongs to
#[async_trait]
pub trait CommunityDirectory: Send + Sync {
    /// Snapshot of the platform client's membership cache
    async fn live_communities(&self) -> ScopeSet;
}
