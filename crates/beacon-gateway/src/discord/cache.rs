//! Community cache filled from the gateway session

use beacon_core::{Community, CommunityId, ScopeSet};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Communities the session currently belongs to, id → name
#[derive(Debug, Default)]
pub struct CommunityCache {
    communities: RwLock<HashMap<CommunityId, String>>,
}

impl CommunityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or rename. Returns true when the id was not cached yet.
    pub fn insert(&self, community: &Community) -> bool {
        self.communities
            .write()
            .insert(community.id.clone(), community.name.clone())
            .is_none()
    }

    pub fn remove(&self, id: &CommunityId) -> Option<Community> {
        self.communities.write().remove(id).map(|name| Community {
            id: id.clone(),
            name,
        })
    }

    pub fn contains(&self, id: &CommunityId) -> bool {
        self.communities.read().contains_key(id)
    }

    /// Cached name, falling back to the id
    pub fn resolve(&self, id: &CommunityId) -> Community {
        let name = self
            .communities
            .read()
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string());
        Community {
            id: id.clone(),
            name,
        }
    }

    pub fn len(&self) -> usize {
        self.communities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.read().is_empty()
    }

    pub fn snapshot(&self) -> ScopeSet {
        self.communities.read().keys().cloned().collect()
    }
}
