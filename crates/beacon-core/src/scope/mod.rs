//! Community scope
//!
//! The [`ScopeSet`] is the set of communities an agent watches for join
//! events. [`ScopeStore`] keeps it on disk and [`ScopeReconciler`] rebuilds
//! it from live membership once the platform cache has settled.

pub mod reconciler;
pub mod store;

pub use reconciler::{ReconcileOutcome, ScopeReconciler, DEFAULT_SETTLE_DELAY};
pub use store::ScopeStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::CommunityId;

/// Set of communities in scope for one agent.
///
/// Persisted as a JSON array of identifier strings. The backing set is
/// ordered only so the file contents are stable between saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet(BTreeSet<CommunityId>);

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &CommunityId) -> bool {
        self.0.contains(id)
    }

    /// Returns `true` if the community was not already in scope
    pub fn insert(&mut self, id: CommunityId) -> bool {
        self.0.insert(id)
    }

    /// Returns `true` if the community was in scope
    pub fn remove(&mut self, id: &CommunityId) -> bool {
        self.0.remove(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommunityId> {
        self.0.iter()
    }
}

impl<T: Into<CommunityId>> FromIterator<T> for ScopeSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
