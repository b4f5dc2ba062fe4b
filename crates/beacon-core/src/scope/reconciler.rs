//! ScopeReconciler - rebuild scope from live membership
//!
//! Runs once per agent, a settling delay after the session becomes ready, so
//! the platform client's community cache has time to fill.

use std::time::Duration;

use super::{ScopeSet, ScopeStore};

/// Default wait between session ready and reconciliation
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Result of a reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Scope replaced by the live set
    Replaced { added: usize, removed: usize },
    /// Live set was empty; previous scope kept
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ScopeReconciler {
    settle_delay: Duration,
}

impl Default for ScopeReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_DELAY)
    }
}

impl ScopeReconciler {
    pub fn new(settle_delay: Duration) -> Self {
        Self { settle_delay }
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Replace `scope` with `live` and persist it.
    ///
    /// An empty `live` set never empties the scope: a cold cache looks the
    /// same as "left everything", so the previous scope is kept instead.
    /// A failed save is logged; the in-memory replacement still stands.
    pub async fn reconcile(
        &self,
        scope: &mut ScopeSet,
        live: ScopeSet,
        store: &ScopeStore,
    ) -> ReconcileOutcome {
        if live.is_empty() {
            tracing::warn!(
                "⚠️ No communities found in cache, keeping {} previously monitored",
                scope.len()
            );
            return ReconcileOutcome::Skipped;
        }

        let added = live.iter().filter(|id| !scope.contains(id)).count();
        let removed = scope.iter().filter(|id| !live.contains(id)).count();
        *scope = live;

        if let Err(e) = store.save(scope).await {
            tracing::error!("❌ Error saving monitored servers: {}", e);
        }

        tracing::info!(
            "🎯 Setup complete! Monitoring {} servers (+{} / -{})",
            scope.len(),
            added,
            removed
        );
        ReconcileOutcome::Replaced { added, removed }
    }
}
