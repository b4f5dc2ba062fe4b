//! ScopeStore - JSON file persistence for a [`ScopeSet`]
//!
//! One file per agent, holding a pretty-printed JSON array of community
//! identifiers. Saves go through a temporary sibling file and a rename so a
//! reader never observes a half-written array.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::ScopeSet;
use crate::{BeaconError, Result};

/// File-backed store for one agent's scope
#[derive(Debug, Clone)]
pub struct ScopeStore {
    path: PathBuf,
}

impl ScopeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `<data_dir>/monitored_servers_<label>.json`
    pub fn for_agent(data_dir: impl AsRef<Path>, label: &str) -> Self {
        Self::new(
            data_dir
                .as_ref()
                .join(format!("monitored_servers_{}.json", label)),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted scope.
    ///
    /// A missing file is not an error: an empty scope is written out and
    /// returned.
    pub async fn load(&self) -> Result<ScopeSet> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let scope: ScopeSet = serde_json::from_str(&content)?;
                tracing::info!(
                    "✅ Loaded {} monitored servers from {}",
                    scope.len(),
                    self.path.display()
                );
                Ok(scope)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let scope = ScopeSet::new();
                self.save(&scope).await?;
                tracing::info!("📝 Created new monitored servers file {}", self.path.display());
                Ok(scope)
            }
            Err(e) => Err(BeaconError::persistence(&self.path, e)),
        }
    }

    /// Overwrite the persisted scope
    pub async fn save(&self, scope: &ScopeSet) -> Result<()> {
        let content = serde_json::to_string_pretty(scope)?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| BeaconError::persistence(&parent, e))?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scope.json".to_string());
        let tmp_path = parent.join(format!(".{}.tmp.{}", file_name, Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&tmp_path, content).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(BeaconError::persistence(&tmp_path, e));
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(BeaconError::persistence(&self.path, e));
        }

        tracing::debug!("💾 Saved {} monitored servers", scope.len());
        Ok(())
    }
}
