/// Versioned workflow definition store
///
/// Primary rows live in the workflow definition table keyed by (name, version).
/// Each write then maintains the per-name version index and the latest version
/// pointer, in that order.

use crate::{
    codec,
    error::{MetadataError, MetadataResult},
    metadata::{
        index::{parse_version_key, version_key, LatestVersionPointer, VersionIndex},
        types::WorkflowDef,
    },
    storage::{ColumnStore, ConditionalWrite, RowKey},
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct WorkflowDefStore {
    backend: Arc<dyn ColumnStore>,
    table: String,
    versions: VersionIndex,
    latest: LatestVersionPointer,
}

impl WorkflowDefStore {
    pub fn new(
        backend: Arc<dyn ColumnStore>,
        table: impl Into<String>,
        versions: VersionIndex,
        latest: LatestVersionPointer,
    ) -> Self {
        Self {
            backend,
            table: table.into(),
            versions,
            latest,
        }
    }

    fn key(name: &str, version: u32) -> RowKey {
        RowKey::new(name, version_key(version))
    }

    /// Register a new (name, version).
    ///
    /// Uses the backend's insert-if-absent primitive. On backends without one the
    /// existence check and the write are separate calls, so two concurrent
    /// creates of the same key may both succeed (last write wins).
    pub async fn create(&self, def: &WorkflowDef) -> MetadataResult<()> {
        def.validate()?;
        let payload = codec::encode(def)?;
        let key = Self::key(&def.name, def.version);

        if !self.backend.supports_conditional_writes() {
            tracing::debug!(
                "Backend lacks conditional writes; create of {}:{} is check-then-write",
                def.name,
                def.version
            );
        }

        match self.backend.put_if_absent(&self.table, &key, &payload).await? {
            ConditionalWrite::Applied => {}
            ConditionalWrite::Rejected => {
                return Err(MetadataError::AlreadyExists {
                    name: def.name.clone(),
                    version: def.version,
                });
            }
        }

        self.versions.add(&def.name, def.version).await?;
        self.latest.advance(&def.name, def.version).await?;

        tracing::info!("Created workflow definition {}:{}", def.name, def.version);
        Ok(())
    }

    /// Upsert on (name, version).
    ///
    /// An existing version never moves the latest pointer. Upserting a version
    /// that did not exist registers it in the version index and advances the
    /// pointer like `create` would.
    pub async fn update(&self, def: &WorkflowDef) -> MetadataResult<()> {
        def.validate()?;
        let payload = codec::encode(def)?;
        self.backend
            .put(&self.table, &Self::key(&def.name, def.version), &payload)
            .await?;

        self.versions.add(&def.name, def.version).await?;
        self.latest.advance(&def.name, def.version).await?;

        tracing::info!("Updated workflow definition {}:{}", def.name, def.version);
        Ok(())
    }

    pub async fn get(&self, name: &str, version: u32) -> MetadataResult<Option<WorkflowDef>> {
        match self.backend.get(&self.table, &Self::key(name, version)).await? {
            Some(payload) => Ok(Some(codec::decode(&payload)?)),
            None => Ok(None),
        }
    }

    /// Highest live version of a definition.
    ///
    /// Follows the latest pointer. When the pointer is missing or names a version
    /// whose primary row is gone, recomputes the maximum from the version index
    /// and fetches once more.
    pub async fn get_latest(&self, name: &str) -> MetadataResult<Option<WorkflowDef>> {
        let pointed = self.latest.get(name).await?;
        if let Some(version) = pointed {
            if let Some(def) = self.get(name, version).await? {
                return Ok(Some(def));
            }
        }

        // The pointed version is known to be missing even if the index still lists it
        let recomputed = self
            .versions
            .versions(name)
            .await?
            .into_iter()
            .filter(|version| Some(*version) != pointed)
            .max();
        match recomputed {
            Some(version) => {
                tracing::warn!(
                    "Latest pointer for {} is stale ({:?}); falling back to version {}",
                    name,
                    pointed,
                    version
                );
                self.get(name, version).await
            }
            None => Ok(None),
        }
    }

    /// Versions recorded in the version index, ascending
    pub async fn versions(&self, name: &str) -> MetadataResult<Vec<u32>> {
        self.versions.versions(name).await
    }

    /// Full scan over every (name, version); administrative use only
    pub async fn get_all(&self) -> MetadataResult<Vec<WorkflowDef>> {
        self.backend
            .scan_table(&self.table)
            .await?
            .iter()
            .map(|cell| codec::decode(&cell.value))
            .collect()
    }

    /// Delete a version and repair the derived rows.
    ///
    /// Returns whether a primary row was removed; removing an absent version is a
    /// no-op apart from cleaning any leftover index entry.
    pub async fn remove(&self, name: &str, version: u32) -> MetadataResult<bool> {
        let removed = self.backend.delete(&self.table, &Self::key(name, version)).await?;
        self.versions.remove(name, version).await?;

        match self.latest.get(name).await? {
            Some(current) if current == version => {
                let remaining = self.versions.max_version(name).await?;
                self.latest.reset(name, remaining).await?;
            }
            None => {
                // Pointer write may have been lost; rebuild it if versions remain
                if let Some(remaining) = self.versions.max_version(name).await? {
                    self.latest.set(name, remaining).await?;
                }
            }
            Some(_) => {}
        }

        if removed {
            tracing::info!("Removed workflow definition {}:{}", name, version);
        } else {
            tracing::debug!("Workflow definition {}:{} already absent", name, version);
        }
        Ok(removed)
    }

    /// Existence by primary key, not through the index
    pub async fn exists(&self, def: &WorkflowDef) -> MetadataResult<bool> {
        Ok(self
            .backend
            .get(&self.table, &Self::key(&def.name, def.version))
            .await?
            .is_some())
    }

    /// Primary scan grouped as (name, version) keys, used by reconciliation
    pub(crate) async fn primary_keys(&self) -> MetadataResult<Vec<(String, u32)>> {
        Ok(self
            .backend
            .scan_table(&self.table)
            .await?
            .into_iter()
            .filter_map(|cell| {
                parse_version_key(&cell.key.clustering).map(|version| (cell.key.partition, version))
            })
            .collect())
    }
}
