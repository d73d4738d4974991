/// Index maintenance protocol
///
/// Derived state kept next to the primary records, each as its own addressable
/// table with explicit read/write operations:
/// - `VersionIndex`: workflow name -> set of existing versions
/// - `LatestVersionPointer`: workflow name -> maximum live version
/// - `EventIndex`: event -> (handler name, active) pairs
///
/// Writers always persist the primary row first and the derived rows second,
/// without rolling the primary back when a derived write fails. Readers treat a
/// derived row that points at a missing primary as filtered out. The reconciler
/// rebuilds all three from a full primary scan.

use crate::{
    codec,
    error::MetadataResult,
    storage::{ColumnStore, RowKey},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// Clustering key for a version; zero padded so lexical order is numeric order
pub(crate) fn version_key(version: u32) -> String {
    format!("{:010}", version)
}

pub(crate) fn parse_version_key(key: &str) -> Option<u32> {
    key.parse().ok()
}

/// Per-name set of existing workflow versions
#[derive(Debug, Clone)]
pub struct VersionIndex {
    backend: Arc<dyn ColumnStore>,
    table: String,
}

impl VersionIndex {
    pub fn new(backend: Arc<dyn ColumnStore>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub async fn add(&self, name: &str, version: u32) -> MetadataResult<()> {
        self.backend
            .put(&self.table, &RowKey::new(name, version_key(version)), "")
            .await?;
        tracing::debug!("Indexed workflow version {}:{}", name, version);
        Ok(())
    }

    pub async fn remove(&self, name: &str, version: u32) -> MetadataResult<bool> {
        Ok(self
            .backend
            .delete(&self.table, &RowKey::new(name, version_key(version)))
            .await?)
    }

    /// Versions recorded for a name, ascending
    pub async fn versions(&self, name: &str) -> MetadataResult<Vec<u32>> {
        let cells = self.backend.scan_partition(&self.table, name).await?;
        let mut versions: Vec<u32> = cells
            .iter()
            .filter_map(|cell| parse_version_key(&cell.key.clustering))
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }

    pub async fn max_version(&self, name: &str) -> MetadataResult<Option<u32>> {
        Ok(self.versions(name).await?.into_iter().max())
    }

    /// Whole index, used by reconciliation
    pub async fn snapshot(&self) -> MetadataResult<BTreeMap<String, BTreeSet<u32>>> {
        let mut index: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
        for cell in self.backend.scan_table(&self.table).await? {
            if let Some(version) = parse_version_key(&cell.key.clustering) {
                index.entry(cell.key.partition).or_default().insert(version);
            }
        }
        Ok(index)
    }
}

/// Per-name pointer at the maximum live workflow version
#[derive(Debug, Clone)]
pub struct LatestVersionPointer {
    backend: Arc<dyn ColumnStore>,
    table: String,
}

impl LatestVersionPointer {
    pub fn new(backend: Arc<dyn ColumnStore>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub async fn get(&self, name: &str) -> MetadataResult<Option<u32>> {
        match self
            .backend
            .get(&self.table, &RowKey::partition_only(name))
            .await?
        {
            Some(value) => Ok(Some(codec::decode(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn set(&self, name: &str, version: u32) -> MetadataResult<()> {
        self.backend
            .put(&self.table, &RowKey::partition_only(name), &codec::encode(&version)?)
            .await?;
        tracing::debug!("Latest version pointer {} -> {}", name, version);
        Ok(())
    }

    pub async fn clear(&self, name: &str) -> MetadataResult<bool> {
        let removed = self
            .backend
            .delete(&self.table, &RowKey::partition_only(name))
            .await?;
        tracing::debug!("Cleared latest version pointer for {}", name);
        Ok(removed)
    }

    /// Move the pointer to `version` if it is absent or lower.
    ///
    /// Read then write: two concurrent advances can leave the lower value in
    /// place until reconciliation.
    pub async fn advance(&self, name: &str, version: u32) -> MetadataResult<bool> {
        match self.get(name).await? {
            Some(current) if current >= version => Ok(false),
            _ => {
                self.set(name, version).await?;
                Ok(true)
            }
        }
    }

    /// Point at the given maximum, or clear when no version remains
    pub async fn reset(&self, name: &str, max_version: Option<u32>) -> MetadataResult<()> {
        match max_version {
            Some(version) => self.set(name, version).await,
            None => self.clear(name).await.map(|_| ()),
        }
    }

    pub async fn snapshot(&self) -> MetadataResult<BTreeMap<String, u32>> {
        let mut pointers = BTreeMap::new();
        for cell in self.backend.scan_table(&self.table).await? {
            pointers.insert(cell.key.partition, codec::decode(&cell.value)?);
        }
        Ok(pointers)
    }
}

/// Denormalized projection of an event handler inside the event index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventIndexEntry {
    pub name: String,
    pub active: bool,
}

/// Event -> handlers projection, avoiding a full scan when listing by event
#[derive(Debug, Clone)]
pub struct EventIndex {
    backend: Arc<dyn ColumnStore>,
    table: String,
}

impl EventIndex {
    pub fn new(backend: Arc<dyn ColumnStore>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub async fn add(&self, event: &str, name: &str, active: bool) -> MetadataResult<()> {
        let entry = EventIndexEntry {
            name: name.to_string(),
            active,
        };
        self.backend
            .put(&self.table, &RowKey::new(event, name), &codec::encode(&entry)?)
            .await?;
        tracing::debug!("Indexed event handler {} under {} (active: {})", name, event, active);
        Ok(())
    }

    pub async fn remove(&self, event: &str, name: &str) -> MetadataResult<bool> {
        Ok(self
            .backend
            .delete(&self.table, &RowKey::new(event, name))
            .await?)
    }

    pub async fn entries(&self, event: &str) -> MetadataResult<Vec<EventIndexEntry>> {
        self.backend
            .scan_partition(&self.table, event)
            .await?
            .iter()
            .map(|cell| codec::decode(&cell.value))
            .collect()
    }

    /// Whole index as (event, entry) pairs
    pub async fn snapshot(&self) -> MetadataResult<Vec<(String, EventIndexEntry)>> {
        self.backend
            .scan_table(&self.table)
            .await?
            .into_iter()
            .map(|cell| Ok((cell.key.partition, codec::decode(&cell.value)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn version_keys_sort_numerically() {
        let mut keys = vec![version_key(10), version_key(2), version_key(1)];
        keys.sort();
        let versions: Vec<_> = keys.iter().filter_map(|k| parse_version_key(k)).collect();
        assert_eq!(versions, vec![1, 2, 10]);
    }

    #[tokio::test]
    async fn pointer_only_advances_upwards() {
        let pointer = LatestVersionPointer::new(Arc::new(MemoryStore::new()), "latest");
        assert!(pointer.advance("wf", 2).await.unwrap());
        assert!(!pointer.advance("wf", 1).await.unwrap());
        assert!(!pointer.advance("wf", 2).await.unwrap());
        assert_eq!(pointer.get("wf").await.unwrap(), Some(2));

        pointer.reset("wf", None).await.unwrap();
        assert_eq!(pointer.get("wf").await.unwrap(), None);
    }

    #[tokio::test]
    async fn version_index_tracks_per_name_sets() {
        let index = VersionIndex::new(Arc::new(MemoryStore::new()), "versions");
        index.add("wf", 10).await.unwrap();
        index.add("wf", 2).await.unwrap();
        index.add("other", 7).await.unwrap();

        assert_eq!(index.versions("wf").await.unwrap(), vec![2, 10]);
        assert_eq!(index.max_version("wf").await.unwrap(), Some(10));
        assert!(index.remove("wf", 10).await.unwrap());
        assert_eq!(index.max_version("wf").await.unwrap(), Some(2));
        assert_eq!(index.max_version("missing").await.unwrap(), None);
        assert_eq!(index.snapshot().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn event_index_overwrites_active_flag() {
        let index = EventIndex::new(Arc::new(MemoryStore::new()), "by_event");
        index.add("e", "h1", false).await.unwrap();
        index.add("e", "h1", true).await.unwrap();

        let entries = index.entries("e").await.unwrap();
        assert_eq!(
            entries,
            vec![EventIndexEntry {
                name: "h1".to_string(),
                active: true
            }]
        );
    }
}
