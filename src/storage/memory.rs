/// In-memory column store
///
/// Keeps every logical table as an ordered map behind a tokio RwLock. Used by the
/// test suites and by `COLMETA_BACKEND=memory` deployments.

use crate::storage::{Cell, ColumnStore, ConditionalWrite, RowKey, StorageResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

type Table = BTreeMap<RowKey, String>;

#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    /// When false, inserts-if-absent fall back to the racy read-then-write path
    conditional_writes: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            conditional_writes: true,
        }
    }

    /// Behave like a backend without an insert-if-absent primitive
    pub fn without_conditional_writes() -> Self {
        Self {
            conditional_writes: false,
            ..Self::new()
        }
    }

    /// Number of rows currently held in a table
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, |rows| rows.len())
    }
}

#[async_trait]
impl ColumnStore for MemoryStore {
    async fn get(&self, table: &str, key: &RowKey) -> StorageResult<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    async fn put(&self, table: &str, key: &RowKey, value: &str) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(key.clone(), value.to_string());
        Ok(())
    }

    async fn put_if_absent(
        &self,
        table: &str,
        key: &RowKey,
        value: &str,
    ) -> StorageResult<ConditionalWrite> {
        if !self.conditional_writes {
            if self.get(table, key).await?.is_some() {
                return Ok(ConditionalWrite::Rejected);
            }
            self.put(table, key, value).await?;
            return Ok(ConditionalWrite::Applied);
        }

        // Check and insert under one write guard
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();
        if rows.contains_key(key) {
            return Ok(ConditionalWrite::Rejected);
        }
        rows.insert(key.clone(), value.to_string());
        Ok(ConditionalWrite::Applied)
    }

    async fn delete(&self, table: &str, key: &RowKey) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(table)
            .map(|rows| rows.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn scan_partition(&self, table: &str, partition: &str) -> StorageResult<Vec<Cell>> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };
        let start = RowKey::new(partition, "");
        Ok(rows
            .range(start..)
            .take_while(|(key, _)| key.partition == partition)
            .map(|(key, value)| Cell {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn scan_table(&self, table: &str) -> StorageResult<Vec<Cell>> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .map(|(key, value)| Cell {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn supports_conditional_writes(&self) -> bool {
        self.conditional_writes
    }
}
