/// Wide-column storage boundary
///
/// The metadata stores only ever talk to a `ColumnStore`: rows addressed by
/// (table, partition key, clustering key) holding an opaque text value, with
/// per-row atomicity and no cross-row transactions.
/// - `memory`: ordered in-process maps, used by tests and ephemeral deployments
/// - `sqlite`: sqlx-backed adapter emulating partition/clustering rows
/// - `deadline`: decorator bounding every backend call with a timeout

pub mod deadline;
pub mod memory;
pub mod sqlite;

pub use deadline::DeadlineStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::{BackendKind, StorageConfig};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};

/// Errors raised by a backend adapter
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend could not be reached or refused the call; safe to retry
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish within its deadline; safe to retry
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),

    /// Table name rejected before reaching the backend
    #[error("invalid table name: {0}")]
    InvalidTable(String),

    /// Any other backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Transient failures that an external resilience layer may retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Address of a single row inside a logical table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey {
    /// Partition key, groups rows that are scanned together
    pub partition: String,
    /// Clustering key, orders rows inside a partition
    pub clustering: String,
}

impl RowKey {
    pub fn new(partition: impl Into<String>, clustering: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            clustering: clustering.into(),
        }
    }

    /// Key for tables holding one row per partition
    pub fn partition_only(partition: impl Into<String>) -> Self {
        Self::new(partition, "")
    }
}

/// A row returned by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub key: RowKey,
    pub value: String,
}

/// Outcome of an insert-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionalWrite {
    /// The row was absent and has been written
    Applied,
    /// A row already existed; nothing was written
    Rejected,
}

/// Key-addressable wide-column backend
///
/// Scans return rows ordered by (partition, clustering).
#[async_trait]
pub trait ColumnStore: Send + Sync + std::fmt::Debug {
    async fn get(&self, table: &str, key: &RowKey) -> StorageResult<Option<String>>;

    /// Unconditional upsert, last write wins
    async fn put(&self, table: &str, key: &RowKey, value: &str) -> StorageResult<()>;

    /// Insert only if the row is absent.
    ///
    /// The default is a read followed by a write. Two concurrent callers can both
    /// observe the row as absent and both write; adapters with a native
    /// conditional primitive override this and report it through
    /// `supports_conditional_writes`.
    async fn put_if_absent(
        &self,
        table: &str,
        key: &RowKey,
        value: &str,
    ) -> StorageResult<ConditionalWrite> {
        if self.get(table, key).await?.is_some() {
            return Ok(ConditionalWrite::Rejected);
        }
        self.put(table, key, value).await?;
        Ok(ConditionalWrite::Applied)
    }

    /// Delete a row, returning whether it existed
    async fn delete(&self, table: &str, key: &RowKey) -> StorageResult<bool>;

    async fn scan_partition(&self, table: &str, partition: &str) -> StorageResult<Vec<Cell>>;

    /// Full table scan, cost proportional to the row count
    async fn scan_table(&self, table: &str) -> StorageResult<Vec<Cell>>;

    fn supports_conditional_writes(&self) -> bool {
        false
    }
}

/// Table names end up in SQL text, so only plain identifiers are accepted
pub fn validate_table_name(table: &str) -> StorageResult<()> {
    let mut chars = table.chars();
    let valid_start = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StorageError::InvalidTable(table.to_string()))
    }
}

/// Open the configured backend, wrapped with the per-call deadline
pub async fn open_backend(config: &StorageConfig) -> StorageResult<Arc<dyn ColumnStore>> {
    for table in config.tables.all() {
        validate_table_name(table)?;
    }

    let timeout = config.operation_timeout();
    let backend: Arc<dyn ColumnStore> = match config.backend {
        BackendKind::Memory => {
            tracing::info!("Opening in-memory column store");
            Arc::new(DeadlineStore::new(MemoryStore::new(), timeout))
        }
        BackendKind::Sqlite => {
            tracing::info!("Opening SQLite column store at {}", config.sqlite_path);
            let store = SqliteStore::connect(&config.sqlite_path).await?;
            store.init_schema(&config.tables).await?;
            Arc::new(DeadlineStore::new(store, timeout))
        }
    };

    Ok(backend)
}
