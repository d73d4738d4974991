/// SQLite adapter for the column store boundary
///
/// Each logical table becomes one SQLite table keyed by (partition_key, clustering_key).
/// Values are stored as opaque TEXT; the conditional write maps onto
/// `INSERT .. ON CONFLICT DO NOTHING`, which SQLite applies atomically.

use crate::{
    config::TableNames,
    storage::{
        validate_table_name, Cell, ColumnStore, ConditionalWrite, RowKey, StorageError,
        StorageResult,
    },
};
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::Path;

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(e) => Self::Unavailable(format!("io: {}", e)),
            sqlx::Error::PoolTimedOut => Self::Unavailable("connection pool timed out".to_string()),
            sqlx::Error::PoolClosed => Self::Unavailable("connection pool closed".to_string()),
            sqlx::Error::WorkerCrashed => Self::Unavailable("sqlite worker crashed".to_string()),
            other => Self::Backend(other.to_string()),
        }
    }
}

/// SQLite-backed column store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    /// SQLite connection pool
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (or create) a database file
    pub async fn connect(path: &str) -> StorageResult<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Unavailable(format!(
                        "failed to create database directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        Ok(Self::new(pool))
    }

    /// Private in-memory database.
    ///
    /// A single connection that never idles out, since every SQLite memory
    /// connection is its own database.
    pub async fn connect_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create one table per logical table.
    ///
    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self, tables: &TableNames) -> StorageResult<()> {
        for table in tables.all() {
            validate_table_name(table)?;
            let ddl = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    partition_key TEXT NOT NULL,
                    clustering_key TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                    PRIMARY KEY (partition_key, clustering_key)
                )
                "#
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        tracing::debug!("SQLite column store schema ready ({} tables)", tables.all().len());
        Ok(())
    }

    fn rows_to_cells(rows: Vec<sqlx::sqlite::SqliteRow>) -> Vec<Cell> {
        rows.into_iter()
            .map(|row| Cell {
                key: RowKey::new(
                    row.get::<String, _>("partition_key"),
                    row.get::<String, _>("clustering_key"),
                ),
                value: row.get("payload"),
            })
            .collect()
    }
}

#[async_trait]
impl ColumnStore for SqliteStore {
    async fn get(&self, table: &str, key: &RowKey) -> StorageResult<Option<String>> {
        validate_table_name(table)?;
        let sql = format!(
            "SELECT payload FROM {table} WHERE partition_key = ? AND clustering_key = ?"
        );
        let row = sqlx::query(&sql)
            .bind(&key.partition)
            .bind(&key.clustering)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.get("payload")))
    }

    async fn put(&self, table: &str, key: &RowKey, value: &str) -> StorageResult<()> {
        validate_table_name(table)?;
        let sql = format!(
            r#"
            INSERT INTO {table} (partition_key, clustering_key, payload, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(partition_key, clustering_key) DO UPDATE SET
                payload = excluded.payload,
                updated_at = CURRENT_TIMESTAMP
            "#
        );
        sqlx::query(&sql)
            .bind(&key.partition)
            .bind(&key.clustering)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_if_absent(
        &self,
        table: &str,
        key: &RowKey,
        value: &str,
    ) -> StorageResult<ConditionalWrite> {
        validate_table_name(table)?;
        let sql = format!(
            r#"
            INSERT INTO {table} (partition_key, clustering_key, payload)
            VALUES (?, ?, ?)
            ON CONFLICT(partition_key, clustering_key) DO NOTHING
            "#
        );
        let result = sqlx::query(&sql)
            .bind(&key.partition)
            .bind(&key.clustering)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(if result.rows_affected() > 0 {
            ConditionalWrite::Applied
        } else {
            ConditionalWrite::Rejected
        })
    }

    async fn delete(&self, table: &str, key: &RowKey) -> StorageResult<bool> {
        validate_table_name(table)?;
        let sql = format!("DELETE FROM {table} WHERE partition_key = ? AND clustering_key = ?");
        let result = sqlx::query(&sql)
            .bind(&key.partition)
            .bind(&key.clustering)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan_partition(&self, table: &str, partition: &str) -> StorageResult<Vec<Cell>> {
        validate_table_name(table)?;
        let sql = format!(
            "SELECT partition_key, clustering_key, payload FROM {table} \
             WHERE partition_key = ? ORDER BY clustering_key"
        );
        let rows = sqlx::query(&sql)
            .bind(partition)
            .fetch_all(&self.pool)
            .await?;
        Ok(Self::rows_to_cells(rows))
    }

    async fn scan_table(&self, table: &str) -> StorageResult<Vec<Cell>> {
        validate_table_name(table)?;
        let sql = format!(
            "SELECT partition_key, clustering_key, payload FROM {table} \
             ORDER BY partition_key, clustering_key"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(Self::rows_to_cells(rows))
    }

    fn supports_conditional_writes(&self) -> bool {
        true
    }
}
