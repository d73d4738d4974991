/// Per-call deadline decorator
///
/// Bounds every backend call with `tokio::time::timeout`. An elapsed deadline
/// surfaces as the retryable `StorageError::Timeout`; the stores above never
/// retry it themselves.

use crate::storage::{Cell, ColumnStore, ConditionalWrite, RowKey, StorageError, StorageResult};
use async_trait::async_trait;
use std::{future::Future, time::Duration};

#[derive(Debug)]
pub struct DeadlineStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: ColumnStore> DeadlineStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(&self, call: impl Future<Output = StorageResult<T>>) -> StorageResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Backend call exceeded deadline of {:?}", self.timeout);
                Err(StorageError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl<S: ColumnStore> ColumnStore for DeadlineStore<S> {
    async fn get(&self, table: &str, key: &RowKey) -> StorageResult<Option<String>> {
        self.bounded(self.inner.get(table, key)).await
    }

    async fn put(&self, table: &str, key: &RowKey, value: &str) -> StorageResult<()> {
        self.bounded(self.inner.put(table, key, value)).await
    }

    async fn put_if_absent(
        &self,
        table: &str,
        key: &RowKey,
        value: &str,
    ) -> StorageResult<ConditionalWrite> {
        self.bounded(self.inner.put_if_absent(table, key, value)).await
    }

    async fn delete(&self, table: &str, key: &RowKey) -> StorageResult<bool> {
        self.bounded(self.inner.delete(table, key)).await
    }

    async fn scan_partition(&self, table: &str, partition: &str) -> StorageResult<Vec<Cell>> {
        self.bounded(self.inner.scan_partition(table, partition)).await
    }

    async fn scan_table(&self, table: &str) -> StorageResult<Vec<Cell>> {
        self.bounded(self.inner.scan_table(table)).await
    }

    fn supports_conditional_writes(&self) -> bool {
        self.inner.supports_conditional_writes()
    }
}
