/// Unversioned task definition store
///
/// One row per task name, no derived state. Create and update are both upserts.

use crate::{
    codec,
    error::MetadataResult,
    metadata::types::TaskDef,
    storage::{ColumnStore, RowKey},
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TaskDefStore {
    backend: Arc<dyn ColumnStore>,
    table: String,
}

impl TaskDefStore {
    pub fn new(backend: Arc<dyn ColumnStore>, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    /// Register a task definition, overwriting any previous one with the same name
    pub async fn create(&self, def: &TaskDef) -> MetadataResult<()> {
        self.upsert(def).await?;
        tracing::info!("Created task definition {}", def.name);
        Ok(())
    }

    pub async fn update(&self, def: &TaskDef) -> MetadataResult<()> {
        self.upsert(def).await?;
        tracing::info!("Updated task definition {}", def.name);
        Ok(())
    }

    async fn upsert(&self, def: &TaskDef) -> MetadataResult<()> {
        def.validate()?;
        let payload = codec::encode(def)?;
        self.backend
            .put(&self.table, &RowKey::partition_only(&def.name), &payload)
            .await?;
        Ok(())
    }

    pub async fn get(&self, name: &str) -> MetadataResult<Option<TaskDef>> {
        match self
            .backend
            .get(&self.table, &RowKey::partition_only(name))
            .await?
        {
            Some(payload) => Ok(Some(codec::decode(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn get_all(&self) -> MetadataResult<Vec<TaskDef>> {
        self.backend
            .scan_table(&self.table)
            .await?
            .iter()
            .map(|cell| codec::decode(&cell.value))
            .collect()
    }

    /// Delete by name; returns whether a row existed
    pub async fn remove(&self, name: &str) -> MetadataResult<bool> {
        let removed = self
            .backend
            .delete(&self.table, &RowKey::partition_only(name))
            .await?;
        if removed {
            tracing::info!("Removed task definition {}", name);
        }
        Ok(removed)
    }
}
