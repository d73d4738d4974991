/// Event handler registry
///
/// Primary rows are keyed by handler name. The event index groups handler names by
/// the event they react to, carrying the active flag so `get_for_event` can filter
/// before fetching the full records.

use crate::{
    codec,
    error::MetadataResult,
    metadata::{index::EventIndex, types::EventHandler},
    storage::{ColumnStore, RowKey},
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EventHandlerRegistry {
    backend: Arc<dyn ColumnStore>,
    table: String,
    by_event: EventIndex,
}

impl EventHandlerRegistry {
    pub fn new(backend: Arc<dyn ColumnStore>, table: impl Into<String>, by_event: EventIndex) -> Self {
        Self {
            backend,
            table: table.into(),
            by_event,
        }
    }

    /// Register a handler, overwriting any handler with the same name
    pub async fn add(&self, handler: &EventHandler) -> MetadataResult<()> {
        self.upsert(handler).await?;
        tracing::info!("Added event handler {} for {}", handler.name, handler.event);
        Ok(())
    }

    pub async fn update(&self, handler: &EventHandler) -> MetadataResult<()> {
        self.upsert(handler).await?;
        tracing::info!("Updated event handler {} for {}", handler.name, handler.event);
        Ok(())
    }

    /// Primary write, then index write, then cleanup of the previous event's entry
    /// when the handler moved to another event.
    async fn upsert(&self, handler: &EventHandler) -> MetadataResult<()> {
        handler.validate()?;
        let payload = codec::encode(handler)?;
        let key = RowKey::partition_only(&handler.name);

        let previous_event = match self.backend.get(&self.table, &key).await? {
            Some(previous) => Some(codec::decode::<EventHandler>(&previous)?.event),
            None => None,
        };

        self.backend.put(&self.table, &key, &payload).await?;
        self.by_event
            .add(&handler.event, &handler.name, handler.active)
            .await?;

        if let Some(previous_event) = previous_event.filter(|event| *event != handler.event) {
            self.by_event.remove(&previous_event, &handler.name).await?;
            tracing::debug!(
                "Moved event handler {} from {} to {}",
                handler.name,
                previous_event,
                handler.event
            );
        }
        Ok(())
    }

    pub async fn get(&self, name: &str) -> MetadataResult<Option<EventHandler>> {
        match self
            .backend
            .get(&self.table, &RowKey::partition_only(name))
            .await?
        {
            Some(payload) => Ok(Some(codec::decode(&payload)?)),
            None => Ok(None),
        }
    }

    pub async fn get_all(&self) -> MetadataResult<Vec<EventHandler>> {
        self.backend
            .scan_table(&self.table)
            .await?
            .iter()
            .map(|cell| codec::decode(&cell.value))
            .collect()
    }

    /// Handlers registered for an event.
    ///
    /// Index entries whose primary record is missing, or whose record now names a
    /// different event, are skipped. With `active_only` the index flag prefilters
    /// and the fetched record has the final say.
    pub async fn get_for_event(
        &self,
        event: &str,
        active_only: bool,
    ) -> MetadataResult<Vec<EventHandler>> {
        let entries = self.by_event.entries(event).await?;
        let mut handlers = Vec::with_capacity(entries.len());

        for entry in entries {
            if active_only && !entry.active {
                continue;
            }
            let Some(handler) = self.get(&entry.name).await? else {
                tracing::debug!("Skipping index entry {} for {}: no primary record", entry.name, event);
                continue;
            };
            if handler.event != event || (active_only && !handler.active) {
                tracing::debug!("Skipping stale index entry {} for {}", entry.name, event);
                continue;
            }
            handlers.push(handler);
        }

        Ok(handlers)
    }

    /// Remove a handler and its index entry.
    ///
    /// Returns false without touching anything when no such handler exists.
    pub async fn remove(&self, name: &str) -> MetadataResult<bool> {
        let Some(handler) = self.get(name).await? else {
            tracing::debug!("Event handler {} already absent", name);
            return Ok(false);
        };

        self.by_event.remove(&handler.event, name).await?;
        self.backend
            .delete(&self.table, &RowKey::partition_only(name))
            .await?;

        tracing::info!("Removed event handler {} for {}", name, handler.event);
        Ok(true)
    }
}
