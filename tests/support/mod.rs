#![allow(dead_code)]

use async_trait::async_trait;
use colmeta::{
    config::TableNames,
    storage::{Cell, ColumnStore, ConditionalWrite, MemoryStore, RowKey, StorageError, StorageResult},
    MetadataStores,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    sync::Mutex,
};

/// Memory backend that fails a configured number of writes per table, or
/// never completes writes to a stalled table
#[derive(Debug, Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pending_failures: Mutex<HashMap<String, usize>>,
    stalled: Mutex<HashSet<String>>,
}

impl FaultyStore {
    pub fn fail_next_writes(&self, table: &str, count: usize) {
        self.pending_failures
            .lock()
            .unwrap()
            .insert(table.to_string(), count);
    }

    pub fn stall_writes(&self, table: &str) {
        self.stalled.lock().unwrap().insert(table.to_string());
    }

    pub fn resume_writes(&self, table: &str) {
        self.stalled.lock().unwrap().remove(table);
    }

    async fn stall_if_needed(&self, table: &str) {
        let stalled = self.stalled.lock().unwrap().contains(table);
        if stalled {
            std::future::pending::<()>().await;
        }
    }

    fn check_write(&self, table: &str) -> StorageResult<()> {
        let mut pending = self.pending_failures.lock().unwrap();
        match pending.get_mut(table) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(StorageError::Unavailable(format!("injected failure on {}", table)))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ColumnStore for FaultyStore {
    async fn get(&self, table: &str, key: &RowKey) -> StorageResult<Option<String>> {
        self.inner.get(table, key).await
    }

    async fn put(&self, table: &str, key: &RowKey, value: &str) -> StorageResult<()> {
        self.check_write(table)?;
        self.stall_if_needed(table).await;
        self.inner.put(table, key, value).await
    }

    async fn put_if_absent(
        &self,
        table: &str,
        key: &RowKey,
        value: &str,
    ) -> StorageResult<ConditionalWrite> {
        self.check_write(table)?;
        self.stall_if_needed(table).await;
        self.inner.put_if_absent(table, key, value).await
    }

    async fn delete(&self, table: &str, key: &RowKey) -> StorageResult<bool> {
        self.check_write(table)?;
        self.stall_if_needed(table).await;
        self.inner.delete(table, key).await
    }

    async fn scan_partition(&self, table: &str, partition: &str) -> StorageResult<Vec<Cell>> {
        self.inner.scan_partition(table, partition).await
    }

    async fn scan_table(&self, table: &str) -> StorageResult<Vec<Cell>> {
        self.inner.scan_table(table).await
    }

    fn supports_conditional_writes(&self) -> bool {
        self.inner.supports_conditional_writes()
    }
}

pub fn memory_stores() -> MetadataStores {
    MetadataStores::new(Arc::new(MemoryStore::new()), &TableNames::default())
}

pub fn faulty_stores() -> (Arc<FaultyStore>, MetadataStores) {
    let backend = Arc::new(FaultyStore::default());
    let stores = MetadataStores::new(backend.clone(), &TableNames::default());
    (backend, stores)
}

/// Register, version, update, re-create and remove a workflow definition
pub async fn workflow_def_crud_scenario(stores: &MetadataStores) {
    use colmeta::{MetadataError, WorkflowDef};

    let defs = &stores.workflow_defs;
    let name = "workflow_def_1";

    let mut def = WorkflowDef::new(name, 1);
    def.owner_email = Some("test@junit.com".to_string());

    defs.create(&def).await.unwrap();
    assert!(defs.exists(&def).await.unwrap());
    assert_eq!(defs.get(name, 1).await.unwrap(), Some(def.clone()));

    let all = defs.get_all().await.unwrap();
    assert_eq!(all, vec![def.clone()]);

    // register a higher version
    def.version = 2;
    def.description = Some("higher version".to_string());
    defs.create(&def).await.unwrap();
    assert!(defs.exists(&def).await.unwrap());
    assert_eq!(defs.get(name, 2).await.unwrap(), Some(def.clone()));
    assert_eq!(defs.get_latest(name).await.unwrap(), Some(def.clone()));
    assert_eq!(defs.get_all().await.unwrap().len(), 2);

    // modify the definition
    def.owner_email = Some("junit@test.com".to_string());
    defs.update(&def).await.unwrap();
    assert_eq!(defs.get(name, 2).await.unwrap(), Some(def.clone()));

    // registering the same version again fails
    let err = defs.create(&def).await.unwrap_err();
    assert!(matches!(err, MetadataError::AlreadyExists { .. }));
    assert_eq!(
        err.to_string(),
        "Workflow: workflow_def_1, version: 2 already exists!"
    );

    defs.remove(name, 2).await.unwrap();
    assert_eq!(defs.get(name, 2).await.unwrap(), None);
    assert_eq!(defs.get_all().await.unwrap().len(), 1);
    assert!(!defs.exists(&def).await.unwrap());
    assert_eq!(defs.get_latest(name).await.unwrap().map(|d| d.version), Some(1));
}

/// Two handlers on one event, one active, then removal of the inactive one
pub async fn event_handler_crud_scenario(stores: &MetadataStores) {
    use colmeta::EventHandler;

    let registry = &stores.event_handlers;
    let event = "event";

    let handler = EventHandler::new("event_handler1", event);
    registry.add(&handler).await.unwrap();

    let handlers = registry.get_for_event(event, false).await.unwrap();
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].name, handler.name);
    assert_eq!(handlers[0].event, handler.event);
    assert!(!handlers[0].active);

    let mut active = EventHandler::new("event_handler2", event);
    active.active = true;
    registry.add(&active).await.unwrap();

    assert_eq!(registry.get_all().await.unwrap().len(), 2);
    assert_eq!(registry.get_for_event(event, false).await.unwrap().len(), 2);

    let handlers = registry.get_for_event(event, true).await.unwrap();
    assert_eq!(handlers, vec![active.clone()]);

    assert!(registry.remove("event_handler1").await.unwrap());
    assert_eq!(registry.get_all().await.unwrap(), vec![active.clone()]);
    assert_eq!(
        registry.get_for_event(event, false).await.unwrap(),
        vec![active]
    );
}

/// Write performed by `InterleavingStore` in the middle of a table scan
#[derive(Debug, Clone)]
pub enum Interleave {
    CreateWorkflowDef(colmeta::WorkflowDef),
    AddEventHandler(colmeta::EventHandler),
}

/// Memory backend that runs one concurrent-looking write the first time a
/// given table is scanned, before the scan reads any rows
#[derive(Debug)]
pub struct InterleavingStore {
    pub inner: MemoryStore,
    table: String,
    write: Interleave,
    stores: std::sync::OnceLock<MetadataStores>,
    fired: std::sync::atomic::AtomicBool,
}

impl InterleavingStore {
    pub fn stores(table: &str, write: Interleave) -> MetadataStores {
        let backend = Arc::new(Self {
            inner: MemoryStore::new(),
            table: table.to_string(),
            write,
            stores: std::sync::OnceLock::new(),
            fired: std::sync::atomic::AtomicBool::new(false),
        });
        let stores = MetadataStores::new(backend.clone(), &TableNames::default());
        backend.stores.set(stores.clone()).unwrap();
        stores
    }

    async fn interleave(&self) {
        if self.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
            return;
        }
        let stores = self.stores.get().unwrap();
        match &self.write {
            Interleave::CreateWorkflowDef(def) => stores.workflow_defs.create(def).await.unwrap(),
            Interleave::AddEventHandler(handler) => stores.event_handlers.add(handler).await.unwrap(),
        }
    }
}

#[async_trait]
impl ColumnStore for InterleavingStore {
    async fn get(&self, table: &str, key: &RowKey) -> StorageResult<Option<String>> {
        self.inner.get(table, key).await
    }

    async fn put(&self, table: &str, key: &RowKey, value: &str) -> StorageResult<()> {
        self.inner.put(table, key, value).await
    }

    async fn put_if_absent(
        &self,
        table: &str,
        key: &RowKey,
        value: &str,
    ) -> StorageResult<ConditionalWrite> {
        self.inner.put_if_absent(table, key, value).await
    }

    async fn delete(&self, table: &str, key: &RowKey) -> StorageResult<bool> {
        self.inner.delete(table, key).await
    }

    async fn scan_partition(&self, table: &str, partition: &str) -> StorageResult<Vec<Cell>> {
        self.inner.scan_partition(table, partition).await
    }

    async fn scan_table(&self, table: &str) -> StorageResult<Vec<Cell>> {
        if table == self.table {
            self.interleave().await;
        }
        self.inner.scan_table(table).await
    }

    fn supports_conditional_writes(&self) -> bool {
        self.inner.supports_conditional_writes()
    }
}
