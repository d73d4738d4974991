/// Metadata Persistence Layer
///
/// Stores workflow definitions, task definitions and event handlers on top of a
/// `ColumnStore`:
/// - Record types (WorkflowDef, TaskDef, EventHandler)
/// - Versioned workflow definition store with latest pointer and version index
/// - Unversioned task definition store
/// - Event handler registry indexed by event
/// - Reconciliation of the derived tables from the primary ones

// Record type definitions
pub mod types;

// Derived tables and their read/write contract
pub mod index;

pub mod workflow_defs;
pub mod task_defs;
pub mod event_handlers;

// Rebuilds derived tables from primary scans
pub mod reconcile;

pub use event_handlers::EventHandlerRegistry;
pub use index::{EventIndex, EventIndexEntry, LatestVersionPointer, VersionIndex};
pub use reconcile::{ReconcileReport, Reconciler};
pub use task_defs::TaskDefStore;
pub use types::{EventHandler, TaskDef, WorkflowDef};
pub use workflow_defs::WorkflowDefStore;

use crate::{config::TableNames, storage::ColumnStore};
use std::sync::Arc;

/// All metadata stores sharing one backend
///
/// Each backend call is bounded by the `DeadlineStore` opened in
/// `storage::open_backend`. A caller that needs a deadline on a whole operation
/// wraps it in `tokio::time::timeout`; the dropped future stops between backend
/// calls, and since primary rows are written before derived ones the stores are
/// left in a state that reads tolerate and `Reconciler::run` repairs.
#[derive(Debug, Clone)]
pub struct MetadataStores {
    pub workflow_defs: WorkflowDefStore,
    pub task_defs: TaskDefStore,
    pub event_handlers: EventHandlerRegistry,
    pub reconciler: Reconciler,
}

impl MetadataStores {
    pub fn new(backend: Arc<dyn ColumnStore>, tables: &TableNames) -> Self {
        let versions = VersionIndex::new(backend.clone(), &tables.workflow_def_versions);
        let latest = LatestVersionPointer::new(backend.clone(), &tables.workflow_def_latest);
        let by_event = EventIndex::new(backend.clone(), &tables.event_handlers_by_event);

        let workflow_defs = WorkflowDefStore::new(
            backend.clone(),
            &tables.workflow_defs,
            versions.clone(),
            latest.clone(),
        );
        let task_defs = TaskDefStore::new(backend.clone(), &tables.task_defs);
        let event_handlers =
            EventHandlerRegistry::new(backend, &tables.event_handlers, by_event.clone());
        let reconciler = Reconciler::new(
            workflow_defs.clone(),
            versions,
            latest,
            event_handlers.clone(),
            by_event,
        );

        Self {
            workflow_defs,
            task_defs,
            event_handlers,
            reconciler,
        }
    }
}
