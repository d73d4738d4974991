/// colmeta: workflow metadata persistence over a wide-column store
///
/// Stores versioned workflow definitions, task definitions and event handlers,
/// keeping the derived version index, latest version pointer and event index in
/// step with the primary records without cross-row transactions.

// Core configuration and setup
pub mod config;

// Domain error type shared by all stores
pub mod error;

// Wide-column backend boundary and adapters
pub mod storage;

// Payload encoding of definitions
pub mod codec;

// Metadata stores, derived indexes and reconciliation
pub mod metadata;

// HTTP API layer - REST endpoints over the metadata stores
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use error::{MetadataError, MetadataResult};
pub use metadata::{
    EventHandler, EventHandlerRegistry, MetadataStores, ReconcileReport, TaskDef, TaskDefStore,
    WorkflowDef, WorkflowDefStore,
};
pub use server::start_server;
pub use storage::{ColumnStore, MemoryStore, SqliteStore, StorageError};
