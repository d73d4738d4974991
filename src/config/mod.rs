/// Configuration management for the metadata service
///
/// Handles server configuration, backend selection, table names and per-call deadlines.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Storage backend configuration
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Which wide-column backend adapter to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local ordered maps, lost on restart
    Memory,
    /// SQLite file emulating partition/clustering rows
    Sqlite,
}

impl BackendKind {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Backend named by COLMETA_BACKEND; unset or unrecognised values select SQLite
    fn from_env_or_default(value: Option<&str>) -> Self {
        match value {
            None => Self::Sqlite,
            Some(value) => Self::from_env_value(value).unwrap_or_else(|| {
                tracing::warn!(
                    "Unrecognised COLMETA_BACKEND {:?}, falling back to sqlite (expected memory or sqlite)",
                    value
                );
                Self::Sqlite
            }),
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend adapter
    pub backend: BackendKind,
    /// Database file used by the SQLite adapter
    pub sqlite_path: String,
    /// Deadline applied to every individual backend call
    pub operation_timeout_ms: u64,
    /// Logical table names
    pub tables: TableNames,
}

impl StorageConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

/// Logical table names for primary records and their derived projections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    /// (name, version) -> workflow definition payload
    pub workflow_defs: String,
    /// name -> set of versions
    pub workflow_def_versions: String,
    /// name -> latest version
    pub workflow_def_latest: String,
    /// name -> task definition payload
    pub task_defs: String,
    /// name -> event handler payload
    pub event_handlers: String,
    /// event -> (handler name, active)
    pub event_handlers_by_event: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            workflow_defs: "workflow_defs".to_string(),
            workflow_def_versions: "workflow_def_versions".to_string(),
            workflow_def_latest: "workflow_def_latest".to_string(),
            task_defs: "task_defs".to_string(),
            event_handlers: "event_handlers".to_string(),
            event_handlers_by_event: "event_handlers_by_event".to_string(),
        }
    }
}

impl TableNames {
    /// Read table name overrides (COLMETA_TABLE_<NAME>) on top of the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let pick = |suffix: &str, fallback: String| {
            std::env::var(format!("COLMETA_TABLE_{}", suffix)).unwrap_or(fallback)
        };
        Self {
            workflow_defs: pick("WORKFLOW_DEFS", defaults.workflow_defs),
            workflow_def_versions: pick("WORKFLOW_DEF_VERSIONS", defaults.workflow_def_versions),
            workflow_def_latest: pick("WORKFLOW_DEF_LATEST", defaults.workflow_def_latest),
            task_defs: pick("TASK_DEFS", defaults.task_defs),
            event_handlers: pick("EVENT_HANDLERS", defaults.event_handlers),
            event_handlers_by_event: pick("EVENT_HANDLERS_BY_EVENT", defaults.event_handlers_by_event),
        }
    }

    /// All table names, primary tables first
    pub fn all(&self) -> [&str; 6] {
        [
            &self.workflow_defs,
            &self.workflow_def_versions,
            &self.workflow_def_latest,
            &self.task_defs,
            &self.event_handlers,
            &self.event_handlers_by_event,
        ]
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("COLMETA_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("COLMETA_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .unwrap_or(8080),
            },
            storage: StorageConfig {
                backend: BackendKind::from_env_or_default(
                    std::env::var("COLMETA_BACKEND").ok().as_deref(),
                ),
                sqlite_path: std::env::var("COLMETA_SQLITE_PATH")
                    .unwrap_or_else(|_| "data/metadata.db".to_string()),
                operation_timeout_ms: std::env::var("COLMETA_OPERATION_TIMEOUT_MS")
                    .ok()
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(5000),
                tables: TableNames::from_env(),
            },
        }
    }
}
