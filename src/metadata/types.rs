/// Metadata record types
///
/// Value types with field-wise equality. The stores persist them through the
/// payload codec; only the key fields (name, version, event, active) are
/// interpreted by this crate.

use crate::error::{MetadataError, MetadataResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_schema_version() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

/// A versioned workflow definition, identified by (name, version)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
    /// Definition name shared by all versions (e.g., "order_fulfillment")
    pub name: String,
    /// Positive version number
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    /// Task graph, opaque to this layer
    #[serde(default)]
    pub tasks: Vec<Value>,
    #[serde(default)]
    pub input_parameters: Vec<String>,
    #[serde(default)]
    pub output_parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_workflow: Option<String>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_true")]
    pub restartable: bool,
    #[serde(default)]
    pub timeout_seconds: u64,
}

impl WorkflowDef {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            description: None,
            owner_email: None,
            tasks: Vec::new(),
            input_parameters: Vec::new(),
            output_parameters: Map::new(),
            failure_workflow: None,
            schema_version: default_schema_version(),
            restartable: true,
            timeout_seconds: 0,
        }
    }

    pub fn validate(&self) -> MetadataResult<()> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::validation("Workflow name cannot be empty"));
        }
        if self.version == 0 {
            return Err(MetadataError::validation(format!(
                "Workflow: {}, version must be a positive integer",
                self.name
            )));
        }
        Ok(())
    }
}

/// An unversioned task definition, identified by name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    /// 0 means no overall timeout
    #[serde(default)]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub response_timeout_seconds: u64,
    #[serde(default)]
    pub input_keys: Vec<String>,
    #[serde(default)]
    pub output_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent_exec_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_frequency: Option<u32>,
}

impl TaskDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MetadataResult<()> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::validation("Task definition name cannot be empty"));
        }
        if self.timeout_seconds > 0 && self.response_timeout_seconds > self.timeout_seconds {
            return Err(MetadataError::validation(format!(
                "TaskDef: {} responseTimeoutSeconds: {} must be less than timeoutSeconds: {}",
                self.name, self.response_timeout_seconds, self.timeout_seconds
            )));
        }
        Ok(())
    }
}

/// A handler reacting to an event, identified by name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHandler {
    pub name: String,
    /// Event this handler reacts to (e.g., "sqs:order_queue")
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub actions: Vec<Value>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluator_type: Option<String>,
}

impl EventHandler {
    pub fn new(name: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            event: event.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MetadataResult<()> {
        if self.name.trim().is_empty() {
            return Err(MetadataError::validation("Event handler name cannot be empty"));
        }
        if self.event.trim().is_empty() {
            return Err(MetadataError::validation(format!(
                "Event handler: {} must name an event",
                self.name
            )));
        }
        Ok(())
    }
}
