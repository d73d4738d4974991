/// HTTP API Layer
///
/// REST endpoints exposing the metadata operations to the orchestration engine:
/// - Workflow definition CRUD and version listing
/// - Task definition CRUD
/// - Event handler registration and lookup by event
/// - Administrative reconciliation of derived tables

use crate::{error::MetadataError, metadata::MetadataStores};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

// Workflow and task definition endpoints
pub mod metadata;

// Event handler endpoints
pub mod events;

pub use events::create_event_routes;
pub use metadata::create_metadata_routes;

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub stores: MetadataStores,
}

/// Error wrapper turning domain errors into HTTP responses
#[derive(Debug)]
pub struct ApiError(pub MetadataError);

impl From<MetadataError> for ApiError {
    fn from(err: MetadataError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MetadataError::Validation(_) => StatusCode::BAD_REQUEST,
            MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
            MetadataError::AlreadyExists { .. } => StatusCode::CONFLICT,
            err if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Turn an absent read into a 404
pub(crate) fn found<T>(value: Option<T>, what: impl FnOnce() -> String) -> ApiResult<T> {
    value.ok_or_else(|| ApiError(MetadataError::NotFound(what())))
}
