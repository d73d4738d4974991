/// Workflow and task definition REST endpoints
///
/// Workflow definitions are addressed by name and version; omitting the version
/// on a read returns the latest one.

use crate::{
    api::{found, ApiResult, AppState},
    metadata::{ReconcileReport, TaskDef, WorkflowDef},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;

/// Optional version selector for workflow reads
#[derive(Debug, Deserialize)]
pub struct VersionQuery {
    pub version: Option<u32>,
}

/// Create metadata management routes
pub fn create_metadata_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/metadata/workflow",
            get(list_workflow_defs)
                .post(create_workflow_def)
                .put(update_workflow_def),
        )
        .route("/api/metadata/workflow/{name}", get(get_workflow_def))
        .route("/api/metadata/workflow/{name}/versions", get(list_versions))
        .route("/api/metadata/workflow/{name}/{version}", delete(remove_workflow_def))
        .route(
            "/api/metadata/taskdefs",
            get(list_task_defs).post(create_task_defs).put(update_task_def),
        )
        .route(
            "/api/metadata/taskdefs/{name}",
            get(get_task_def).delete(remove_task_def),
        )
        .route("/api/admin/reconcile", post(reconcile))
}

/// POST /api/metadata/workflow
async fn create_workflow_def(
    State(state): State<AppState>,
    Json(def): Json<WorkflowDef>,
) -> ApiResult<StatusCode> {
    state.stores.workflow_defs.create(&def).await?;
    Ok(StatusCode::CREATED)
}

/// PUT /api/metadata/workflow
/// Body: array of definitions, each upserted
async fn update_workflow_def(
    State(state): State<AppState>,
    Json(defs): Json<Vec<WorkflowDef>>,
) -> ApiResult<StatusCode> {
    for def in &defs {
        state.stores.workflow_defs.update(def).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_workflow_defs(State(state): State<AppState>) -> ApiResult<Json<Vec<WorkflowDef>>> {
    Ok(Json(state.stores.workflow_defs.get_all().await?))
}

/// GET /api/metadata/workflow/{name}?version=N
async fn get_workflow_def(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<VersionQuery>,
) -> ApiResult<Json<WorkflowDef>> {
    let def = match query.version {
        Some(version) => state.stores.workflow_defs.get(&name, version).await?,
        None => state.stores.workflow_defs.get_latest(&name).await?,
    };
    let def = found(def, || match query.version {
        Some(version) => format!("Workflow: {}, version: {}", name, version),
        None => format!("Workflow: {}", name),
    })?;
    Ok(Json(def))
}

async fn list_versions(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<u32>>> {
    Ok(Json(state.stores.workflow_defs.versions(&name).await?))
}

/// DELETE /api/metadata/workflow/{name}/{version}
async fn remove_workflow_def(
    State(state): State<AppState>,
    Path((name, version)): Path<(String, u32)>,
) -> ApiResult<StatusCode> {
    state.stores.workflow_defs.remove(&name, version).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/metadata/taskdefs
/// Body: array of task definitions
async fn create_task_defs(
    State(state): State<AppState>,
    Json(defs): Json<Vec<TaskDef>>,
) -> ApiResult<StatusCode> {
    for def in &defs {
        state.stores.task_defs.create(def).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn update_task_def(
    State(state): State<AppState>,
    Json(def): Json<TaskDef>,
) -> ApiResult<StatusCode> {
    state.stores.task_defs.update(&def).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_task_defs(State(state): State<AppState>) -> ApiResult<Json<Vec<TaskDef>>> {
    Ok(Json(state.stores.task_defs.get_all().await?))
}

async fn get_task_def(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<TaskDef>> {
    let def = state.stores.task_defs.get(&name).await?;
    Ok(Json(found(def, || format!("Task definition: {}", name))?))
}

async fn remove_task_def(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.stores.task_defs.remove(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/admin/reconcile
async fn reconcile(State(state): State<AppState>) -> ApiResult<Json<ReconcileReport>> {
    Ok(Json(state.stores.reconciler.run().await?))
}
