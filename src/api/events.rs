/// Event handler REST endpoints

use crate::{
    api::{ApiResult, AppState},
    metadata::EventHandler,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQuery {
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}

pub fn create_event_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/event",
            get(list_event_handlers)
                .post(add_event_handler)
                .put(update_event_handler),
        )
        // DELETE addresses a handler name, GET an event name
        .route(
            "/api/event/{key}",
            get(handlers_for_event).delete(remove_event_handler),
        )
}

async fn add_event_handler(
    State(state): State<AppState>,
    Json(handler): Json<EventHandler>,
) -> ApiResult<StatusCode> {
    state.stores.event_handlers.add(&handler).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_event_handler(
    State(state): State<AppState>,
    Json(handler): Json<EventHandler>,
) -> ApiResult<StatusCode> {
    state.stores.event_handlers.update(&handler).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_event_handlers(State(state): State<AppState>) -> ApiResult<Json<Vec<EventHandler>>> {
    Ok(Json(state.stores.event_handlers.get_all().await?))
}

/// GET /api/event/{event}?activeOnly=false
async fn handlers_for_event(
    State(state): State<AppState>,
    Path(event): Path<String>,
    Query(query): Query<EventQuery>,
) -> ApiResult<Json<Vec<EventHandler>>> {
    Ok(Json(
        state
            .stores
            .event_handlers
            .get_for_event(&event, query.active_only)
            .await?,
    ))
}

/// DELETE /api/event/{name}
async fn remove_event_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.stores.event_handlers.remove(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
