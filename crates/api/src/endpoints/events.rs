//! Event authoring, lookup and listing endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use fedevents_common::AppError;
use fedevents_core::{EventInput, Viewer};
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::AppState,
    response::{ok, ApiResponse},
};

#[derive(Debug, Deserialize)]
pub struct ListByUserQuery {
    user_id: String,
    limit: Option<u64>,
    before_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

async fn create_event(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<EventInput>,
) -> Result<ApiResponse<fedevents_db::entities::event::Model>, AppError> {
    let created = state.event_service.create(&user.id, input).await?;
    Ok(ApiResponse::ok(created))
}

async fn get_event(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
) -> Result<ApiResponse<fedevents_db::entities::event::Model>, AppError> {
    let event = state.event_service.get(&event_id).await?;
    Ok(ApiResponse::ok(event))
}

async fn update_event(
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<EventInput>,
) -> Result<ApiResponse<fedevents_db::entities::event::Model>, AppError> {
    let updated = state.event_service.update(&user.id, &event_id, input).await?;
    Ok(ApiResponse::ok(updated))
}

async fn delete_event(
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.event_service.delete(&user.id, &event_id).await?;
    Ok(ok())
}

async fn share_event(
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
) -> Result<ApiResponse<fedevents_db::entities::event::Model>, AppError> {
    let shared = state.event_service.share(&user.id, &event_id).await?;
    Ok(ApiResponse::ok(shared))
}

/// `GET /events?user_id=...&limit=...&before_id=...` — events authored by a
/// user, visible to the caller.
async fn list_by_user(
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<ListByUserQuery>,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<fedevents_db::entities::event::Model>>, AppError> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let viewer = viewer_id.map_or(Viewer::Anonymous, Viewer::User);
    let limit = query.limit.unwrap_or(20).min(100);
    let events = state
        .event_service
        .list_by_user(viewer, &query.user_id, limit, query.before_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(events))
}

/// `GET /events/range?start=...&end=...` — events starting within a window,
/// visible to the caller.
async fn list_in_range(
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<RangeQuery>,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<fedevents_db::entities::event::Model>>, AppError> {
    let viewer_id = viewer.as_ref().map(|u| u.id.as_str());
    let viewer = viewer_id.map_or(Viewer::Anonymous, Viewer::User);
    let events = state.event_service.list_in_range(viewer, query.start, query.end).await?;
    Ok(ApiResponse::ok(events))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_by_user))
        .route("/events/range", get(list_in_range))
        .route("/events/{event_id}", get(get_event).put(update_event).delete(delete_event))
        .route("/events/{event_id}/share", post(share_event))
}
