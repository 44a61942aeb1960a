//! Notification listing and read-state endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use fedevents_common::AppError;
use fedevents_db::entities::notification;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ok, ApiResponse},
};

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    limit: Option<u64>,
    before_id: Option<String>,
    #[serde(default)]
    unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    count: u64,
}

async fn list_notifications(
    AuthUser(user): AuthUser,
    Query(query): Query<ListNotificationsQuery>,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<notification::Model>>, AppError> {
    let limit = query.limit.unwrap_or(20).min(100);
    let notifications = state
        .notification_service
        .get_notifications(&user.id, limit, query.before_id.as_deref(), query.unread_only)
        .await?;
    Ok(ApiResponse::ok(notifications))
}

async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<UnreadCount>, AppError> {
    let count = state.notification_service.count_unread(&user.id).await?;
    Ok(ApiResponse::ok(UnreadCount { count }))
}

async fn mark_as_read(
    AuthUser(user): AuthUser,
    Path(notification_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.notification_service.mark_as_read(&user.id, &notification_id).await?;
    Ok(ok())
}

async fn mark_all_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.notification_service.mark_all_as_read(&user.id).await?;
    Ok(ok())
}

async fn delete_notification(
    AuthUser(user): AuthUser,
    Path(notification_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.notification_service.delete(&user.id, &notification_id).await?;
    Ok(ok())
}

async fn delete_all_notifications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.notification_service.delete_all(&user.id).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications).delete(delete_all_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_as_read))
        .route(
            "/notifications/{notification_id}",
            post(mark_as_read).delete(delete_notification),
        )
}
