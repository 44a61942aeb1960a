//! Comment endpoints.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use fedevents_common::AppError;
use fedevents_core::CreateCommentInput;
use fedevents_db::entities::comment;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ok, ApiResponse},
};

async fn create_comment(
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
    Json(input): Json<CreateCommentInput>,
) -> Result<ApiResponse<comment::Model>, AppError> {
    let created = state.comment_service.create(&user.id, &event_id, input).await?;
    Ok(ApiResponse::ok(created))
}

async fn list_comments(
    Path(event_id): Path<String>,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<comment::Model>>, AppError> {
    let comments = state.comment_service.list_by_event(&event_id).await?;
    Ok(ApiResponse::ok(comments))
}

async fn delete_comment(
    AuthUser(user): AuthUser,
    Path(comment_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.comment_service.delete(&user.id, &comment_id).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/{event_id}/comments", post(create_comment).get(list_comments))
        .route("/comments/{comment_id}", delete(delete_comment))
}
