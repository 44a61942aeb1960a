//! Like/unlike endpoints.

use axum::{
    extract::{Path, State},
    routing::post,
    Router,
};
use fedevents_common::AppError;
use fedevents_db::entities::like;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ok, ApiResponse},
};

async fn like_event(
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
) -> Result<ApiResponse<like::Model>, AppError> {
    let created = state.like_service.like(&user.id, &event_id).await?;
    Ok(ApiResponse::ok(created))
}

async fn unlike_event(
    AuthUser(user): AuthUser,
    Path(event_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.like_service.unlike(&user.id, &event_id).await?;
    Ok(ok())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/events/{event_id}/likes", post(like_event).delete(unlike_event))
}
