//! Follow/unfollow and follower/following listing endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Router,
};
use fedevents_common::AppError;
use fedevents_db::entities::{follower, following};
use serde::Deserialize;

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ok, ApiResponse},
};

#[derive(Debug, Deserialize)]
pub struct FollowingQuery {
    limit: Option<u64>,
    until_id: Option<String>,
}

async fn follow_user(
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<ApiResponse<following::Model>, AppError> {
    let target = state.user_service.get_local_by_username(&username).await?;
    let created = state.follow_service.follow(&user.id, &target).await?;
    Ok(ApiResponse::ok(created))
}

async fn unfollow_user(
    AuthUser(user): AuthUser,
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let target = state.user_service.get_local_by_username(&username).await?;
    state.follow_service.unfollow(&user.id, &target).await?;
    Ok(ok())
}

async fn list_followers(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<follower::Model>>, AppError> {
    let target = state.user_service.get_local_by_username(&username).await?;
    let followers = state.follow_service.get_followers(&target.id).await?;
    Ok(ApiResponse::ok(followers))
}

async fn list_following(
    Path(username): Path<String>,
    Query(query): Query<FollowingQuery>,
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<following::Model>>, AppError> {
    let target = state.user_service.get_local_by_username(&username).await?;
    let limit = query.limit.unwrap_or(20).min(100);
    let following = state
        .follow_service
        .get_following(&target.id, limit, query.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(following))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/{username}/follow", post(follow_user).delete(unfollow_user))
        .route("/users/{username}/followers", get(list_followers))
        .route("/users/{username}/following", get(list_following))
}
