//! Local user registration and profile endpoints.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use fedevents_common::AppError;
use fedevents_core::{CreateUserInput, UpdateUserInput};
use fedevents_db::entities::user;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

async fn register(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<ApiResponse<user::Model>, AppError> {
    let created = state.user_service.create(input).await?;
    Ok(ApiResponse::ok(created))
}

async fn get_by_username(
    Path(username): Path<String>,
    State(state): State<AppState>,
) -> Result<ApiResponse<user::Model>, AppError> {
    let user = state.user_service.get_local_by_username(&username).await?;
    Ok(ApiResponse::ok(user))
}

async fn update_me(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateUserInput>,
) -> Result<ApiResponse<user::Model>, AppError> {
    let updated = state.user_service.update(&user.id, input).await?;
    Ok(ApiResponse::ok(updated))
}

async fn me(AuthUser(user): AuthUser) -> ApiResponse<user::Model> {
    ApiResponse::ok(user)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/me", get(me).patch(update_me))
        .route("/users/{username}", get(get_by_username))
}
