//! `ActivityPub` user (Person) endpoint handler.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fedevents_db::repositories::{UserKeypairRepository, UserRepository};
use tracing::{error, info};

use crate::actor::local_actor_document;
use crate::urls::UrlConfig;

/// State required for the user `ActivityPub` handler.
#[derive(Clone)]
pub struct UserApState {
    pub user_repo: UserRepository,
    pub keypair_repo: UserKeypairRepository,
    pub url_config: UrlConfig,
}

impl UserApState {
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        keypair_repo: UserKeypairRepository,
        url_config: UrlConfig,
    ) -> Self {
        Self {
            user_repo,
            keypair_repo,
            url_config,
        }
    }
}

/// `GET /users/{username}` — serves the local user's Person document.
pub async fn user_handler(
    State(state): State<UserApState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    info!(username = %username, "ActivityPub actor lookup");

    let user = match state.user_repo.find_local_by_username(&username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, "User not found").into_response();
        }
        Err(e) => {
            error!(error = %e, "failed to fetch user");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let public_key_pem = match state.keypair_repo.find_by_user_id(&user.id).await {
        Ok(Some(keypair)) => Some(keypair.public_key),
        Ok(None) => {
            error!(user_id = %user.id, "keypair missing for local user");
            None
        }
        Err(e) => {
            error!(error = %e, "failed to fetch keypair");
            None
        }
    };

    let document = local_actor_document(&user, &state.url_config, public_key_pem.as_deref());

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(document),
    )
        .into_response()
}
