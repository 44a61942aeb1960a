//! `ActivityPub` Collection handlers (Outbox, Followers, Following).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fedevents_db::repositories::{EventRepository, FollowerRepository, FollowingRepository, UserRepository};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use url::Url;

use crate::activity::{event_object, ActivityBuilder};
use crate::urls::UrlConfig;

/// State required for collection handlers.
#[derive(Clone)]
pub struct CollectionState {
    pub user_repo: UserRepository,
    pub event_repo: EventRepository,
    pub follower_repo: FollowerRepository,
    pub following_repo: FollowingRepository,
    pub url_config: UrlConfig,
}

impl CollectionState {
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        event_repo: EventRepository,
        follower_repo: FollowerRepository,
        following_repo: FollowingRepository,
        url_config: UrlConfig,
    ) -> Self {
        Self {
            user_repo,
            event_repo,
            follower_repo,
            following_repo,
            url_config,
        }
    }
}

/// Query parameters for paginated collections.
#[derive(Debug, Deserialize)]
pub struct CollectionQuery {
    /// Whether to return a page (`?page=true`) rather than the collection summary.
    pub page: Option<bool>,
    /// Cursor for the next page.
    pub max_id: Option<String>,
}

/// `ActivityPub` `OrderedCollection`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCollection {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Url,
    pub total_items: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<Url>,
}

/// `ActivityPub` `OrderedCollectionPage`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedCollectionPage {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub id: Url,
    pub part_of: Url,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Url>,
    pub ordered_items: Vec<serde_json::Value>,
}

fn activitystreams_context() -> serde_json::Value {
    serde_json::json!("https://www.w3.org/ns/activitystreams")
}

/// `GET /users/{username}/outbox` — the user's public event activity outbox.
pub async fn outbox_handler(
    State(state): State<CollectionState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    info!(username = %username, "ActivityPub outbox lookup");

    let user = match state.user_repo.find_local_by_username(&username).await {
        Ok(Some(u)) => u,
        Ok(None) => return (StatusCode::NOT_FOUND, "User not found").into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch user");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let outbox_url = state.url_config.outbox_url(&username);
    let actor_url = state.url_config.user_url(&username).to_string();

    if query.page == Some(true) {
        let limit = 20u64;
        let events = match state
            .event_repo
            .find_by_user(&user.id, limit, query.max_id.as_deref())
            .await
        {
            Ok(e) => e,
            Err(e) => {
                error!(error = %e, "failed to fetch events");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };

        let builder = ActivityBuilder::new(state.url_config.base_url.clone());
        let items: Vec<serde_json::Value> = events
            .iter()
            .filter(|e| e.visibility == fedevents_db::entities::event::Visibility::Public)
            .map(|e| {
                let canonical_id = e
                    .external_id
                    .clone()
                    .unwrap_or_else(|| state.url_config.event_url(&e.id).to_string());
                let object = event_object(e, &actor_url, &canonical_id);
                builder.create(
                    &actor_url,
                    object,
                    &crate::activity::Addressing {
                        to: vec![crate::activity::PUBLIC.to_string()],
                        cc: vec![state.url_config.followers_url(&username).to_string()],
                        bcc: vec![],
                    },
                )
            })
            .collect();

        let mut page_url = outbox_url.clone();
        page_url.set_query(Some("page=true"));

        let next = if events.len() == limit as usize {
            events.last().map(|e| {
                let mut next_url = outbox_url.clone();
                next_url.set_query(Some(&format!("page=true&max_id={}", e.id)));
                next_url
            })
        } else {
            None
        };

        let page = OrderedCollectionPage {
            context: activitystreams_context(),
            kind: "OrderedCollectionPage".to_string(),
            id: page_url,
            part_of: outbox_url,
            prev: None,
            next,
            ordered_items: items,
        };

        return (
            StatusCode::OK,
            [("Content-Type", "application/activity+json; charset=utf-8")],
            Json(page),
        )
            .into_response();
    }

    let total_items = match state.event_repo.count_by_user(&user.id).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to count events");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let first = {
        let mut u = outbox_url.clone();
        u.set_query(Some("page=true"));
        u
    };

    let collection = OrderedCollection {
        context: activitystreams_context(),
        kind: "OrderedCollection".to_string(),
        id: outbox_url,
        total_items,
        first: Some(first),
        last: None,
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(collection),
    )
        .into_response()
}

/// `GET /users/{username}/followers`
pub async fn followers_handler(
    State(state): State<CollectionState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    info!(username = %username, "ActivityPub followers lookup");

    let user = match state.user_repo.find_local_by_username(&username).await {
        Ok(Some(u)) => u,
        Ok(None) => return (StatusCode::NOT_FOUND, "User not found").into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch user");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let followers_url = state.url_config.followers_url(&username);

    let followers = match state.follower_repo.find_accepted_by_user(&user.id).await {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "failed to fetch followers");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    if query.page == Some(true) {
        let items: Vec<serde_json::Value> = followers
            .iter()
            .map(|f| serde_json::json!(f.actor_url))
            .collect();

        let mut page_url = followers_url.clone();
        page_url.set_query(Some("page=true"));

        let page = OrderedCollectionPage {
            context: activitystreams_context(),
            kind: "OrderedCollectionPage".to_string(),
            id: page_url,
            part_of: followers_url,
            prev: None,
            next: None,
            ordered_items: items,
        };

        return (
            StatusCode::OK,
            [("Content-Type", "application/activity+json; charset=utf-8")],
            Json(page),
        )
            .into_response();
    }

    let first = {
        let mut u = followers_url.clone();
        u.set_query(Some("page=true"));
        u
    };

    let collection = OrderedCollection {
        context: activitystreams_context(),
        kind: "OrderedCollection".to_string(),
        id: followers_url,
        total_items: followers.len() as u64,
        first: Some(first),
        last: None,
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(collection),
    )
        .into_response()
}

/// `GET /users/{username}/following`
pub async fn following_handler(
    State(state): State<CollectionState>,
    Path(username): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    info!(username = %username, "ActivityPub following lookup");

    let user = match state.user_repo.find_local_by_username(&username).await {
        Ok(Some(u)) => u,
        Ok(None) => return (StatusCode::NOT_FOUND, "User not found").into_response(),
        Err(e) => {
            error!(error = %e, "failed to fetch user");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let following_url = state.url_config.following_url(&username);

    if query.page == Some(true) {
        let limit = 40u64;
        let following = match state
            .following_repo
            .find_following(&user.id, limit, query.max_id.as_deref())
            .await
        {
            Ok(f) => f,
            Err(e) => {
                error!(error = %e, "failed to fetch following");
                return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
            }
        };

        let items: Vec<serde_json::Value> = following
            .iter()
            .map(|f| serde_json::json!(f.actor_url))
            .collect();

        let mut page_url = following_url.clone();
        page_url.set_query(Some("page=true"));

        let next = if following.len() == limit as usize {
            following.last().map(|f| {
                let mut next_url = following_url.clone();
                next_url.set_query(Some(&format!("page=true&max_id={}", f.id)));
                next_url
            })
        } else {
            None
        };

        let page = OrderedCollectionPage {
            context: activitystreams_context(),
            kind: "OrderedCollectionPage".to_string(),
            id: page_url,
            part_of: following_url,
            prev: None,
            next,
            ordered_items: items,
        };

        return (
            StatusCode::OK,
            [("Content-Type", "application/activity+json; charset=utf-8")],
            Json(page),
        )
            .into_response();
    }

    let total_items = match state.following_repo.count_following(&user.id).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to count following");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let first = {
        let mut u = following_url.clone();
        u.set_query(Some("page=true"));
        u
    };

    let collection = OrderedCollection {
        context: activitystreams_context(),
        kind: "OrderedCollection".to_string(),
        id: following_url,
        total_items,
        first: Some(first),
        last: None,
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/activity+json; charset=utf-8")],
        Json(collection),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activitystreams_context_is_the_as_namespace() {
        let ctx = activitystreams_context();
        assert_eq!(ctx, serde_json::json!("https://www.w3.org/ns/activitystreams"));
    }
}
