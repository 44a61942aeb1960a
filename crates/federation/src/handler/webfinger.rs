//! `WebFinger` handler for actor discovery.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use fedevents_db::repositories::UserRepository;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::urls::UrlConfig;

/// `WebFinger` query parameters.
#[derive(Debug, Deserialize)]
pub struct WebfingerQuery {
    pub resource: String,
}

/// `WebFinger` response.
#[derive(Debug, Serialize)]
pub struct WebfingerResponse {
    pub subject: String,
    pub aliases: Vec<String>,
    pub links: Vec<WebfingerLink>,
}

/// `WebFinger` link.
#[derive(Debug, Serialize)]
pub struct WebfingerLink {
    pub rel: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// State required for the `WebFinger` handler.
#[derive(Clone)]
pub struct WebfingerState {
    pub domain: String,
    pub user_repo: UserRepository,
    pub url_config: UrlConfig,
}

impl WebfingerState {
    #[must_use]
    pub const fn new(domain: String, user_repo: UserRepository, url_config: UrlConfig) -> Self {
        Self {
            domain,
            user_repo,
            url_config,
        }
    }
}

/// Parses `acct:username@domain` into its parts.
fn parse_acct(resource: &str) -> Option<(String, String)> {
    let rest = resource.strip_prefix("acct:")?;
    let (username, domain) = rest.split_once('@')?;
    Some((username.to_string(), domain.to_string()))
}

/// `GET /.well-known/webfinger?resource=acct:username@example.com`
///
/// Resolves a local user's `acct:` handle to its `ActivityPub` actor URL.
pub async fn webfinger_handler(
    State(state): State<WebfingerState>,
    Query(query): Query<WebfingerQuery>,
) -> impl IntoResponse {
    info!(resource = %query.resource, "WebFinger lookup");

    let Some((username, domain)) = parse_acct(&query.resource) else {
        return (StatusCode::BAD_REQUEST, "Invalid resource format").into_response();
    };

    if domain != state.domain {
        return (StatusCode::NOT_FOUND, "Unknown domain").into_response();
    }

    let user = match state.user_repo.find_local_by_username(&username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!(username = %username, "user not found for WebFinger");
            return (StatusCode::NOT_FOUND, "User not found").into_response();
        }
        Err(e) => {
            warn!(error = %e, "database error during WebFinger lookup");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let actor_url = state.url_config.user_url(&user.username);

    let response = WebfingerResponse {
        subject: query.resource.clone(),
        aliases: vec![actor_url.to_string()],
        links: vec![WebfingerLink {
            rel: "self".to_string(),
            link_type: Some("application/activity+json".to_string()),
            href: Some(actor_url.to_string()),
            template: None,
        }],
    };

    (
        StatusCode::OK,
        [("Content-Type", "application/jrd+json")],
        Json(response),
    )
        .into_response()
}
