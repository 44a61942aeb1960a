//! API integration tests.
//!
//! These exercise the router end to end against mocked repositories: no
//! Postgres or Redis connection is required. Each repository gets its own
//! `MockDatabase` connection so query results can be scripted independently
//! per entity, mirroring the per-service unit tests in `fedevents-core`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fedevents_api::{middleware::AppState, router as api_router, SseBroadcaster};
use fedevents_common::config::{Config, CoreConfig, DatabaseConfig, FederationConfig, RedisConfig, ServerConfig};
use fedevents_core::{
    AttendanceService, CommentService, EventService, FollowService, LikeService,
    NotificationService, TrendingService, UserService,
};
use fedevents_db::entities::user;
use fedevents_db::repositories::{
    AttendanceRepository, CommentMentionRepository, CommentRepository, EventRepository,
    FollowerRepository, FollowingRepository, LikeRepository, NotificationRepository, UserKeypairRepository,
    UserRepository,
};
use fedevents_federation::UrlConfig;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;

fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            url: "https://example.com".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            max_connections: 10,
            min_connections: 1,
        },
        redis: RedisConfig {
            url: "redis://localhost".to_string(),
            prefix: "fe:".to_string(),
        },
        federation: FederationConfig {
            enabled: true,
            instance_name: "Test Instance".to_string(),
            instance_description: Some("A test instance".to_string()),
            maintainer_name: None,
            maintainer_email: None,
        },
        core: CoreConfig {
            base_url: "https://example.com".to_string(),
            ..CoreConfig::default()
        },
    }
}

/// A mock connection with no queries scripted, for repositories the test
/// under exercise never touches.
fn empty_db() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

fn db_with_rows<M>(rows: Vec<Vec<M>>) -> Arc<DatabaseConnection>
where
    M: sea_orm::FromQueryResult + Sized + Send + Sync + 'static,
{
    Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(rows)
            .into_connection(),
    )
}

fn test_user(id: &str, username: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        username: username.to_string(),
        username_lower: username.to_lowercase(),
        host: None,
        uri: None,
        name: Some("Test User".to_string()),
        description: None,
        avatar_url: None,
        banner_url: None,
        timezone: "UTC".to_string(),
        followers_count: 0,
        following_count: 0,
        events_count: 0,
        is_locked: false,
        inbox: None,
        shared_inbox: None,
        last_fetched_at: None,
        created_at: chrono::Utc::now().into(),
        updated_at: None,
    }
}

/// Assembles the full `AppState`/router with every repository backed by its
/// own mock connection. `user_query_rows` scripts the rows the user
/// repository's queries return, in call order, so each test can drive the
/// auth middleware and the endpoint under test independently.
fn build_app(user_query_rows: Vec<Vec<user::Model>>) -> Router {
    let config = test_config();
    let base_url = url::Url::parse(&config.core.base_url).unwrap();
    let url_config = UrlConfig::new(base_url);

    let user_repo = UserRepository::new(db_with_rows(user_query_rows));
    let keypair_repo = UserKeypairRepository::new(empty_db());
    let event_repo = EventRepository::new(empty_db());
    let attendance_repo = AttendanceRepository::new(empty_db());
    let like_repo = LikeRepository::new(empty_db());
    let comment_repo = CommentRepository::new(empty_db());
    let mention_repo = CommentMentionRepository::new(empty_db());
    let follower_repo = FollowerRepository::new(empty_db());
    let following_repo = FollowingRepository::new(empty_db());
    let notification_repo = NotificationRepository::new(empty_db());

    let sse_broadcaster = SseBroadcaster::new();
    let broadcaster: Arc<dyn fedevents_common::Broadcaster> = Arc::new(sse_broadcaster.clone());

    let follow_service = FollowService::new(
        following_repo,
        follower_repo,
        user_repo.clone(),
        url_config.clone(),
    );

    let mut notification_service = NotificationService::new(notification_repo);
    notification_service.set_broadcaster(Arc::clone(&broadcaster));

    let mut event_service = EventService::new(
        event_repo.clone(),
        user_repo.clone(),
        follow_service.clone(),
        url_config.clone(),
    );
    event_service.set_broadcaster(Arc::clone(&broadcaster));

    let mut attendance_service = AttendanceService::new(
        attendance_repo.clone(),
        event_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
        url_config.clone(),
    );
    attendance_service.set_broadcaster(Arc::clone(&broadcaster));

    let mut like_service = LikeService::new(
        like_repo.clone(),
        event_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
        url_config.clone(),
    );
    like_service.set_broadcaster(Arc::clone(&broadcaster));

    let mut comment_service = CommentService::new(
        comment_repo.clone(),
        mention_repo,
        event_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
        url_config.clone(),
    );
    comment_service.set_broadcaster(Arc::clone(&broadcaster));

    let trending_service = TrendingService::new(
        event_repo,
        like_repo,
        comment_repo,
        attendance_repo,
        follow_service.clone(),
    );
    let user_service = UserService::new(user_repo, keypair_repo, &config);

    let app_state = AppState {
        event_service,
        attendance_service,
        like_service,
        comment_service,
        follow_service,
        notification_service,
        trending_service,
        user_service,
        url_config,
        sse_broadcaster,
    };

    Router::new()
        .nest("/api", api_router())
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            fedevents_api::middleware::auth_middleware,
        ))
        .with_state(app_state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn me_without_authorization_header_is_unauthorized() {
    let app = build_app(vec![]);

    let response = app
        .oneshot(Request::builder().uri("/api/users/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_valid_bearer_token_returns_the_user() {
    let user = test_user("user-1", "alice");
    // auth_middleware looks the caller up by id; /users/me then reads the
    // extracted user straight from request extensions.
    let app = build_app(vec![vec![user.clone()]]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/me")
                .header("Authorization", "Bearer user-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], "user-1");
    assert_eq!(json["data"]["username"], "alice");
}

#[tokio::test]
async fn register_with_duplicate_username_is_conflict() {
    let existing = test_user("user-1", "alice");
    // UserService::create checks find_local_by_username first.
    let app = build_app(vec![vec![existing]]);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"username":"alice","name":null}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn get_by_username_not_found_returns_404_with_error_code() {
    let app = build_app(vec![vec![]]);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/users/nobody")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "USER_NOT_FOUND");
}

#[tokio::test]
async fn trending_is_reachable_anonymously_and_returns_empty_list() {
    let app = build_app(vec![]);

    let response = app
        .oneshot(Request::builder().uri("/api/trending").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn create_event_without_authentication_is_unauthorized() {
    let app = build_app(vec![]);

    let body = serde_json::json!({
        "title": "Meetup",
        "summary": null,
        "location": null,
        "latitude": null,
        "longitude": null,
        "timezone": "UTC",
        "start_time": "2026-08-01T18:00:00Z",
        "end_time": null,
        "recurrence_pattern": null,
        "recurrence_end_date": null,
        "visibility": "public",
        "tags": [],
        "private_recipients": null,
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/events")
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn realtime_stream_endpoint_is_mounted_and_reachable() {
    let app = build_app(vec![]);

    let response = app
        .oneshot(Request::builder().uri("/api/stream").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );
}
