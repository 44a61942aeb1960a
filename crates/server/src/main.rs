//! fedevents-rs server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use apalis::prelude::*;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use fedevents_api::{middleware::AppState, rate_limit::RateLimiterState, router as api_router, SseBroadcaster};
use fedevents_common::Config;
use fedevents_core::{
    AttendanceService, CommentService, EventService, FollowService, LikeService,
    NotificationService, ReminderService, TrendingService, UserService,
};
use fedevents_db::repositories::{
    AttendanceRepository, CommentMentionRepository, CommentRepository, EventRepository,
    FollowerRepository, FollowingRepository, LikeRepository, NotificationRepository,
    ProcessedActivityRepository, ReminderRepository, UserKeypairRepository, UserRepository,
};
use fedevents_federation::{
    followers_handler, following_handler, inbox_handler, outbox_handler, user_handler,
    webfinger_handler, ActorResolver, ApClient, CollectionState, InboxState, RemoteActorCache,
    SignatureVerificationLayer, SignatureVerificationState, UrlConfig, UserApState, WebfingerState,
};
use fedevents_queue::workers::{deliver_worker, DeliverContext};
use fedevents_queue::{reminder_ticker, DeliverJob, RedisDeliveryService, ReminderTickerConfig};
use fred::prelude::*;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fedevents_server=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting fedevents-rs server...");

    let config = Config::load()?;

    let db = Arc::new(fedevents_db::init(&config).await?);
    info!("Connected to database");

    info!("Running database migrations...");
    fedevents_db::migrate(&db).await?;
    info!("Migrations completed");

    info!("Connecting to Redis...");
    let redis_client =
        redis::Client::open(config.redis.url.as_str()).expect("Failed to create Redis client");
    let redis_conn = redis::aio::ConnectionManager::new(redis_client)
        .await
        .expect("Failed to connect to Redis for the job queue");
    let redis_storage = apalis_redis::RedisStorage::<DeliverJob>::new(redis_conn);

    let fred_config = fred::types::config::Config::from_url(&config.redis.url)
        .expect("Failed to parse Redis URL");
    let fred_client = fred::clients::Client::new(fred_config, None, None, None);
    fred_client.connect();
    fred_client.wait_for_connect().await.expect("Failed to connect to Redis");
    let fred_client = Arc::new(fred_client);
    info!("Connected to Redis");

    let base_url = Url::parse(&config.core.base_url)?;
    let url_config = UrlConfig::new(base_url.clone());

    // Repositories
    let user_repo = UserRepository::new(Arc::clone(&db));
    let keypair_repo = UserKeypairRepository::new(Arc::clone(&db));
    let event_repo = EventRepository::new(Arc::clone(&db));
    let attendance_repo = AttendanceRepository::new(Arc::clone(&db));
    let like_repo = LikeRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let mention_repo = CommentMentionRepository::new(Arc::clone(&db));
    let follower_repo = FollowerRepository::new(Arc::clone(&db));
    let following_repo = FollowingRepository::new(Arc::clone(&db));
    let processed_repo = ProcessedActivityRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let reminder_repo = ReminderRepository::new(Arc::clone(&db));

    // Realtime fan-out
    let sse_broadcaster = SseBroadcaster::new();
    let broadcaster: Arc<dyn fedevents_common::Broadcaster> = Arc::new(sse_broadcaster.clone());

    // ActivityPub delivery queue
    let delivery_service: fedevents_core::DeliveryService = Arc::new(RedisDeliveryService::new(redis_storage.clone()));

    // Core services
    let mut follow_service = FollowService::new(
        following_repo.clone(),
        follower_repo.clone(),
        user_repo.clone(),
        url_config.clone(),
    );
    follow_service.set_delivery(delivery_service.clone());

    let mut notification_service = NotificationService::new(notification_repo.clone());
    notification_service.set_broadcaster(Arc::clone(&broadcaster));

    let mut event_service = EventService::new(
        event_repo.clone(),
        user_repo.clone(),
        follow_service.clone(),
        url_config.clone(),
    );
    event_service.set_delivery(delivery_service.clone());
    event_service.set_broadcaster(Arc::clone(&broadcaster));

    let mut attendance_service = AttendanceService::new(
        attendance_repo.clone(),
        event_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
        url_config.clone(),
    );
    attendance_service.set_delivery(delivery_service.clone());
    attendance_service.set_broadcaster(Arc::clone(&broadcaster));

    let mut like_service = LikeService::new(
        like_repo.clone(),
        event_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
        url_config.clone(),
    );
    like_service.set_delivery(delivery_service.clone());
    like_service.set_broadcaster(Arc::clone(&broadcaster));

    let mut comment_service = CommentService::new(
        comment_repo.clone(),
        mention_repo.clone(),
        event_repo.clone(),
        user_repo.clone(),
        notification_service.clone(),
        url_config.clone(),
    );
    comment_service.set_delivery(delivery_service.clone());
    comment_service.set_broadcaster(Arc::clone(&broadcaster));

    let trending_service = TrendingService::new(
        event_repo.clone(),
        like_repo.clone(),
        comment_repo.clone(),
        attendance_repo.clone(),
        follow_service.clone(),
    );

    let user_service = UserService::new(user_repo.clone(), keypair_repo.clone(), &config);

    let mut reminder_service = ReminderService::new(reminder_repo, event_repo.clone(), notification_service.clone());
    reminder_service.set_broadcaster(Arc::clone(&broadcaster));

    // Federation plumbing
    let actor_cache = RemoteActorCache::new(Arc::clone(&fred_client));
    let ap_client = ApClient::new(config.core.base_url.as_str());
    let actor_resolver = ActorResolver::new(
        user_repo.clone(),
        actor_cache.clone(),
        ap_client.clone(),
        url_config.clone(),
    );

    let app_state = AppState {
        event_service,
        attendance_service,
        like_service,
        comment_service,
        follow_service,
        notification_service,
        trending_service,
        user_service,
        url_config: url_config.clone(),
        sse_broadcaster: sse_broadcaster.clone(),
    };

    let domain = base_url.host_str().unwrap_or("localhost").to_string();
    let webfinger_state = WebfingerState::new(domain, user_repo.clone(), url_config.clone());
    let user_ap_state = UserApState::new(user_repo.clone(), keypair_repo.clone(), url_config.clone());
    let collection_state = CollectionState::new(
        user_repo.clone(),
        event_repo.clone(),
        follower_repo.clone(),
        following_repo.clone(),
        url_config.clone(),
    );

    let inbox_state = InboxState {
        user_repo,
        keypair_repo: keypair_repo.clone(),
        event_repo,
        attendance_repo,
        like_repo,
        comment_repo,
        mention_repo,
        follower_repo,
        following_repo,
        processed_repo: processed_repo.clone(),
        notification_repo,
        actor_resolver,
        actor_cache,
        ap_client: ap_client.clone(),
        url_config: url_config.clone(),
        broadcaster: Arc::clone(&broadcaster),
        auto_accept_followers: config.core.auto_accept_followers,
        processed_activity_ttl_days: config.core.processed_activity_ttl_days,
    };

    let security = fedevents_federation::ActivitySecurityChecker::new(Arc::clone(&fred_client));
    let signature_state = SignatureVerificationState::new(ap_client, config.federation.enabled).with_security(security);
    let signature_layer = SignatureVerificationLayer::new(signature_state);

    let rate_limiter = RateLimiterState::new();

    let app = Router::new()
        .route(
            "/.well-known/webfinger",
            get(webfinger_handler).with_state(webfinger_state),
        )
        .route("/users/{username}", get(user_handler).with_state(user_ap_state))
        .route(
            "/users/{username}/outbox",
            get(outbox_handler).with_state(collection_state.clone()),
        )
        .route(
            "/users/{username}/followers",
            get(followers_handler).with_state(collection_state.clone()),
        )
        .route(
            "/users/{username}/following",
            get(following_handler).with_state(collection_state),
        )
        .route(
            "/inbox",
            post(inbox_handler)
                .with_state(inbox_state.clone())
                .layer(signature_layer.clone()),
        )
        .route(
            "/users/{username}/inbox",
            post(inbox_handler).with_state(inbox_state).layer(signature_layer),
        )
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            fedevents_api::rate_limit::rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            fedevents_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state);

    // Background reminder/GC ticker
    reminder_ticker(
        ReminderTickerConfig::from_tick_interval_ms(config.core.reminders_tick_interval_ms),
        reminder_service,
        processed_repo,
    );

    // ActivityPub delivery worker
    if config.federation.enabled {
        info!("Starting ActivityPub delivery worker...");
        let user_agent = format!("fedevents-rs/{}", env!("CARGO_PKG_VERSION"));
        let deliver_ctx = DeliverContext::new(keypair_repo, user_agent);

        tokio::spawn(async move {
            let monitor = Monitor::new().register(
                WorkerBuilder::new("deliver")
                    .data(deliver_ctx)
                    .backend(redis_storage)
                    .build_fn(deliver_worker),
            );

            if let Err(e) = monitor.run().await {
                tracing::error!(error = %e, "Delivery worker failed");
            }
        });
        info!("ActivityPub delivery worker started");
    }

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    ));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
