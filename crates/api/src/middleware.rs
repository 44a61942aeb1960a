//! API middleware: shared application state and authentication.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use fedevents_core::{
    AttendanceService, CommentService, EventService, FollowService, LikeService,
    NotificationService, TrendingService, UserService,
};
use fedevents_federation::UrlConfig;

use crate::sse::SseBroadcaster;

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub event_service: EventService,
    pub attendance_service: AttendanceService,
    pub like_service: LikeService,
    pub comment_service: CommentService,
    pub follow_service: FollowService,
    pub notification_service: NotificationService,
    pub trending_service: TrendingService,
    pub user_service: UserService,
    pub url_config: UrlConfig,
    pub sse_broadcaster: SseBroadcaster,
}

/// Resolves the current viewer from a bearer token and inserts it into the
/// request extensions for [`crate::extractors::AuthUser`]/[`crate::extractors::MaybeAuthUser`]
/// to pick up.
///
/// Authentication itself is out of scope here: the token is treated as an
/// opaque user id, exactly as handed out at account creation. A real
/// deployment would sit a session/token layer in front of this; this
/// middleware only has to turn "some caller claims to be viewer X" into a
/// loaded `user::Model`, or let the request through unauthenticated.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.get(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
