//! API endpoints.

#![allow(missing_docs)]

mod attendance;
mod comments;
mod events;
mod follows;
mod likes;
mod notifications;
mod trending;
mod users;

use axum::Router;

use crate::middleware::AppState;
use crate::sse;

/// Create the API router. Each endpoint module owns its own full paths
/// (`/events/{id}/comments`, `/users/{username}/follow`, ...) rather than
/// being nested under a prefix, since resources live under more than one
/// parent (an event's comments, a user's follows) and a single nesting
/// prefix per module can't express that.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(events::router())
        .merge(attendance::router())
        .merge(likes::router())
        .merge(comments::router())
        .merge(follows::router())
        .merge(notifications::router())
        .merge(trending::router())
        .merge(users::router())
        .merge(sse::router())
}
