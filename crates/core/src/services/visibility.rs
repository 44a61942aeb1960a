//! Visibility engine — `canView`/`listableWhere` per spec §4.7.

use fedevents_db::entities::event::{self, Visibility};
use sea_orm::{sea_query::{Condition, Expr}, ColumnTrait};

use crate::services::follow::FollowService;

/// The viewer evaluating an event's visibility: either anonymous, or an
/// authenticated local/remote user identified by id.
#[derive(Debug, Clone, Copy)]
pub enum Viewer<'a> {
    Anonymous,
    User(&'a str),
}

/// Whether `viewer` may view `event`, per spec §4.7.
///
/// `follows` must already reflect an accepted follow of the event's author
/// by the viewer (callers resolve this once, ahead of calling `can_view`,
/// since it requires a database round trip the visibility engine itself
/// should not own).
#[must_use]
pub fn can_view(event: &event::Model, viewer: Viewer<'_>, viewer_follows_author: bool) -> bool {
    match event.visibility {
        Visibility::Public | Visibility::Unlisted => true,
        Visibility::Followers => match viewer {
            Viewer::User(id) if id == event.user_id => true,
            Viewer::User(_) => viewer_follows_author,
            Viewer::Anonymous => false,
        },
        Visibility::Private => match viewer {
            Viewer::User(id) if id == event.user_id => true,
            Viewer::User(id) => event
                .private_recipients
                .as_ref()
                .and_then(|r| serde_json::from_value::<Vec<String>>(r.clone()).ok())
                .is_some_and(|recipients| recipients.iter().any(|r| r == id)),
            Viewer::Anonymous => false,
        },
    }
}

/// Build the composable `sea-orm` predicate for `listableWhere(viewer)`.
///
/// For an authenticated viewer, `followed_actor_urls` must already contain
/// the set of actor URLs the viewer follows with `accepted = true` (the
/// caller resolves this once via [`FollowService::accepted_following_actor_urls`]).
///
/// Per spec §4.7 the authenticated-viewer predicate is the union of:
/// `{PUBLIC, UNLISTED}` ∪ `{FOLLOWERS restricted to followed authors}` ∪
/// `{PRIVATE restricted to events addressed to viewer}` ∪ `{owned by viewer}`.
#[must_use]
pub fn listable_where(viewer: Viewer<'_>, followed_actor_urls: &[String]) -> Condition {
    match viewer {
        Viewer::Anonymous => Condition::all().add(event::Column::Visibility.eq(Visibility::Public)),
        Viewer::User(user_id) => {
            let mut condition = Condition::any()
                .add(event::Column::Visibility.eq(Visibility::Public))
                .add(event::Column::Visibility.eq(Visibility::Unlisted))
                .add(event::Column::UserId.eq(user_id));

            if !followed_actor_urls.is_empty() {
                condition = condition.add(
                    Condition::all()
                        .add(event::Column::Visibility.eq(Visibility::Followers))
                        .add(event::Column::AttributedTo.is_in(followed_actor_urls.to_vec())),
                );
            }

            condition = condition.add(
                Condition::all()
                    .add(event::Column::Visibility.eq(Visibility::Private))
                    .add(Expr::cust_with_values(
                        "private_recipients @> ?::jsonb",
                        [serde_json::json!([user_id]).to_string()],
                    )),
            );

            condition
        }
    }
}

/// Resolve whether `viewer` follows `author_id` with an accepted follow,
/// by actor URL. Thin wrapper kept here (rather than inline at call sites)
/// so the visibility engine's dependency on follow state stays explicit.
pub async fn viewer_follows_author(
    follow_service: &FollowService,
    viewer_id: &str,
    author_actor_url: &str,
) -> fedevents_common::AppResult<bool> {
    follow_service.is_following(viewer_id, author_actor_url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn base_event(visibility: Visibility, user_id: &str) -> event::Model {
        event::Model {
            id: "e1".to_string(),
            user_id: user_id.to_string(),
            external_id: Some("https://this.host/events/e1".to_string()),
            attributed_to: "https://this.host/users/alice".to_string(),
            title: "Party".to_string(),
            summary: None,
            location: None,
            latitude: None,
            longitude: None,
            timezone: "UTC".to_string(),
            start_time: Utc::now().into(),
            end_time: None,
            recurrence_pattern: None,
            recurrence_end_date: None,
            visibility,
            tags: serde_json::json!([]),
            private_recipients: None,
            shared_event_id: None,
            is_local: true,
            likes_count: 0,
            attendance_count: 0,
            comments_count: 0,
            shares_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn public_always_visible() {
        let event = base_event(Visibility::Public, "author");
        assert!(can_view(&event, Viewer::Anonymous, false));
        assert!(can_view(&event, Viewer::User("stranger"), false));
    }

    #[test]
    fn followers_requires_follow_or_author() {
        let event = base_event(Visibility::Followers, "author");
        assert!(!can_view(&event, Viewer::Anonymous, false));
        assert!(can_view(&event, Viewer::User("author"), false));
        assert!(!can_view(&event, Viewer::User("stranger"), false));
        assert!(can_view(&event, Viewer::User("stranger"), true));
    }

    #[test]
    fn private_requires_explicit_recipient_or_author() {
        let mut event = base_event(Visibility::Private, "author");
        event.private_recipients = Some(serde_json::json!(["friend"]));
        assert!(!can_view(&event, Viewer::Anonymous, false));
        assert!(can_view(&event, Viewer::User("author"), false));
        assert!(can_view(&event, Viewer::User("friend"), false));
        assert!(!can_view(&event, Viewer::User("stranger"), false));
    }
}
