//! Event authoring service — spec §4.6.
//!
//! Each operation performs: input validation → persistence → outbound
//! activity construction (`fedevents_federation::activity`) → delivery
//! (`ActivityDelivery`) → realtime broadcast (`Broadcaster`). Callers are
//! responsible for the surrounding transaction boundary.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fedevents_common::broadcast::{BroadcastMessage, Broadcaster, MessageType};
use fedevents_common::{AppError, AppResult, IdGenerator};
use fedevents_db::{
    entities::event::{self, RecurrencePattern, Visibility},
    repositories::{EventRepository, UserRepository},
};
use fedevents_federation::{event_object, ActivityBuilder, Addressing, UrlConfig};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::delivery::DeliveryService;
use crate::services::follow::FollowService;
use crate::services::visibility::{can_view, listable_where, viewer_follows_author, Viewer};

/// Input for creating or updating an event. Shared between the two
/// operations since both validate the same fields.
#[derive(Debug, Deserialize, Validate)]
pub struct EventInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    pub summary: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub timezone: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,

    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_end_date: Option<DateTime<Utc>>,

    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub private_recipients: Option<Vec<String>>,
}

impl EventInput {
    fn validate_semantics(&self) -> AppResult<()> {
        if self.latitude.is_some() != self.longitude.is_some() {
            return Err(AppError::Validation(
                "latitude and longitude must both be set or both omitted".to_string(),
            ));
        }
        if let Some(lat) = self.latitude
            && !(-90.0..=90.0).contains(&lat)
        {
            return Err(AppError::Validation(
                "latitude must be between -90 and 90".to_string(),
            ));
        }
        if let Some(lon) = self.longitude
            && !(-180.0..=180.0).contains(&lon)
        {
            return Err(AppError::Validation(
                "longitude must be between -180 and 180".to_string(),
            ));
        }
        self.normalized_tags()?;
        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(AppError::Validation(format!(
                "unrecognized timezone `{}`",
                self.timezone
            )));
        }
        if let Some(end) = self.end_time
            && end < self.start_time
        {
            return Err(AppError::Validation(
                "end_time must not precede start_time".to_string(),
            ));
        }
        if let Some(recurrence_end) = self.recurrence_end_date
            && recurrence_end < self.start_time
        {
            return Err(AppError::Validation(
                "recurrence_end_date must not precede start_time".to_string(),
            ));
        }
        if self.visibility == Visibility::Private
            && self
                .private_recipients
                .as_ref()
                .is_none_or(std::vec::Vec::is_empty)
        {
            return Err(AppError::Validation(
                "private events require at least one recipient".to_string(),
            ));
        }
        Ok(())
    }

    /// Deduplicated, lowercased tag list, stripped of any leading `#`.
    /// Rejects any tag whose normalized form exceeds 50 characters.
    fn normalized_tags(&self) -> AppResult<Vec<String>> {
        let mut seen = std::collections::HashSet::new();
        let mut normalized = Vec::new();
        for tag in &self.tags {
            let cleaned = tag.trim_start_matches('#').trim().to_lowercase();
            if cleaned.len() > 50 {
                return Err(AppError::Validation(format!(
                    "tag `{cleaned}` exceeds the 50-character limit"
                )));
            }
            if !cleaned.is_empty() && seen.insert(cleaned.clone()) {
                normalized.push(cleaned);
            }
        }
        Ok(normalized)
    }
}

/// Event authoring service.
#[derive(Clone)]
pub struct EventService {
    event_repo: EventRepository,
    user_repo: UserRepository,
    follow_service: FollowService,
    delivery: Option<DeliveryService>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    activity_builder: ActivityBuilder,
    url_config: UrlConfig,
    id_gen: IdGenerator,
}

impl EventService {
    #[must_use]
    pub fn new(
        event_repo: EventRepository,
        user_repo: UserRepository,
        follow_service: FollowService,
        url_config: UrlConfig,
    ) -> Self {
        let activity_builder = ActivityBuilder::new(url_config.base_url.clone());
        Self {
            event_repo,
            user_repo,
            follow_service,
            delivery: None,
            broadcaster: None,
            activity_builder,
            url_config,
            id_gen: IdGenerator::new(),
        }
    }

    pub fn set_delivery(&mut self, delivery: DeliveryService) {
        self.delivery = Some(delivery);
    }

    pub fn set_broadcaster(&mut self, broadcaster: Arc<dyn Broadcaster>) {
        self.broadcaster = Some(broadcaster);
    }

    /// Canonical wire id for `event`: the stored `external_id` if it
    /// originated remotely, otherwise derived from `baseUrl` since local
    /// events don't persist one.
    fn canonical_id(&self, event: &event::Model) -> String {
        event
            .external_id
            .clone()
            .unwrap_or_else(|| self.url_config.event_url(&event.id).to_string())
    }

    /// Create a local event, authored by `user_id`.
    pub async fn create(&self, user_id: &str, input: EventInput) -> AppResult<event::Model> {
        input.validate()?;
        input.validate_semantics()?;

        let author = self.user_repo.get_by_id(user_id).await?;
        let event_id = self.id_gen.generate();
        let canonical_id = self.url_config.event_url(&event_id).to_string();
        let attributed_to = self.url_config.user_url(&author.username).to_string();

        let model = event::ActiveModel {
            id: Set(event_id.clone()),
            user_id: Set(user_id.to_string()),
            external_id: Set(None),
            attributed_to: Set(attributed_to.clone()),
            title: Set(input.title.clone()),
            summary: Set(input.summary.clone()),
            location: Set(input.location.clone()),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            timezone: Set(input.timezone.clone()),
            start_time: Set(input.start_time.into()),
            end_time: Set(input.end_time.map(Into::into)),
            recurrence_pattern: Set(input.recurrence_pattern.clone()),
            recurrence_end_date: Set(input.recurrence_end_date.map(Into::into)),
            visibility: Set(input.visibility.clone()),
            tags: Set(serde_json::json!(input.normalized_tags()?)),
            private_recipients: Set(input
                .private_recipients
                .clone()
                .map(|r| serde_json::json!(r))),
            shared_event_id: Set(None),
            is_local: Set(true),
            likes_count: Set(0),
            attendance_count: Set(0),
            comments_count: Set(0),
            shares_count: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let created = self.event_repo.create(model).await?;
        self.user_repo.increment_events_count(user_id).await?;

        if let Some(ref delivery) = self.delivery {
            let followers_url = self.url_config.followers_url(&author.username).to_string();
            let addressing = Addressing::for_visibility(
                &created.visibility,
                &followers_url,
                &input.private_recipients.clone().unwrap_or_default(),
            );
            let object = event_object(&created, &attributed_to, &canonical_id);
            let activity = self
                .activity_builder
                .create(&attributed_to, object, &addressing);
            let inboxes = self.audience_inboxes(&created, &addressing).await?;
            if !inboxes.is_empty()
                && let Err(e) = delivery
                    .queue_create_event(user_id, &created.id, activity, inboxes)
                    .await
            {
                tracing::warn!(error = %e, "failed to queue Create activity for event");
            }
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::all(
                MessageType::EventCreated,
                serde_json::json!({ "eventId": created.id }),
            ));
        }

        Ok(created)
    }

    /// Update an event. Only the owning user may update it; the resulting
    /// Update activity is delivered to the union of the previous and new
    /// audiences, since a visibility narrowing must still notify anyone who
    /// could already see the old version.
    pub async fn update(&self, user_id: &str, event_id: &str, input: EventInput) -> AppResult<event::Model> {
        input.validate()?;
        input.validate_semantics()?;

        let existing = self.event_repo.get_by_id(event_id).await?;
        if existing.user_id != user_id {
            return Err(AppError::Forbidden(
                "only the event's author may update it".to_string(),
            ));
        }

        let author = self.user_repo.get_by_id(user_id).await?;
        let followers_url = self.url_config.followers_url(&author.username).to_string();
        let previous_recipients: Vec<String> = existing
            .private_recipients
            .as_ref()
            .and_then(|r| serde_json::from_value(r.clone()).ok())
            .unwrap_or_default();
        let previous_addressing =
            Addressing::for_visibility(&existing.visibility, &followers_url, &previous_recipients);

        let mut active: event::ActiveModel = existing.clone().into();
        active.title = Set(input.title.clone());
        active.summary = Set(input.summary.clone());
        active.location = Set(input.location.clone());
        active.latitude = Set(input.latitude);
        active.longitude = Set(input.longitude);
        active.timezone = Set(input.timezone.clone());
        active.start_time = Set(input.start_time.into());
        active.end_time = Set(input.end_time.map(Into::into));
        active.recurrence_pattern = Set(input.recurrence_pattern.clone());
        active.recurrence_end_date = Set(input.recurrence_end_date.map(Into::into));
        active.visibility = Set(input.visibility.clone());
        active.tags = Set(serde_json::json!(input.normalized_tags()?));
        active.private_recipients = Set(input.private_recipients.clone().map(|r| serde_json::json!(r)));
        active.updated_at = Set(Some(Utc::now().into()));

        let updated = self.event_repo.update(active).await?;

        if let Some(ref delivery) = self.delivery {
            let new_addressing = Addressing::for_visibility(
                &updated.visibility,
                &followers_url,
                &input.private_recipients.clone().unwrap_or_default(),
            );
            let canonical_id = self.canonical_id(&existing);
            let object = event_object(&updated, &existing.attributed_to, &canonical_id);
            let activity = self
                .activity_builder
                .update(&existing.attributed_to, object, &new_addressing);

            let mut inboxes = self.audience_inboxes(&updated, &previous_addressing).await?;
            inboxes.extend(self.audience_inboxes(&updated, &new_addressing).await?);
            inboxes.sort();
            inboxes.dedup();

            if !inboxes.is_empty()
                && let Err(e) = delivery
                    .queue_update_event(user_id, &updated.id, activity, inboxes)
                    .await
            {
                tracing::warn!(error = %e, "failed to queue Update activity for event");
            }
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::all(
                MessageType::EventUpdated,
                serde_json::json!({ "eventId": updated.id }),
            ));
        }

        Ok(updated)
    }

    /// Delete an event the caller authored.
    pub async fn delete(&self, user_id: &str, event_id: &str) -> AppResult<()> {
        let existing = self.event_repo.get_by_id(event_id).await?;
        if existing.user_id != user_id {
            return Err(AppError::Forbidden(
                "only the event's author may delete it".to_string(),
            ));
        }

        let author = self.user_repo.get_by_id(user_id).await?;
        let followers_url = self.url_config.followers_url(&author.username).to_string();
        let recipients: Vec<String> = existing
            .private_recipients
            .as_ref()
            .and_then(|r| serde_json::from_value(r.clone()).ok())
            .unwrap_or_default();
        let addressing = Addressing::for_visibility(&existing.visibility, &followers_url, &recipients);

        self.event_repo.delete(event_id).await?;
        self.user_repo.decrement_events_count(user_id).await?;

        if let Some(ref delivery) = self.delivery {
            let activity = self.activity_builder.delete(
                &existing.attributed_to,
                &self.canonical_id(&existing),
                "Event",
            );
            let inboxes = self.audience_inboxes(&existing, &addressing).await?;
            if !inboxes.is_empty()
                && let Err(e) = delivery
                    .queue_delete_event(user_id, event_id, activity, inboxes)
                    .await
            {
                tracing::warn!(error = %e, "failed to queue Delete activity for event");
            }
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::all(
                MessageType::EventDeleted,
                serde_json::json!({ "eventId": event_id }),
            ));
        }

        Ok(())
    }

    /// Share (Announce) a PUBLIC event on behalf of `user_id`. Only one
    /// outstanding share per original event per user is allowed.
    pub async fn share(&self, user_id: &str, event_id: &str) -> AppResult<event::Model> {
        let original = self.event_repo.get_by_id(event_id).await?;
        if original.visibility != Visibility::Public {
            return Err(AppError::Forbidden(
                "only public events may be shared".to_string(),
            ));
        }
        if self
            .event_repo
            .find_existing_share(user_id, event_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "event already shared by this user".to_string(),
            ));
        }

        let sharer = self.user_repo.get_by_id(user_id).await?;
        let sharer_actor_url = self.url_config.user_url(&sharer.username).to_string();
        let followers_url = self.url_config.followers_url(&sharer.username).to_string();

        let share_id = self.id_gen.generate();
        let share_model = event::ActiveModel {
            id: Set(share_id.clone()),
            user_id: Set(user_id.to_string()),
            external_id: Set(None),
            attributed_to: Set(sharer_actor_url.clone()),
            title: Set(original.title.clone()),
            summary: Set(original.summary.clone()),
            location: Set(original.location.clone()),
            latitude: Set(original.latitude),
            longitude: Set(original.longitude),
            timezone: Set(original.timezone.clone()),
            start_time: Set(original.start_time),
            end_time: Set(original.end_time),
            recurrence_pattern: Set(None),
            recurrence_end_date: Set(None),
            visibility: Set(Visibility::Public),
            tags: Set(original.tags.clone()),
            private_recipients: Set(None),
            shared_event_id: Set(Some(original.id.clone())),
            is_local: Set(true),
            likes_count: Set(0),
            attendance_count: Set(0),
            comments_count: Set(0),
            shares_count: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        let created = self.event_repo.create(share_model).await?;
        self.event_repo.increment_shares_count(event_id).await?;

        if let Some(ref delivery) = self.delivery {
            let activity = self.activity_builder.announce(
                &sharer_actor_url,
                &self.canonical_id(&original),
                &followers_url,
            );
            let addressing = Addressing::for_visibility(&Visibility::Public, &followers_url, &[]);
            let inboxes = self.audience_inboxes(&created, &addressing).await?;
            if !inboxes.is_empty()
                && let Err(e) = delivery
                    .queue_announce(user_id, inboxes, activity)
                    .await
            {
                tracing::warn!(error = %e, "failed to queue Announce activity for share");
            }
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::targeted(
                MessageType::EventShared,
                original.user_id.clone(),
                serde_json::json!({ "eventId": original.id, "sharedBy": user_id }),
            ));
        }

        Ok(created)
    }

    pub async fn get(&self, event_id: &str) -> AppResult<event::Model> {
        self.event_repo.get_by_id(event_id).await
    }

    /// Events authored by `user_id`, visible to `viewer`, newest-start-first.
    pub async fn list_by_user(
        &self,
        viewer: Viewer<'_>,
        user_id: &str,
        limit: u64,
        before_id: Option<&str>,
    ) -> AppResult<Vec<event::Model>> {
        let candidates = self.event_repo.find_by_user(user_id, limit, before_id).await?;
        self.filter_visible(candidates, viewer).await
    }

    /// Events with a `startTime` inside `[range_start, range_end]` (including
    /// recurring candidates whose first occurrence predates the window),
    /// visible to `viewer`.
    pub async fn list_in_range(
        &self,
        viewer: Viewer<'_>,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> AppResult<Vec<event::Model>> {
        let followed_actor_urls = self.followed_actor_urls(viewer).await?;
        let candidates = self
            .event_repo
            .find_in_range(range_start, range_end, listable_where(viewer, &followed_actor_urls))
            .await?;
        self.filter_visible(candidates, viewer).await
    }

    /// Actor URLs `viewer` accepted-follows, or empty for an anonymous viewer.
    /// Feeds [`listable_where`]'s FOLLOWERS restriction.
    async fn followed_actor_urls(&self, viewer: Viewer<'_>) -> AppResult<Vec<String>> {
        match viewer {
            Viewer::User(viewer_id) => self.follow_service.accepted_following_actor_urls(viewer_id).await,
            Viewer::Anonymous => Ok(Vec::new()),
        }
    }

    /// Narrow a candidate set down to what `viewer` may actually see.
    /// `listable_where`/`find_by_user` already exclude most of what a viewer
    /// can't see; this pass additionally resolves FOLLOWERS-visibility
    /// events, which need a per-author follow check `can_view` can't do on
    /// its own.
    async fn filter_visible(
        &self,
        candidates: Vec<event::Model>,
        viewer: Viewer<'_>,
    ) -> AppResult<Vec<event::Model>> {
        let mut visible = Vec::with_capacity(candidates.len());
        for event in candidates {
            let follows = match viewer {
                Viewer::User(viewer_id)
                    if event.visibility == Visibility::Followers && viewer_id != event.user_id =>
                {
                    viewer_follows_author(&self.follow_service, viewer_id, &event.attributed_to).await?
                }
                _ => false,
            };
            if can_view(&event, viewer, follows) {
                visible.push(event);
            }
        }
        Ok(visible)
    }

    /// Resolve the inbox set an addressing implies: PUBLIC/UNLISTED fan out
    /// to all accepted followers (shared inboxes collapsed by the queue
    /// layer), FOLLOWERS to the same follower set, PRIVATE to each
    /// individually addressed recipient's inbox.
    async fn audience_inboxes(&self, event: &event::Model, addressing: &Addressing) -> AppResult<Vec<String>> {
        if event.visibility == Visibility::Private {
            let mut inboxes = Vec::new();
            for recipient in addressing.to.iter().chain(addressing.cc.iter()) {
                if let Some(user) = self.user_repo.find_by_uri(recipient).await? {
                    if let Some(inbox) = user.shared_inbox.or(user.inbox) {
                        inboxes.push(inbox);
                    }
                }
            }
            inboxes.sort();
            inboxes.dedup();
            return Ok(inboxes);
        }

        let followers = self.follow_service.get_followers(&event.user_id).await?;
        let mut inboxes: Vec<String> = followers
            .into_iter()
            .map(|f| f.shared_inbox_url.unwrap_or(f.inbox_url))
            .collect();
        inboxes.sort();
        inboxes.dedup();
        Ok(inboxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> EventInput {
        EventInput {
            title: "Launch party".to_string(),
            summary: None,
            location: None,
            latitude: None,
            longitude: None,
            timezone: "America/New_York".to_string(),
            start_time: Utc::now(),
            end_time: None,
            recurrence_pattern: None,
            recurrence_end_date: None,
            visibility: Visibility::Public,
            tags: vec!["#Rust".to_string(), "rust".to_string(), " Launch ".to_string()],
            private_recipients: None,
        }
    }

    #[test]
    fn normalized_tags_dedupe_case_and_hash_prefix() {
        let input = valid_input();
        assert_eq!(
            input.normalized_tags().unwrap(),
            vec!["rust".to_string(), "launch".to_string()]
        );
    }

    #[test]
    fn overlong_tag_is_rejected() {
        let mut input = valid_input();
        input.tags = vec!["a".repeat(51)];
        assert!(input.normalized_tags().is_err());
        assert!(input.validate_semantics().is_err());
    }

    #[test]
    fn coordinate_range_is_enforced() {
        let mut input = valid_input();
        input.latitude = Some(90.0);
        input.longitude = Some(180.0);
        assert!(input.validate_semantics().is_ok());

        input.latitude = Some(90.0001);
        assert!(input.validate_semantics().is_err());

        input.latitude = Some(90.0);
        input.longitude = Some(181.0);
        assert!(input.validate_semantics().is_err());
    }

    #[test]
    fn coordinates_must_be_both_or_neither() {
        let mut input = valid_input();
        input.latitude = Some(1.0);
        assert!(input.validate_semantics().is_err());
    }

    #[test]
    fn unrecognized_timezone_is_rejected() {
        let mut input = valid_input();
        input.timezone = "Not/AZone".to_string();
        assert!(input.validate_semantics().is_err());
    }

    #[test]
    fn end_time_before_start_is_rejected() {
        let mut input = valid_input();
        input.end_time = Some(input.start_time - chrono::Duration::hours(1));
        assert!(input.validate_semantics().is_err());
    }

    #[test]
    fn private_visibility_requires_recipients() {
        let mut input = valid_input();
        input.visibility = Visibility::Private;
        input.private_recipients = None;
        assert!(input.validate_semantics().is_err());
    }
}
