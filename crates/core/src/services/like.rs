//! Like service — like/unlike an event, spec §4.6.

use std::sync::Arc;

use fedevents_common::broadcast::{BroadcastMessage, Broadcaster, MessageType};
use fedevents_common::{AppError, AppResult, IdGenerator};
use fedevents_db::{
    entities::{like, notification::NotificationType},
    repositories::{EventRepository, LikeRepository, UserRepository},
};
use fedevents_federation::{ActivityBuilder, UrlConfig};
use sea_orm::Set;

use crate::services::delivery::DeliveryService;
use crate::services::notification::NotificationService;

/// Like service.
#[derive(Clone)]
pub struct LikeService {
    like_repo: LikeRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    delivery: Option<DeliveryService>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    activity_builder: ActivityBuilder,
    url_config: UrlConfig,
    id_gen: IdGenerator,
}

impl LikeService {
    #[must_use]
    pub fn new(
        like_repo: LikeRepository,
        event_repo: EventRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
        url_config: UrlConfig,
    ) -> Self {
        let activity_builder = ActivityBuilder::new(url_config.base_url.clone());
        Self {
            like_repo,
            event_repo,
            user_repo,
            notifications,
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

    /// Canonical wire id for `event`: stored `external_id` if remote,
    /// otherwise derived from `baseUrl` since local events don't persist one.
    fn canonical_event_id(&self, event: &fedevents_db::entities::event::Model) -> String {
        event
            .external_id
            .clone()
            .unwrap_or_else(|| self.url_config.event_url(&event.id).to_string())
    }

    /// Like an event on behalf of `user_id`.
    pub async fn like(&self, user_id: &str, event_id: &str) -> AppResult<like::Model> {
        if self.like_repo.find_by_pair(event_id, user_id).await?.is_some() {
            return Err(AppError::Conflict("event already liked".to_string()));
        }
        let event = self.event_repo.get_by_id(event_id).await?;
        let liker = self.user_repo.get_by_id(user_id).await?;

        let model = like::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            event_id: Set(event_id.to_string()),
            external_id: Set(None),
            created_at: Set(chrono::Utc::now().into()),
        };
        let created = self.like_repo.create(model).await?;
        self.event_repo.increment_likes_count(event_id).await?;

        if let Some(ref delivery) = self.delivery
            && let Some(target_inbox) = self.owner_inbox(&event).await?
        {
            let liker_url = self.url_config.user_url(&liker.username).to_string();
            let activity = self.activity_builder.like(&liker_url, &self.canonical_event_id(&event));
            if let Err(e) = delivery.queue_like(user_id, &target_inbox, activity).await {
                tracing::warn!(error = %e, "failed to queue Like activity");
            }
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::targeted(
                MessageType::LikeAdded,
                event.user_id.clone(),
                serde_json::json!({ "eventId": event_id, "userId": user_id }),
            ));
        }

        self.notifications
            .create(
                &event.user_id,
                Some(user_id),
                NotificationType::Like,
                "New like".to_string(),
                format!("{} liked your event", liker.username),
                Some(serde_json::json!({ "eventId": event_id })),
            )
            .await?;

        Ok(created)
    }

    /// Unlike an event.
    pub async fn unlike(&self, user_id: &str, event_id: &str) -> AppResult<()> {
        let Some(_existing) = self.like_repo.find_by_pair(event_id, user_id).await? else {
            return Err(AppError::NotFound("like not found".to_string()));
        };
        let event = self.event_repo.get_by_id(event_id).await?;
        let unliker = self.user_repo.get_by_id(user_id).await?;

        self.like_repo.delete_by_pair(event_id, user_id).await?;
        self.event_repo.decrement_likes_count(event_id).await?;

        if let Some(ref delivery) = self.delivery
            && let Some(target_inbox) = self.owner_inbox(&event).await?
        {
            let unliker_url = self.url_config.user_url(&unliker.username).to_string();
            let like_activity = self.activity_builder.like(&unliker_url, &self.canonical_event_id(&event));
            let undo = self.activity_builder.undo(&unliker_url, like_activity);
            if let Err(e) = delivery.queue_undo(user_id, vec![target_inbox], undo).await {
                tracing::warn!(error = %e, "failed to queue Undo Like activity");
            }
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::targeted(
                MessageType::LikeRemoved,
                event.user_id.clone(),
                serde_json::json!({ "eventId": event_id, "userId": user_id }),
            ));
        }

        Ok(())
    }

    async fn owner_inbox(&self, event: &fedevents_db::entities::event::Model) -> AppResult<Option<String>> {
        let owner = self.user_repo.get_by_id(&event.user_id).await?;
        Ok(owner.shared_inbox.or(owner.inbox))
    }
}

#[cfg(test)]
mod tests {
    // Unit coverage for this service lives alongside the attendance/comment
    // services' integration-style tests, which share the same mock-db setup
    // helpers; see `attendance.rs` for the pattern.
}
