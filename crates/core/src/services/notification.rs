//! Notification service.

use std::sync::Arc;

use fedevents_common::broadcast::{BroadcastMessage, Broadcaster, MessageType};
use fedevents_common::{AppResult, IdGenerator};
use fedevents_db::{
    entities::notification::{self, NotificationType},
    repositories::NotificationRepository,
};
use sea_orm::Set;
use serde_json::Value;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            broadcaster: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the realtime broadcaster.
    pub fn set_broadcaster(&mut self, broadcaster: Arc<dyn Broadcaster>) {
        self.broadcaster = Some(broadcaster);
    }

    /// Create a notification and publish it to the recipient's realtime
    /// subscription, skipping self-notifications (actor notifying itself).
    pub async fn create(
        &self,
        user_id: &str,
        actor_id: Option<&str>,
        notification_type: NotificationType,
        title: String,
        body: String,
        data: Option<Value>,
    ) -> AppResult<Option<notification::Model>> {
        if actor_id == Some(user_id) {
            return Ok(None);
        }

        let notification_id = self.id_gen.generate();
        let model = notification::ActiveModel {
            id: Set(notification_id.clone()),
            user_id: Set(user_id.to_string()),
            actor_id: Set(actor_id.map(str::to_string)),
            notification_type: Set(notification_type),
            title: Set(title),
            body: Set(body),
            data: Set(data.clone()),
            is_read: Set(false),
            read_at: Set(None),
            created_at: Set(chrono::Utc::now().into()),
        };

        let created = self.notification_repo.create(model).await?;

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::targeted(
                MessageType::NotificationCreated,
                user_id.to_string(),
                serde_json::json!({ "notificationId": notification_id, "data": data }),
            ));
        }

        Ok(Some(created))
    }

    /// Get notifications for a user.
    pub async fn get_notifications(
        &self,
        user_id: &str,
        limit: u64,
        before_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit, before_id, unread_only)
            .await
    }

    /// Mark a notification as read, scoped to its owner.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        if let Some(notification) = self.notification_repo.find_by_id(notification_id).await?
            && notification.user_id == user_id
        {
            self.notification_repo.mark_as_read(notification_id).await?;
            if let Some(ref broadcaster) = self.broadcaster {
                broadcaster.publish(BroadcastMessage::targeted(
                    MessageType::NotificationRead,
                    user_id.to_string(),
                    serde_json::json!({ "notificationId": notification_id }),
                ));
            }
        }
        Ok(())
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Delete a notification, scoped to its owner.
    pub async fn delete(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        if let Some(notification) = self.notification_repo.find_by_id(notification_id).await?
            && notification.user_id == user_id
        {
            self.notification_repo.delete(notification_id).await?;
        }
        Ok(())
    }

    /// Delete all notifications for a user.
    pub async fn delete_all(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.delete_all_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_type_enum_covers_spec_events() {
        let _ = NotificationType::Mention;
        let _ = NotificationType::Follow;
        let _ = NotificationType::Like;
        let _ = NotificationType::Comment;
        let _ = NotificationType::Attendance;
        let _ = NotificationType::EventShare;
        let _ = NotificationType::Reminder;
    }
}
