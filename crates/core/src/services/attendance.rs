//! Attendance service — set/clear RSVP status, spec §4.6.

use std::sync::Arc;

use fedevents_common::broadcast::{BroadcastMessage, Broadcaster, MessageType};
use fedevents_common::{AppError, AppResult, IdGenerator};
use fedevents_db::{
    entities::{
        attendance::{self, AttendanceStatus},
        notification::NotificationType,
    },
    repositories::{AttendanceRepository, EventRepository, UserRepository},
};
use fedevents_federation::{ActivityBuilder, UrlConfig};

use crate::services::delivery::DeliveryService;
use crate::services::notification::NotificationService;

/// Attendance (RSVP) service.
#[derive(Clone)]
pub struct AttendanceService {
    attendance_repo: AttendanceRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    delivery: Option<DeliveryService>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    activity_builder: ActivityBuilder,
    url_config: UrlConfig,
    id_gen: IdGenerator,
}

impl AttendanceService {
    #[must_use]
    pub fn new(
        attendance_repo: AttendanceRepository,
        event_repo: EventRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
        url_config: UrlConfig,
    ) -> Self {
        let activity_builder = ActivityBuilder::new(url_config.base_url.clone());
        Self {
            attendance_repo,
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

    /// Set (or change) `user_id`'s attendance status for `event_id`.
    pub async fn set_status(
        &self,
        user_id: &str,
        event_id: &str,
        status: AttendanceStatus,
    ) -> AppResult<attendance::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;
        let attendee = self.user_repo.get_by_id(user_id).await?;

        let previous_status = self
            .attendance_repo
            .find_by_pair(event_id, user_id)
            .await?
            .map(|a| a.status);

        let id_gen = self.id_gen.clone();
        let updated = self
            .attendance_repo
            .upsert_status(event_id, user_id, status.clone(), None, move || id_gen.generate())
            .await?;

        let was_attending = previous_status == Some(AttendanceStatus::Attending);
        let now_attending = status == AttendanceStatus::Attending;
        if now_attending && !was_attending {
            self.event_repo.increment_attendance_count(event_id).await?;
        } else if was_attending && !now_attending {
            self.event_repo.decrement_attendance_count(event_id).await?;
        }

        if let Some(ref delivery) = self.delivery
            && !event.is_local
            && let Some(owner_inbox) = self.owner_inbox(&event).await?
        {
            let attendee_url = self.url_config.user_url(&attendee.username).to_string();
            let canonical_id = self.canonical_event_id(&event);
            let activity = match status {
                AttendanceStatus::Attending => self
                    .activity_builder
                    .accept(&attendee_url, serde_json::Value::String(canonical_id)),
                AttendanceStatus::Maybe => self
                    .activity_builder
                    .tentative_accept(&attendee_url, &canonical_id),
                AttendanceStatus::NotAttending => self
                    .activity_builder
                    .reject(&attendee_url, serde_json::Value::String(canonical_id)),
            };
            if let Err(e) = delivery.queue_rsvp_response(user_id, &owner_inbox, activity).await {
                tracing::warn!(error = %e, "failed to queue RSVP response activity");
            }
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::targeted(
                MessageType::AttendanceUpdated,
                event.user_id.clone(),
                serde_json::json!({ "eventId": event_id, "userId": user_id, "status": status }),
            ));
        }

        self.notifications
            .create(
                &event.user_id,
                Some(user_id),
                NotificationType::Attendance,
                "Attendance update".to_string(),
                format!("{} updated their attendance", attendee.username),
                Some(serde_json::json!({ "eventId": event_id })),
            )
            .await?;

        Ok(updated)
    }

    /// Clear `user_id`'s attendance status for `event_id`.
    pub async fn clear_status(&self, user_id: &str, event_id: &str) -> AppResult<()> {
        let Some(existing) = self.attendance_repo.find_by_pair(event_id, user_id).await? else {
            return Err(AppError::NotFound("attendance not found".to_string()));
        };
        let event = self.event_repo.get_by_id(event_id).await?;

        self.attendance_repo.delete_by_pair(event_id, user_id).await?;
        if existing.status == AttendanceStatus::Attending {
            self.event_repo.decrement_attendance_count(event_id).await?;
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::targeted(
                MessageType::AttendanceRemoved,
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
