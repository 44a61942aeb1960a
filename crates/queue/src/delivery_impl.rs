//! Redis-backed `ActivityPub` delivery implementation.
//!
//! Queues one [`DeliverJob`] per target inbox onto the apalis-redis storage;
//! the `deliver_worker` in [`crate::workers`] drains the queue, signs, and
//! performs the actual HTTP POST with retry on failure.

use async_trait::async_trait;
use fedevents_common::AppResult;
use fedevents_core::ActivityDelivery;
use serde_json::Value;

use crate::jobs::DeliverJob;

/// Redis-backed `ActivityPub` delivery service.
#[derive(Clone)]
pub struct RedisDeliveryService {
    storage: apalis_redis::RedisStorage<DeliverJob>,
}

impl RedisDeliveryService {
    /// Create a new Redis delivery service over an apalis-redis job storage.
    #[must_use]
    pub const fn new(storage: apalis_redis::RedisStorage<DeliverJob>) -> Self {
        Self { storage }
    }

    /// Queue one delivery job per inbox. Ordering within a single
    /// `(sender, inbox)` pair is preserved by enqueue order.
    async fn queue_to_inboxes(
        &self,
        user_id: &str,
        activity: Value,
        inboxes: Vec<String>,
    ) -> AppResult<()> {
        use apalis::prelude::*;

        for inbox in inboxes {
            let job = DeliverJob::new(user_id.to_string(), inbox.clone(), activity.clone());

            self.storage
                .clone()
                .push(job)
                .await
                .map_err(|e| fedevents_common::AppError::Queue(format!("failed to queue delivery job: {e}")))?;

            tracing::debug!(inbox = %inbox, "queued delivery job");
        }

        Ok(())
    }

    async fn queue_to_one(&self, user_id: &str, inbox: &str, activity: Value) -> AppResult<()> {
        self.queue_to_inboxes(user_id, activity, vec![inbox.to_string()])
            .await
    }
}

#[async_trait]
impl ActivityDelivery for RedisDeliveryService {
    async fn queue_create_event(
        &self,
        user_id: &str,
        event_id: &str,
        activity: Value,
        inboxes: Vec<String>,
    ) -> AppResult<()> {
        tracing::info!(user_id, event_id, inbox_count = inboxes.len(), "queueing Create activity");
        self.queue_to_inboxes(user_id, activity, inboxes).await
    }

    async fn queue_update_event(
        &self,
        user_id: &str,
        event_id: &str,
        activity: Value,
        inboxes: Vec<String>,
    ) -> AppResult<()> {
        tracing::info!(user_id, event_id, inbox_count = inboxes.len(), "queueing Update activity");
        self.queue_to_inboxes(user_id, activity, inboxes).await
    }

    async fn queue_delete_event(
        &self,
        user_id: &str,
        event_id: &str,
        activity: Value,
        inboxes: Vec<String>,
    ) -> AppResult<()> {
        tracing::info!(user_id, event_id, inbox_count = inboxes.len(), "queueing Delete activity");
        self.queue_to_inboxes(user_id, activity, inboxes).await
    }

    async fn queue_follow(&self, user_id: &str, target_inbox: &str, activity: Value) -> AppResult<()> {
        tracing::info!(user_id, target_inbox, "queueing Follow activity");
        self.queue_to_one(user_id, target_inbox, activity).await
    }

    async fn queue_accept_follow(&self, user_id: &str, target_inbox: &str, activity: Value) -> AppResult<()> {
        tracing::info!(user_id, target_inbox, "queueing Accept activity");
        self.queue_to_one(user_id, target_inbox, activity).await
    }

    async fn queue_reject_follow(&self, user_id: &str, target_inbox: &str, activity: Value) -> AppResult<()> {
        tracing::info!(user_id, target_inbox, "queueing Reject activity");
        self.queue_to_one(user_id, target_inbox, activity).await
    }

    async fn queue_undo(&self, user_id: &str, inboxes: Vec<String>, activity: Value) -> AppResult<()> {
        tracing::info!(user_id, inbox_count = inboxes.len(), "queueing Undo activity");
        self.queue_to_inboxes(user_id, activity, inboxes).await
    }

    async fn queue_like(&self, user_id: &str, target_inbox: &str, activity: Value) -> AppResult<()> {
        tracing::info!(user_id, target_inbox, "queueing Like activity");
        self.queue_to_one(user_id, target_inbox, activity).await
    }

    async fn queue_announce(&self, user_id: &str, inboxes: Vec<String>, activity: Value) -> AppResult<()> {
        tracing::info!(user_id, inbox_count = inboxes.len(), "queueing Announce activity");
        self.queue_to_inboxes(user_id, activity, inboxes).await
    }

    async fn queue_rsvp_response(&self, user_id: &str, target_inbox: &str, activity: Value) -> AppResult<()> {
        tracing::info!(user_id, target_inbox, "queueing RSVP response activity");
        self.queue_to_one(user_id, target_inbox, activity).await
    }
}
