//! `ActivityPub` delivery service.
//!
//! Provides an abstraction for queueing `ActivityPub` activity delivery.
//! The actual implementation is provided by the queue crate.

use async_trait::async_trait;
use fedevents_common::AppResult;
use serde_json::Value;
use std::sync::Arc;

/// Trait for `ActivityPub` delivery.
///
/// This allows the core services to queue `ActivityPub` activities
/// without directly depending on the queue implementation.
#[async_trait]
pub trait ActivityDelivery: Send + Sync {
    /// Queue a Create activity for an event.
    async fn queue_create_event(
        &self,
        user_id: &str,
        event_id: &str,
        activity: Value,
        inboxes: Vec<String>,
    ) -> AppResult<()>;

    /// Queue an Update activity for an event.
    async fn queue_update_event(
        &self,
        user_id: &str,
        event_id: &str,
        activity: Value,
        inboxes: Vec<String>,
    ) -> AppResult<()>;

    /// Queue a Delete activity for an event.
    async fn queue_delete_event(
        &self,
        user_id: &str,
        event_id: &str,
        activity: Value,
        inboxes: Vec<String>,
    ) -> AppResult<()>;

    /// Queue a Follow activity.
    async fn queue_follow(
        &self,
        user_id: &str,
        target_inbox: &str,
        activity: Value,
    ) -> AppResult<()>;

    /// Queue an Accept activity for a follow request.
    async fn queue_accept_follow(
        &self,
        user_id: &str,
        target_inbox: &str,
        activity: Value,
    ) -> AppResult<()>;

    /// Queue a Reject activity for a follow request.
    async fn queue_reject_follow(
        &self,
        user_id: &str,
        target_inbox: &str,
        activity: Value,
    ) -> AppResult<()>;

    /// Queue an Undo activity.
    async fn queue_undo(
        &self,
        user_id: &str,
        inboxes: Vec<String>,
        activity: Value,
    ) -> AppResult<()>;

    /// Queue a Like activity.
    async fn queue_like(&self, user_id: &str, target_inbox: &str, activity: Value)
    -> AppResult<()>;

    /// Queue an Announce activity (share).
    async fn queue_announce(
        &self,
        user_id: &str,
        inboxes: Vec<String>,
        activity: Value,
    ) -> AppResult<()>;

    /// Queue an Accept/Reject/TentativeAccept activity for an RSVP.
    async fn queue_rsvp_response(
        &self,
        user_id: &str,
        target_inbox: &str,
        activity: Value,
    ) -> AppResult<()>;
}

/// A no-op implementation of `ActivityDelivery` for testing or when federation is disabled.
#[derive(Clone, Default)]
pub struct NoOpDelivery;

#[async_trait]
impl ActivityDelivery for NoOpDelivery {
    async fn queue_create_event(
        &self,
        _user_id: &str,
        _event_id: &str,
        _activity: Value,
        _inboxes: Vec<String>,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_update_event(
        &self,
        _user_id: &str,
        _event_id: &str,
        _activity: Value,
        _inboxes: Vec<String>,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_delete_event(
        &self,
        _user_id: &str,
        _event_id: &str,
        _activity: Value,
        _inboxes: Vec<String>,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_follow(
        &self,
        _user_id: &str,
        _target_inbox: &str,
        _activity: Value,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_accept_follow(
        &self,
        _user_id: &str,
        _target_inbox: &str,
        _activity: Value,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_reject_follow(
        &self,
        _user_id: &str,
        _target_inbox: &str,
        _activity: Value,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_undo(
        &self,
        _user_id: &str,
        _inboxes: Vec<String>,
        _activity: Value,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_like(
        &self,
        _user_id: &str,
        _target_inbox: &str,
        _activity: Value,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_announce(
        &self,
        _user_id: &str,
        _inboxes: Vec<String>,
        _activity: Value,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn queue_rsvp_response(
        &self,
        _user_id: &str,
        _target_inbox: &str,
        _activity: Value,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `ActivityDelivery` trait object.
pub type DeliveryService = Arc<dyn ActivityDelivery>;
