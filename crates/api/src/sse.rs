//! Server-Sent Events: the realtime fan-out described by the broadcaster
//! contract in `fedevents_common::broadcast`, exposed over a single
//! `GET /api/stream` stream per connected client.
//!
//! A stream carries every all-subscriber [`BroadcastMessage`] (the closed
//! [`MessageType`] set: event/like/comment/attendance activity) plus, for an
//! authenticated caller, messages targeted at that caller's user id
//! (notifications, their own RSVP/like/comment confirmations). Anonymous
//! callers only see the all-subscriber stream.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use fedevents_common::broadcast::{BroadcastMessage, Broadcaster};
use futures::stream::{self, Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{extractors::MaybeAuthUser, middleware::AppState};

/// Bound on the number of messages a lagging subscriber can fall behind by
/// before the broadcast channel starts dropping its oldest unread messages.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// In-process realtime publisher. Cross-instance fan-out (for deployments
/// running more than one API process behind a shared Redis) is layered on
/// top of this via `fedevents_queue::pubsub::PubSubSseBridge`, which holds
/// one of these and calls `publish` for every message it relays.
#[derive(Clone)]
pub struct SseBroadcaster {
    all: broadcast::Sender<BroadcastMessage>,
    user_channels: Arc<RwLock<HashMap<String, broadcast::Sender<BroadcastMessage>>>>,
}

impl SseBroadcaster {
    /// Create a new broadcaster with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (all, _) = broadcast::channel(SUBSCRIBER_QUEUE_CAPACITY);
        Self {
            all,
            user_channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Subscribe to every all-subscriber message.
    fn subscribe_all(&self) -> broadcast::Receiver<BroadcastMessage> {
        self.all.subscribe()
    }

    /// Subscribe to messages targeted at `user_id`, creating that user's
    /// channel if this is its first subscriber.
    fn subscribe_user(&self, user_id: &str) -> broadcast::Receiver<BroadcastMessage> {
        let mut channels = self.user_channels.write().expect("user_channels lock poisoned");
        channels
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_QUEUE_CAPACITY).0)
            .subscribe()
    }

    /// Drop channels with no live subscribers. Safe to call periodically;
    /// a channel with zero receivers is recreated lazily on next subscribe.
    pub fn cleanup(&self) {
        let mut channels = self.user_channels.write().expect("user_channels lock poisoned");
        channels.retain(|_, sender| sender.receiver_count() > 0);
    }
}

impl Default for SseBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for SseBroadcaster {
    fn publish(&self, message: BroadcastMessage) {
        match &message.target_user_id {
            Some(user_id) => {
                let channels = self.user_channels.read().expect("user_channels lock poisoned");
                if let Some(sender) = channels.get(user_id) {
                    let _ = sender.send(message);
                }
            }
            None => {
                let _ = self.all.send(message);
            }
        }
    }
}

fn to_sse_event(message: BroadcastMessage) -> Result<Event, Infallible> {
    Ok(Event::default()
        .json_data(&message)
        .unwrap_or_else(|_| Event::default().data("error")))
}

/// The combined realtime stream for one client connection: every
/// all-subscriber message, merged with messages targeted at the caller's
/// user id when authenticated.
async fn events(
    MaybeAuthUser(user): MaybeAuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let all = BroadcastStream::new(state.sse_broadcaster.subscribe_all()).filter_map(|r| async { r.ok() });

    let merged: std::pin::Pin<Box<dyn Stream<Item = BroadcastMessage> + Send>> = match user {
        Some(user) => {
            let mine = BroadcastStream::new(state.sse_broadcaster.subscribe_user(&user.id))
                .filter_map(|r| async { r.ok() });
            Box::pin(stream::select(all, mine))
        }
        None => Box::pin(all),
    };

    Sse::new(merged.map(to_sse_event)).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)).text("ping"))
}

/// Mount the realtime stream endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/stream", get(events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedevents_common::broadcast::MessageType;

    #[test]
    fn new_broadcaster_has_no_subscribers() {
        let broadcaster = SseBroadcaster::new();
        assert_eq!(broadcaster.all.receiver_count(), 0);
    }

    #[tokio::test]
    async fn all_subscriber_message_reaches_subscriber() {
        let broadcaster = SseBroadcaster::new();
        let mut rx = broadcaster.subscribe_all();

        broadcaster.publish(BroadcastMessage::all(
            MessageType::EventCreated,
            serde_json::json!({ "eventId": "e1" }),
        ));

        let received = rx.recv().await.expect("channel closed");
        assert_eq!(received.target_user_id, None);
    }

    #[tokio::test]
    async fn targeted_message_only_reaches_targeted_subscriber() {
        let broadcaster = SseBroadcaster::new();
        let mut mine = broadcaster.subscribe_user("user-1");
        let mut all = broadcaster.subscribe_all();

        broadcaster.publish(BroadcastMessage::targeted(
            MessageType::NotificationCreated,
            "user-1",
            serde_json::json!({ "notificationId": "n1" }),
        ));

        let received = mine.recv().await.expect("channel closed");
        assert_eq!(received.target_user_id.as_deref(), Some("user-1"));
        assert!(all.try_recv().is_err());
    }

    #[tokio::test]
    async fn targeted_message_to_other_user_is_not_received() {
        let broadcaster = SseBroadcaster::new();
        let mut mine = broadcaster.subscribe_user("user-1");

        broadcaster.publish(BroadcastMessage::targeted(
            MessageType::NotificationCreated,
            "user-2",
            serde_json::json!({ "notificationId": "n1" }),
        ));

        assert!(mine.try_recv().is_err());
    }
}
