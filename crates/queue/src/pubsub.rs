//! Redis Pub/Sub bridge for cross-instance realtime fan-out.
//!
//! A single process's [`fedevents_common::broadcast::Broadcaster`] only
//! reaches subscribers connected to that process. Running more than one API
//! process behind a load balancer requires republishing locally-originated
//! messages to every other process; this module does that over a single
//! Redis channel.

#![allow(missing_docs)]

use std::sync::Arc;

use fedevents_common::broadcast::{BroadcastMessage, Broadcaster, MessageType};
use fred::clients::{Client, SubscriberClient};
use fred::error::{Error as RedisError, ErrorKind as RedisErrorKind};
use fred::interfaces::{ClientLike, EventInterface, PubsubInterface};
use fred::types::config::Config as RedisConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Pub/Sub channel names.
pub mod channels {
    /// The single channel realtime broadcast messages are relayed over.
    pub const BROADCAST: &str = "fedevents:broadcast";
}

/// Wire format for a [`BroadcastMessage`] relayed over Redis. `BroadcastMessage`
/// itself is serialize-only (it is built fresh from JSON payloads at the
/// publish site), so the wire copy carries a plain string message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubEvent {
    pub message_type: String,
    pub target_user_id: Option<String>,
    pub payload: serde_json::Value,
}

impl PubSubEvent {
    fn from_message(message: &BroadcastMessage) -> Self {
        Self {
            message_type: message_type_name(message.message_type),
            target_user_id: message.target_user_id.clone(),
            payload: message.payload.clone(),
        }
    }
}

fn message_type_name(message_type: MessageType) -> String {
    serde_json::to_value(message_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn message_type_from_name(name: &str) -> Option<MessageType> {
    match name {
        "EVENT_CREATED" => Some(MessageType::EventCreated),
        "EVENT_UPDATED" => Some(MessageType::EventUpdated),
        "EVENT_DELETED" => Some(MessageType::EventDeleted),
        "EVENT_SHARED" => Some(MessageType::EventShared),
        "LIKE_ADDED" => Some(MessageType::LikeAdded),
        "LIKE_REMOVED" => Some(MessageType::LikeRemoved),
        "ATTENDANCE_UPDATED" => Some(MessageType::AttendanceUpdated),
        "ATTENDANCE_REMOVED" => Some(MessageType::AttendanceRemoved),
        "COMMENT_CREATED" => Some(MessageType::CommentCreated),
        "COMMENT_DELETED" => Some(MessageType::CommentDeleted),
        "NOTIFICATION_CREATED" => Some(MessageType::NotificationCreated),
        "NOTIFICATION_READ" => Some(MessageType::NotificationRead),
        _ => None,
    }
}

/// Redis Pub/Sub manager for cross-instance realtime fan-out.
#[derive(Clone)]
pub struct RedisPubSub {
    publisher: Client,
    subscriber: SubscriberClient,
    /// Local broadcast channel fed by messages received from Redis.
    local_tx: broadcast::Sender<PubSubEvent>,
}

impl RedisPubSub {
    /// Create a new Redis Pub/Sub manager.
    pub async fn new(redis_url: &str) -> Result<Self, RedisError> {
        let config = RedisConfig::from_url(redis_url)?;

        let publisher = Client::new(config.clone(), None, None, None);
        publisher.init().await?;

        let subscriber = SubscriberClient::new(config, None, None, None);
        subscriber.init().await?;

        let (local_tx, _) = broadcast::channel(1000);

        info!("Redis Pub/Sub initialized");

        Ok(Self {
            publisher,
            subscriber,
            local_tx,
        })
    }

    /// Subscribe to the broadcast channel and start relaying inbound
    /// messages into the local broadcast channel.
    pub async fn start(&self) -> Result<(), RedisError> {
        self.subscriber.subscribe(channels::BROADCAST).await?;
        info!(channel = channels::BROADCAST, "subscribed to Pub/Sub channel");

        let local_tx = self.local_tx.clone();
        let mut message_stream = self.subscriber.message_rx();

        tokio::spawn(async move {
            while let Ok(message) = message_stream.recv().await {
                if let Some(payload) = message.value.as_string() {
                    match serde_json::from_str::<PubSubEvent>(&payload) {
                        Ok(event) => {
                            debug!(?event, "received Pub/Sub event");
                            if local_tx.send(event).is_err() {
                                warn!("no local subscribers for Pub/Sub event");
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to parse Pub/Sub message"),
                    }
                }
            }
            info!("Pub/Sub message stream ended");
        });

        Ok(())
    }

    /// Publish a realtime message to every other instance.
    pub async fn publish_message(&self, message: &BroadcastMessage) -> Result<(), RedisError> {
        let event = PubSubEvent::from_message(message);
        let payload = serde_json::to_string(&event)
            .map_err(|e| RedisError::new(RedisErrorKind::InvalidArgument, format!("serialization error: {e}")))?;
        let _: () = self.publisher.publish(channels::BROADCAST, payload).await?;
        debug!(?event, "published Pub/Sub event");
        Ok(())
    }

    /// Get a receiver for locally relayed events (i.e. messages originally
    /// published by another instance).
    #[must_use]
    pub fn subscribe_local(&self) -> broadcast::Receiver<PubSubEvent> {
        self.local_tx.subscribe()
    }

    /// Shutdown the Pub/Sub manager.
    pub async fn shutdown(&self) -> Result<(), RedisError> {
        self.subscriber.quit().await?;
        self.publisher.quit().await?;
        info!("Redis Pub/Sub shutdown");
        Ok(())
    }
}

/// Bridges the local in-process broadcaster to Redis: forwards every locally
/// published message out to other instances via [`RedisPubSub`].
///
/// This does not itself fan out to local subscribers — callers are expected
/// to also hold the process's regular in-memory `Broadcaster` and publish to
/// both, or wrap both behind a small multiplexer.
pub struct PubSubBroadcaster {
    pubsub: Arc<RedisPubSub>,
}

impl PubSubBroadcaster {
    #[must_use]
    pub const fn new(pubsub: Arc<RedisPubSub>) -> Self {
        Self { pubsub }
    }
}

impl Broadcaster for PubSubBroadcaster {
    fn publish(&self, message: BroadcastMessage) {
        let pubsub = Arc::clone(&self.pubsub);
        tokio::spawn(async move {
            if let Err(e) = pubsub.publish_message(&message).await {
                warn!(error = %e, "failed to relay broadcast message to Redis");
            }
        });
    }
}

/// Bridges Redis-relayed events (originating on another instance) back into
/// a local, process-wide fan-out sink such as the SSE broadcaster.
pub struct PubSubSseBridge {
    pubsub: Arc<RedisPubSub>,
}

impl PubSubSseBridge {
    #[must_use]
    pub const fn new(pubsub: Arc<RedisPubSub>) -> Self {
        Self { pubsub }
    }

    /// Start the bridge, forwarding deserialized broadcast messages relayed
    /// from other instances to `on_event`.
    pub async fn start<F>(&self, on_event: F)
    where
        F: Fn(BroadcastMessage) + Send + Sync + 'static,
    {
        let mut rx = self.pubsub.subscribe_local();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        let Some(message_type) = message_type_from_name(&event.message_type) else {
                            warn!(message_type = %event.message_type, "unknown message type from Pub/Sub");
                            continue;
                        };
                        let message = BroadcastMessage {
                            message_type,
                            target_user_id: event.target_user_id,
                            payload: event.payload,
                        };
                        on_event(message);
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "SSE bridge lagged behind Pub/Sub");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("SSE bridge channel closed");
                        break;
                    }
                }
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn message_type_round_trips_through_wire_name() {
        for mt in [
            MessageType::EventCreated,
            MessageType::LikeRemoved,
            MessageType::NotificationRead,
        ] {
            let name = message_type_name(mt);
            assert_eq!(message_type_from_name(&name), Some(mt));
        }
    }

    #[test]
    fn unknown_wire_name_is_rejected() {
        assert_eq!(message_type_from_name("NOT_A_TYPE"), None);
    }
}
