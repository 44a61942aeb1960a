//! Realtime broadcaster contract.
//!
//! The concrete in-memory fan-out implementation lives in the core crate,
//! which depends on this crate; the federation crate (inbox processor) and
//! the authoring services both publish through this trait without depending
//! on each other.

use serde::Serialize;

/// Closed set of realtime message kinds a subscriber stream can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    EventCreated,
    EventUpdated,
    EventDeleted,
    EventShared,
    LikeAdded,
    LikeRemoved,
    AttendanceUpdated,
    AttendanceRemoved,
    CommentCreated,
    CommentDeleted,
    NotificationCreated,
    NotificationRead,
}

/// A single broadcast message. `target_user_id` narrows delivery to one
/// subscriber; `None` fans out to every connected stream.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub target_user_id: Option<String>,
    pub payload: serde_json::Value,
}

impl BroadcastMessage {
    /// Build a broadcast-to-all message.
    #[must_use]
    pub fn all(message_type: MessageType, payload: serde_json::Value) -> Self {
        Self {
            message_type,
            target_user_id: None,
            payload,
        }
    }

    /// Build a message targeted at a single subscriber.
    #[must_use]
    pub fn targeted(
        message_type: MessageType,
        target_user_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            message_type,
            target_user_id: Some(target_user_id.into()),
            payload,
        }
    }
}

/// Publishes realtime messages to locally connected clients.
///
/// Implementations must preserve publish order for any single subscriber
/// and must never block the caller on a slow subscriber; a bounded
/// per-subscriber queue with overflow drop is the documented backpressure
/// policy.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, message: BroadcastMessage);
}

/// No-op broadcaster for tests and for running without realtime fan-out.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBroadcaster;

impl Broadcaster for NullBroadcaster {
    fn publish(&self, _message: BroadcastMessage) {}
}
