//! Redis Pub/Sub integration tests.
//!
//! These exercise a real Redis instance and are skipped by default.
//! Run with: `cargo test --test redis_integration -- --ignored`
//! against a Redis instance at `REDIS_URL` (defaults to `redis://127.0.0.1:6379`).

use std::time::Duration;

use fedevents_common::broadcast::{BroadcastMessage, MessageType};
use fedevents_queue::{pubsub_channels, RedisPubSub};

fn get_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_pubsub_connects_and_shuts_down() {
    let pubsub = RedisPubSub::new(&get_redis_url()).await.expect("connect failed");
    pubsub.start().await.expect("start failed");
    pubsub.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_publish_message_is_relayed_to_local_subscriber() {
    let url = get_redis_url();
    let pubsub = RedisPubSub::new(&url).await.expect("connect failed");
    pubsub.start().await.expect("start failed");

    let mut rx = pubsub.subscribe_local();

    let message = BroadcastMessage::all(
        MessageType::EventCreated,
        serde_json::json!({ "eventId": "evt-1", "title": "Rooftop meetup" }),
    );
    pubsub.publish_message(&message).await.expect("publish failed");

    let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for relayed event")
        .expect("channel closed");

    assert_eq!(received.message_type, "EVENT_CREATED");
    assert_eq!(received.target_user_id, None);
    assert_eq!(received.payload["eventId"], "evt-1");

    pubsub.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_publish_targeted_message_carries_target_user() {
    let url = get_redis_url();
    let pubsub = RedisPubSub::new(&url).await.expect("connect failed");
    pubsub.start().await.expect("start failed");

    let mut rx = pubsub.subscribe_local();

    let message = BroadcastMessage::targeted(
        MessageType::NotificationCreated,
        "user-42",
        serde_json::json!({ "notificationId": "n-1" }),
    );
    pubsub.publish_message(&message).await.expect("publish failed");

    let received = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for relayed event")
        .expect("channel closed");

    assert_eq!(received.message_type, "NOTIFICATION_CREATED");
    assert_eq!(received.target_user_id.as_deref(), Some("user-42"));

    pubsub.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
#[ignore = "requires running Redis instance"]
async fn test_multiple_instances_relay_to_each_other() {
    let url = get_redis_url();
    let instance_a = RedisPubSub::new(&url).await.expect("connect failed");
    let instance_b = RedisPubSub::new(&url).await.expect("connect failed");
    instance_a.start().await.expect("start failed");
    instance_b.start().await.expect("start failed");

    let mut rx_b = instance_b.subscribe_local();

    let message = BroadcastMessage::all(
        MessageType::EventDeleted,
        serde_json::json!({ "eventId": "evt-7" }),
    );
    instance_a.publish_message(&message).await.expect("publish failed");

    let received = tokio::time::timeout(Duration::from_secs(5), rx_b.recv())
        .await
        .expect("timed out waiting for cross-instance relay")
        .expect("channel closed");

    assert_eq!(received.message_type, "EVENT_DELETED");
    assert_eq!(received.payload["eventId"], "evt-7");

    instance_a.shutdown().await.expect("shutdown failed");
    instance_b.shutdown().await.expect("shutdown failed");
}

#[test]
fn test_broadcast_channel_name_is_stable() {
    assert_eq!(pubsub_channels::BROADCAST, "fedevents:broadcast");
}
