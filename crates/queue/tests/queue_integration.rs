//! Queue integration tests.
//!
//! These tests verify the queue components work correctly together.

use std::time::Duration;

use fedevents_common::broadcast::{BroadcastMessage, MessageType};
use fedevents_queue::{InstanceRateLimiter, PubSubEvent, RateLimitConfig, RateLimitResult, ReminderTickerConfig, RetryConfig};

#[tokio::test]
async fn test_rate_limiter_multiple_instances_isolation() {
    let config = RateLimitConfig {
        max_requests: 10,
        window: Duration::from_secs(60),
        cooldown: Duration::from_secs(300),
    };
    let limiter = InstanceRateLimiter::new(config);

    for _ in 0..5 {
        assert_eq!(
            limiter.check("instance-a.example.com").await,
            RateLimitResult::Allowed
        );
    }

    for _ in 0..10 {
        assert_eq!(
            limiter.check("instance-b.example.com").await,
            RateLimitResult::Allowed
        );
    }

    assert_eq!(
        limiter.check("instance-a.example.com").await,
        RateLimitResult::Allowed
    );

    match limiter.check("instance-b.example.com").await {
        RateLimitResult::Cooldown { .. } => {}
        other => panic!("Expected Cooldown, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limiter_concurrent_access() {
    let config = RateLimitConfig {
        max_requests: 100,
        window: Duration::from_secs(60),
        cooldown: Duration::from_secs(10),
    };
    let limiter = InstanceRateLimiter::new(config);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check("concurrent.example.com").await })
        })
        .collect();

    let mut allowed_count = 0;
    for handle in handles {
        if matches!(handle.await, Ok(RateLimitResult::Allowed)) {
            allowed_count += 1;
        }
    }

    assert_eq!(allowed_count, 50);
    assert_eq!(limiter.instance_count().await, 1);
}

#[tokio::test]
async fn test_rate_limiter_cleanup() {
    let config = RateLimitConfig {
        max_requests: 5,
        window: Duration::from_millis(10),
        cooldown: Duration::from_millis(10),
    };
    let limiter = InstanceRateLimiter::new(config);

    limiter.check("cleanup-1.example.com").await;
    limiter.check("cleanup-2.example.com").await;
    limiter.check("cleanup-3.example.com").await;

    assert_eq!(limiter.instance_count().await, 3);

    tokio::time::sleep(Duration::from_millis(50)).await;
    limiter.cleanup().await;

    assert_eq!(limiter.instance_count().await, 0);
}

#[test]
fn test_reminder_ticker_config_from_millis() {
    let config = ReminderTickerConfig::from_tick_interval_ms(1000);
    assert_eq!(config.tick_interval, Duration::from_secs(1));
    assert_eq!(config.processed_activity_gc_interval, Duration::from_secs(3600));
}

#[test]
fn test_retry_schedule_defaults_to_documented_backoff() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries(), 5);
    assert_eq!(config.delay_for_attempt(0), Some(Duration::from_secs(30)));
    assert_eq!(config.delay_for_attempt(4), Some(Duration::from_secs(21600)));
    assert!(config.delay_for_attempt(5).is_none());
}

#[test]
fn test_pubsub_event_roundtrips_every_message_type() {
    let messages = [
        BroadcastMessage::all(MessageType::EventCreated, serde_json::json!({ "eventId": "e1" })),
        BroadcastMessage::targeted(
            MessageType::LikeAdded,
            "user-1",
            serde_json::json!({ "eventId": "e1", "actorId": "u2" }),
        ),
        BroadcastMessage::targeted(
            MessageType::NotificationRead,
            "user-2",
            serde_json::json!({ "notificationId": "n1" }),
        ),
    ];

    for message in messages {
        let event = PubSubEvent {
            message_type: match message.message_type {
                MessageType::EventCreated => "EVENT_CREATED".to_string(),
                MessageType::LikeAdded => "LIKE_ADDED".to_string(),
                MessageType::NotificationRead => "NOTIFICATION_READ".to_string(),
                _ => unreachable!(),
            },
            target_user_id: message.target_user_id.clone(),
            payload: message.payload.clone(),
        };
        let json = serde_json::to_string(&event).expect("serialization failed");
        let parsed: PubSubEvent = serde_json::from_str(&json).expect("deserialization failed");
        assert_eq!(parsed.message_type, event.message_type);
        assert_eq!(parsed.target_user_id, event.target_user_id);
    }
}
