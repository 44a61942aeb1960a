//! Background job queue for fedevents-rs.

pub mod delivery_impl;
pub mod jobs;
pub mod pubsub;
pub mod rate_limit;
pub mod retry;
pub mod scheduler;
pub mod workers;

pub use delivery_impl::RedisDeliveryService;
pub use jobs::*;
pub use pubsub::{channels as pubsub_channels, PubSubBroadcaster, PubSubEvent, PubSubSseBridge, RedisPubSub};
pub use rate_limit::{InstanceRateLimiter, RateLimitConfig, RateLimitResult};
pub use retry::RetryConfig;
pub use scheduler::{reminder_ticker, ReminderTickerConfig};
pub use workers::*;
