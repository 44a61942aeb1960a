//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Redis configuration.
    pub redis: RedisConfig,
    /// Federation configuration.
    pub federation: FederationConfig,
    /// Core service tunables (delivery, trending, reminders).
    #[serde(default)]
    pub core: CoreConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL.
    pub url: String,
    /// Key prefix for all Redis keys.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// Federation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Whether federation is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Instance name.
    pub instance_name: String,
    /// Instance description.
    #[serde(default)]
    pub instance_description: Option<String>,
    /// Instance maintainer name.
    #[serde(default)]
    pub maintainer_name: Option<String>,
    /// Instance maintainer email.
    #[serde(default)]
    pub maintainer_email: Option<String>,
}

/// Tunables for the authoring/federation core.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    /// Origin of this instance, used in activity ids and actor URLs.
    pub base_url: String,
    /// Parallel delivery workers.
    #[serde(default = "default_delivery_workers")]
    pub delivery_workers: usize,
    /// Backoff schedule for delivery retries, in seconds.
    #[serde(default = "default_delivery_retry_schedule_secs")]
    pub delivery_retry_schedule_secs: Vec<u64>,
    /// Whether incoming Follow activities are accepted automatically.
    #[serde(default = "default_true")]
    pub auto_accept_followers: bool,
    /// Default trending window, in days.
    #[serde(default = "default_trending_window_days")]
    pub trending_default_window_days: i64,
    /// Maximum trending result limit.
    #[serde(default = "default_trending_max_limit")]
    pub trending_max_limit: u64,
    /// GC horizon for the processed-activity replay table, in days.
    #[serde(default = "default_processed_activity_ttl_days")]
    pub processed_activity_ttl_days: i64,
    /// Reminder scheduler tick interval, in milliseconds.
    #[serde(default = "default_reminders_tick_interval_ms")]
    pub reminders_tick_interval_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            delivery_workers: default_delivery_workers(),
            delivery_retry_schedule_secs: default_delivery_retry_schedule_secs(),
            auto_accept_followers: default_true(),
            trending_default_window_days: default_trending_window_days(),
            trending_max_limit: default_trending_max_limit(),
            processed_activity_ttl_days: default_processed_activity_ttl_days(),
            reminders_tick_interval_ms: default_reminders_tick_interval_ms(),
        }
    }
}

const fn default_delivery_workers() -> usize {
    16
}

fn default_delivery_retry_schedule_secs() -> Vec<u64> {
    vec![30, 120, 600, 3600, 21600]
}

const fn default_trending_window_days() -> i64 {
    7
}

const fn default_trending_max_limit() -> u64 {
    50
}

const fn default_processed_activity_ttl_days() -> i64 {
    30
}

const fn default_reminders_tick_interval_ms() -> u64 {
    1000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_redis_prefix() -> String {
    "fedevents".to_string()
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FEDEVENTS_ENV`)
    /// 3. Environment variables with `FEDEVENTS__` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("FEDEVENTS_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FEDEVENTS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FEDEVENTS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
