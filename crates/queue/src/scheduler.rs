//! Background tickers: reminder firing and processed-activity garbage collection.
//!
//! Both run as single tasks on a fixed interval rather than as apalis jobs —
//! there is no meaningful unit of work to distribute across workers, just a
//! periodic sweep against the database.

#![allow(missing_docs)]

use std::time::Duration;

use chrono::Utc;
use fedevents_core::services::ReminderService;
use fedevents_db::repositories::ProcessedActivityRepository;
use tokio::time::interval;
use tracing::{error, info};

/// Configuration for the reminder/cleanup tickers.
#[derive(Debug, Clone)]
pub struct ReminderTickerConfig {
    /// How often to sweep for due reminders.
    pub tick_interval: Duration,
    /// Maximum reminders claimed per tick.
    pub batch_limit: u64,
    /// How often to sweep processed-activity rows past their TTL.
    pub processed_activity_gc_interval: Duration,
}

impl ReminderTickerConfig {
    /// Build from the raw millisecond interval stored in [`fedevents_common::CoreConfig`].
    #[must_use]
    pub fn from_tick_interval_ms(tick_interval_ms: u64) -> Self {
        Self {
            tick_interval: Duration::from_millis(tick_interval_ms),
            batch_limit: 100,
            processed_activity_gc_interval: Duration::from_secs(3600),
        }
    }
}

/// Spawn the reminder ticker and processed-activity GC sweep. Both run
/// until the process exits; callers hold no handle because there is
/// nothing to await other than shutdown of the process itself.
pub fn reminder_ticker(
    config: ReminderTickerConfig,
    reminders: ReminderService,
    processed_activities: ProcessedActivityRepository,
) {
    let reminder_interval = config.tick_interval;
    tokio::spawn(async move {
        let mut ticker = interval(reminder_interval);
        loop {
            ticker.tick().await;
            match reminders.process_due(Utc::now(), config.batch_limit).await {
                Ok(count) => {
                    if count > 0 {
                        info!(count, "fired due reminders");
                    }
                }
                Err(e) => error!(error = %e, "failed to process due reminders"),
            }
        }
    });

    let gc_interval = config.processed_activity_gc_interval;
    tokio::spawn(async move {
        let mut ticker = interval(gc_interval);
        loop {
            ticker.tick().await;
            match processed_activities.delete_expired(Utc::now()).await {
                Ok(count) => {
                    if count > 0 {
                        info!(count, "garbage-collected expired processed-activity rows");
                    }
                }
                Err(e) => error!(error = %e, "failed to garbage-collect processed activities"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_converts_millis_to_duration() {
        let config = ReminderTickerConfig::from_tick_interval_ms(1000);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
    }
}
