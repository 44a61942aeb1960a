//! Delivery retry schedule.
//!
//! Retry delays are a fixed schedule, not computed exponential backoff,
//! so operators can tune them directly via [`fedevents_common::CoreConfig::delivery_retry_schedule_secs`]
//! without the crate needing to know the formula that produced them.

use std::time::Duration;

/// Fixed backoff schedule for delivery retries. Index 0 is the delay before
/// the first retry (i.e. after the initial attempt fails); once the
/// schedule is exhausted the delivery is given up on.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    schedule: Vec<Duration>,
}

impl RetryConfig {
    /// Build a retry config from a list of delays in seconds, as stored in
    /// [`fedevents_common::CoreConfig::delivery_retry_schedule_secs`].
    #[must_use]
    pub fn from_schedule_secs(schedule_secs: &[u64]) -> Self {
        Self {
            schedule: schedule_secs.iter().map(|&s| Duration::from_secs(s)).collect(),
        }
    }

    /// Delay to wait before retry attempt number `attempt` (0-indexed: the
    /// first retry after the initial failed attempt is `attempt == 0`).
    /// Returns `None` once the schedule is exhausted, meaning give up.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        self.schedule.get(attempt).copied()
    }

    /// Maximum number of retries this schedule allows.
    #[must_use]
    pub fn max_retries(&self) -> usize {
        self.schedule.len()
    }

    /// Whether `attempt` (0-indexed retries already made) should be retried
    /// again.
    #[must_use]
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt < self.schedule.len()
    }
}

impl Default for RetryConfig {
    /// The spec's documented default schedule: 30s, 2m, 10m, 1h, 6h.
    fn default() -> Self {
        Self::from_schedule_secs(&[30, 120, 600, 3600, 21600])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule_matches_documented_backoff() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Some(Duration::from_secs(30)));
        assert_eq!(config.delay_for_attempt(1), Some(Duration::from_secs(120)));
        assert_eq!(config.delay_for_attempt(2), Some(Duration::from_secs(600)));
        assert_eq!(config.delay_for_attempt(3), Some(Duration::from_secs(3600)));
        assert_eq!(config.delay_for_attempt(4), Some(Duration::from_secs(21600)));
        assert_eq!(config.delay_for_attempt(5), None);
    }

    #[test]
    fn should_retry_matches_schedule_length() {
        let config = RetryConfig::default();
        assert!(config.should_retry(0));
        assert!(config.should_retry(4));
        assert!(!config.should_retry(5));
    }

    #[test]
    fn custom_schedule_from_secs() {
        let config = RetryConfig::from_schedule_secs(&[5, 10]);
        assert_eq!(config.max_retries(), 2);
        assert_eq!(config.delay_for_attempt(1), Some(Duration::from_secs(10)));
    }
}
