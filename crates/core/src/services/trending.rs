//! Trending scorer — spec §4.8.

use chrono::{DateTime, Utc};
use fedevents_common::AppResult;
use fedevents_db::{
    entities::event,
    repositories::{AttendanceRepository, CommentRepository, EventRepository, LikeRepository},
};

use crate::services::follow::FollowService;
use crate::services::visibility::{listable_where, Viewer};

/// Default/clamped bounds for the trending window and result limit.
const MIN_WINDOW_DAYS: i64 = 1;
const MAX_WINDOW_DAYS: i64 = 30;
const DEFAULT_WINDOW_DAYS: i64 = 7;
const MIN_LIMIT: u64 = 1;
const MAX_LIMIT: u64 = 50;
const DEFAULT_LIMIT: u64 = 10;

const WEIGHT_LIKES: f64 = 1.0;
const WEIGHT_COMMENTS: f64 = 2.0;
const WEIGHT_ATTENDANCE: f64 = 3.0;

/// A scored trending result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrendingEntry {
    pub event: event::Model,
    pub score: f64,
    pub likes: u64,
}

/// Trending scorer service.
#[derive(Clone)]
pub struct TrendingService {
    event_repo: EventRepository,
    like_repo: LikeRepository,
    comment_repo: CommentRepository,
    attendance_repo: AttendanceRepository,
    follow_service: FollowService,
}

impl TrendingService {
    /// Create a new trending service.
    #[must_use]
    pub const fn new(
        event_repo: EventRepository,
        like_repo: LikeRepository,
        comment_repo: CommentRepository,
        attendance_repo: AttendanceRepository,
        follow_service: FollowService,
    ) -> Self {
        Self {
            event_repo,
            like_repo,
            comment_repo,
            attendance_repo,
            follow_service,
        }
    }

    /// Clamp a caller-supplied window (days) to `[1, 30]`, defaulting to 7.
    #[must_use]
    pub fn clamp_window(window_days: Option<i64>) -> i64 {
        window_days
            .unwrap_or(DEFAULT_WINDOW_DAYS)
            .clamp(MIN_WINDOW_DAYS, MAX_WINDOW_DAYS)
    }

    /// Clamp a caller-supplied limit to `[1, 50]`, defaulting to 10. A
    /// requested limit of 0 yields an empty result (not the default).
    #[must_use]
    pub fn clamp_limit(limit: Option<u64>) -> u64 {
        match limit {
            Some(0) => 0,
            Some(l) => l.clamp(MIN_LIMIT, MAX_LIMIT),
            None => DEFAULT_LIMIT,
        }
    }

    /// Compute the top-`limit` trending events visible to `viewer`, scored
    /// over the last `window_days` days as of `now`.
    pub async fn trending(
        &self,
        viewer: Viewer<'_>,
        window_days: i64,
        limit: u64,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<TrendingEntry>> {
        if limit == 0 {
            return Ok(vec![]);
        }

        let followed_actor_urls = match viewer {
            Viewer::User(viewer_id) => self.follow_service.accepted_following_actor_urls(viewer_id).await?,
            Viewer::Anonymous => Vec::new(),
        };

        let since = now - chrono::Duration::days(window_days);
        let candidates = self
            .event_repo
            .find_trending_candidates(since, listable_where(viewer, &followed_actor_urls))
            .await?;

        let mut scored = Vec::with_capacity(candidates.len());
        for event in candidates {
            let likes = self.like_repo.count_since(&event.id, since).await?;
            let comments = self.comment_repo.count_since(&event.id, since).await?;
            let attendance = self.attendance_repo.count_since(&event.id, since).await?;

            if likes == 0 && comments == 0 && attendance == 0 {
                continue;
            }

            let age_days = (now - event.start_time).num_seconds().max(0) as f64 / 86_400.0;
            let decay = (1.0 - age_days / window_days as f64).max(0.0);
            let score = (WEIGHT_LIKES * likes as f64
                + WEIGHT_COMMENTS * comments as f64
                + WEIGHT_ATTENDANCE * attendance as f64)
                * decay;

            scored.push(TrendingEntry { event, score, likes });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.likes.cmp(&a.likes))
                .then_with(|| a.event.start_time.cmp(&b.event.start_time))
        });
        scored.truncate(limit as usize);

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_clamps_to_30() {
        assert_eq!(TrendingService::clamp_window(Some(90)), 30);
        assert_eq!(TrendingService::clamp_window(Some(0)), 1);
        assert_eq!(TrendingService::clamp_window(None), 7);
    }

    #[test]
    fn limit_zero_yields_empty_not_default() {
        assert_eq!(TrendingService::clamp_limit(Some(0)), 0);
        assert_eq!(TrendingService::clamp_limit(Some(500)), 50);
        assert_eq!(TrendingService::clamp_limit(None), 10);
    }
}
