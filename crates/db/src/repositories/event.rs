//! Event repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{event, Event};
use fedevents_common::{AppError, AppResult};

/// Event repository for database operations.
#[derive(Clone)]
pub struct EventRepository {
    db: Arc<DatabaseConnection>,
}

impl EventRepository {
    /// Create a new event repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an event by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<event::Model>> {
        Event::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an event by id, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<event::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::EventNotFound(id.to_string()))
    }

    /// Find an event by its canonical `ActivityPub` object id. Used by the
    /// inbox processor to resolve inbound `Update`/`Delete`/`Accept` targets.
    pub async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<event::Model>> {
        Event::find()
            .filter(event::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new event.
    pub async fn create(&self, model: event::ActiveModel) -> AppResult<event::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Persist an update to an event.
    pub async fn update(&self, model: event::ActiveModel) -> AppResult<event::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete an event by id. Cascades to attendance/likes/comments/reminders.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Event::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Events authored by a user, newest-start-first, paginated by id cursor.
    pub async fn find_by_user(
        &self,
        user_id: &str,
        limit: u64,
        before_id: Option<&str>,
    ) -> AppResult<Vec<event::Model>> {
        let mut query = Event::find()
            .filter(event::Column::UserId.eq(user_id))
            .order_by_desc(event::Column::StartTime);

        if let Some(id) = before_id {
            query = query.filter(event::Column::Id.ne(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Events whose `startTime` falls within `[range_start, range_end]`,
    /// restricted by `visibility_filter` (built by the visibility engine).
    /// Used to answer range queries that must include recurring events whose
    /// first occurrence predates the window;
    /// recurrence expansion itself happens in `fedevents-core`.
    pub async fn find_in_range(
        &self,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        visibility_filter: Condition,
    ) -> AppResult<Vec<event::Model>> {
        Event::find()
            .filter(visibility_filter)
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(event::Column::StartTime.gte(range_start))
                            .add(event::Column::StartTime.lte(range_end)),
                    )
                    .add(
                        // recurring events: any occurrence could still land in
                        // range even if the first start_time predates it
                        Condition::all()
                            .add(event::Column::RecurrencePattern.is_not_null())
                            .add(event::Column::StartTime.lte(range_end))
                            .add(
                                Condition::any()
                                    .add(event::Column::RecurrenceEndDate.is_null())
                                    .add(event::Column::RecurrenceEndDate.gte(range_start)),
                            ),
                    ),
            )
            .order_by_asc(event::Column::StartTime)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Candidate events for trending: non-shares whose `start_time` or
    /// `updated_at` falls within the last `W` days, restricted by
    /// `visibility_filter`.
    pub async fn find_trending_candidates(
        &self,
        since: DateTime<Utc>,
        visibility_filter: Condition,
    ) -> AppResult<Vec<event::Model>> {
        Event::find()
            .filter(visibility_filter)
            .filter(event::Column::SharedEventId.is_null())
            .filter(
                Condition::any()
                    .add(event::Column::StartTime.gte(since))
                    .add(event::Column::UpdatedAt.gte(since)),
            )
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count of events authored by a user.
    pub async fn count_by_user(&self, user_id: &str) -> AppResult<u64> {
        Event::find()
            .filter(event::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether `user_id` already has an outstanding share of `original_event_id`.
    pub async fn find_existing_share(
        &self,
        user_id: &str,
        original_event_id: &str,
    ) -> AppResult<Option<event::Model>> {
        Event::find()
            .filter(event::Column::UserId.eq(user_id))
            .filter(event::Column::SharedEventId.eq(original_event_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Shares of `original_event_id`, used to broadcast/cascade a delete of
    /// the original event.
    pub async fn find_shares_of(&self, original_event_id: &str) -> AppResult<Vec<event::Model>> {
        Event::find()
            .filter(event::Column::SharedEventId.eq(original_event_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment the denormalized likes count.
    pub async fn increment_likes_count(&self, event_id: &str) -> AppResult<()> {
        Event::update_many()
            .col_expr(
                event::Column::LikesCount,
                Expr::col(event::Column::LikesCount).add(1),
            )
            .filter(event::Column::Id.eq(event_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement the denormalized likes count, floored at zero.
    pub async fn decrement_likes_count(&self, event_id: &str) -> AppResult<()> {
        Event::update_many()
            .col_expr(
                event::Column::LikesCount,
                Expr::cust("GREATEST(likes_count - 1, 0)"),
            )
            .filter(event::Column::Id.eq(event_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment the denormalized comments count.
    pub async fn increment_comments_count(&self, event_id: &str) -> AppResult<()> {
        Event::update_many()
            .col_expr(
                event::Column::CommentsCount,
                Expr::col(event::Column::CommentsCount).add(1),
            )
            .filter(event::Column::Id.eq(event_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement the denormalized comments count, floored at zero.
    pub async fn decrement_comments_count(&self, event_id: &str) -> AppResult<()> {
        Event::update_many()
            .col_expr(
                event::Column::CommentsCount,
                Expr::cust("GREATEST(comments_count - 1, 0)"),
            )
            .filter(event::Column::Id.eq(event_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment the denormalized shares count.
    pub async fn increment_shares_count(&self, event_id: &str) -> AppResult<()> {
        Event::update_many()
            .col_expr(
                event::Column::SharesCount,
                Expr::col(event::Column::SharesCount).add(1),
            )
            .filter(event::Column::Id.eq(event_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment the denormalized attending-count.
    pub async fn increment_attendance_count(&self, event_id: &str) -> AppResult<()> {
        Event::update_many()
            .col_expr(
                event::Column::AttendanceCount,
                Expr::col(event::Column::AttendanceCount).add(1),
            )
            .filter(event::Column::Id.eq(event_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement the denormalized attending-count, floored at zero.
    pub async fn decrement_attendance_count(&self, event_id: &str) -> AppResult<()> {
        Event::update_many()
            .col_expr(
                event::Column::AttendanceCount,
                Expr::cust("GREATEST(attendance_count - 1, 0)"),
            )
            .filter(event::Column::Id.eq(event_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::event::{RecurrencePattern, Visibility};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn create_test_event(id: &str, user_id: &str, visibility: Visibility) -> event::Model {
        event::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            external_id: Some(format!("https://example.com/events/{id}")),
            attributed_to: format!("https://example.com/users/{user_id}"),
            title: "Picnic".to_string(),
            summary: None,
            location: None,
            latitude: None,
            longitude: None,
            timezone: "UTC".to_string(),
            start_time: Utc::now().into(),
            end_time: None,
            recurrence_pattern: None::<RecurrencePattern>,
            recurrence_end_date: None,
            visibility,
            tags: json!([]),
            private_recipients: None,
            shared_event_id: None,
            is_local: true,
            likes_count: 0,
            attendance_count: 0,
            comments_count: 0,
            shares_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn find_by_external_id_found() {
        let event = create_test_event("e1", "u1", Visibility::Public);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[event.clone()]])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let found = repo
            .find_by_external_id("https://example.com/events/e1")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, "e1");
    }

    #[tokio::test]
    async fn get_by_id_missing_is_event_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<event::Model>::new()])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let err = repo.get_by_id("missing").await.unwrap_err();
        assert!(matches!(err, AppError::EventNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn find_existing_share_detects_duplicate() {
        let share = create_test_event("share1", "u2", Visibility::Public);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[share.clone()]])
                .into_connection(),
        );

        let repo = EventRepository::new(db);
        let found = repo.find_existing_share("u2", "e1").await.unwrap();
        assert!(found.is_some());
    }
}
