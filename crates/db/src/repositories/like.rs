//! Like repository.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter};

use crate::entities::{like, Like};
use fedevents_common::{AppError, AppResult};

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the like row for `(event_id, user_id)` — at most one ever exists.
    pub async fn find_by_pair(&self, event_id: &str, user_id: &str) -> AppResult<Option<like::Model>> {
        Like::find()
            .filter(like::Column::EventId.eq(event_id))
            .filter(like::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a like by the `ActivityPub` activity id that produced it.
    pub async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<like::Model>> {
        Like::find()
            .filter(like::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new like row. Relies on the unique `(event_id, user_id)`
    /// index to surface duplicates as a database error; callers should
    /// check `find_by_pair` first to keep the effect idempotent.
    pub async fn create(&self, model: like::ActiveModel) -> AppResult<like::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the like row for `(event_id, user_id)`, if any. Returns
    /// whether a row was actually removed (Undo-of-absent-Like is a no-op).
    pub async fn delete_by_pair(&self, event_id: &str, user_id: &str) -> AppResult<bool> {
        let Some(existing) = self.find_by_pair(event_id, user_id).await? else {
            return Ok(false);
        };
        existing
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Count of likes created for `event_id` on or after `since` (trending
    /// scorer engagement window) and as its tie-break count.
    pub async fn count_since(
        &self,
        event_id: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<u64> {
        Like::find()
            .filter(like::Column::EventId.eq(event_id))
            .filter(like::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_row(event_id: &str, user_id: &str) -> like::Model {
        like::Model {
            id: "l1".to_string(),
            user_id: user_id.to_string(),
            event_id: event_id.to_string(),
            external_id: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn find_by_pair_found() {
        let row = test_row("e1", "u1");
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row.clone()]])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        let found = repo.find_by_pair("e1", "u1").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn delete_by_pair_missing_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<like::Model>::new()])
                .into_connection(),
        );

        let repo = LikeRepository::new(db);
        assert!(!repo.delete_by_pair("e1", "u1").await.unwrap());
    }
}
