//! Comment repository.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect};

use crate::entities::{comment, Comment};
use fedevents_common::{AppError, AppResult};

/// Comment repository for database operations.
#[derive(Clone)]
pub struct CommentRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentRepository {
    /// Create a new comment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a comment by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a comment by id, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<comment::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {id}")))
    }

    /// Find a comment by the `ActivityPub` object id that produced it
    /// (for idempotent upsert on inbound `Create`).
    pub async fn find_by_external_id(&self, external_id: &str) -> AppResult<Option<comment::Model>> {
        Comment::find()
            .filter(comment::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new comment.
    pub async fn create(&self, model: comment::ActiveModel) -> AppResult<comment::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a comment by id.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Comment::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Comments on an event, oldest first (matches the `Comment(eventId,
    /// createdAt)` index), for display and reply-depth checks.
    pub async fn find_by_event(&self, event_id: &str) -> AppResult<Vec<comment::Model>> {
        Comment::find()
            .filter(comment::Column::EventId.eq(event_id))
            .order_by_asc(comment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count of comments created for `event_id` on or after `since`
    /// (trending scorer engagement window).
    pub async fn count_since(
        &self,
        event_id: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<u64> {
        use sea_orm::PaginatorTrait;
        Comment::find()
            .filter(comment::Column::EventId.eq(event_id))
            .filter(comment::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Walk the `in_reply_to` chain to compute this comment's depth in the
    /// reply tree, capped at `cap` hops (policy: soft display cap at 3, per
    /// callers use this to decide whether to keep flattening
    /// display rather than to reject deeper replies outright).
    pub async fn depth(&self, comment_id: &str, cap: u32) -> AppResult<u32> {
        let mut depth = 0;
        let mut current = self.get_by_id(comment_id).await?;
        while let Some(parent_id) = current.in_reply_to_id.clone() {
            if depth >= cap {
                break;
            }
            depth += 1;
            current = self.get_by_id(&parent_id).await?;
        }
        Ok(depth)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_row(id: &str, event_id: &str, in_reply_to: Option<&str>) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            event_id: event_id.to_string(),
            author_id: "u1".to_string(),
            in_reply_to_id: in_reply_to.map(str::to_string),
            content: "hello".to_string(),
            external_id: None,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn find_by_event_orders_oldest_first() {
        let c1 = test_row("c1", "e1", None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[c1.clone()]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let rows = repo.find_by_event("e1").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn depth_walks_reply_chain() {
        let root = test_row("c1", "e1", None);
        let child = test_row("c2", "e1", Some("c1"));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[child.clone()]])
                .append_query_results([[root.clone()]])
                .into_connection(),
        );

        let repo = CommentRepository::new(db);
        let depth = repo.depth("c2", 3).await.unwrap();
        assert_eq!(depth, 1);
    }
}
