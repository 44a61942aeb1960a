//! Comment mention repository.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use crate::entities::{comment_mention, CommentMention};
use fedevents_common::{AppError, AppResult};

/// Comment mention repository for database operations.
#[derive(Clone)]
pub struct CommentMentionRepository {
    db: Arc<DatabaseConnection>,
}

impl CommentMentionRepository {
    /// Create a new comment mention repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert a new mention row.
    pub async fn create(
        &self,
        model: comment_mention::ActiveModel,
    ) -> AppResult<comment_mention::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mentions produced by a given comment (notification fan-out).
    pub async fn find_by_comment(
        &self,
        comment_id: &str,
    ) -> AppResult<Vec<comment_mention::Model>> {
        CommentMention::find()
            .filter(comment_mention::Column::CommentId.eq(comment_id))
            .all(self.db.as_ref())
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

    #[tokio::test]
    async fn find_by_comment_returns_rows() {
        let row = comment_mention::Model {
            id: "m1".to_string(),
            comment_id: "c1".to_string(),
            mentioned_user_id: "u2".to_string(),
            created_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row.clone()]])
                .into_connection(),
        );

        let repo = CommentMentionRepository::new(db);
        let rows = repo.find_by_comment("c1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mentioned_user_id, "u2");
    }
}
