//! Following repository — outbound follows of remote (or local) actors.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{following, Following};
use fedevents_common::{AppError, AppResult};

/// Following repository for database operations.
#[derive(Clone)]
pub struct FollowingRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowingRepository {
    /// Create a new following repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a following relationship by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<following::Model>> {
        Following::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the following row for `(user_id, actor_url)`.
    pub async fn find_by_pair(
        &self,
        user_id: &str,
        actor_url: &str,
    ) -> AppResult<Option<following::Model>> {
        Following::find()
            .filter(following::Column::UserId.eq(user_id))
            .filter(following::Column::ActorUrl.eq(actor_url))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether `user_id` follows `actor_url` and the follow has been accepted.
    pub async fn is_following(&self, user_id: &str, actor_url: &str) -> AppResult<bool> {
        Ok(self
            .find_by_pair(user_id, actor_url)
            .await?
            .is_some_and(|row| row.accepted))
    }

    /// Insert a new following row.
    pub async fn create(&self, model: following::ActiveModel) -> AppResult<following::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a pending following row accepted, on receipt of a remote Accept.
    pub async fn mark_accepted(
        &self,
        user_id: &str,
        actor_url: &str,
    ) -> AppResult<Option<following::Model>> {
        let Some(existing) = self.find_by_pair(user_id, actor_url).await? else {
            return Ok(None);
        };
        let mut active: following::ActiveModel = existing.into();
        active.accepted = Set(true);
        active
            .update(self.db.as_ref())
            .await
            .map(Some)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a following row by id (Unfollow).
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if let Some(row) = self.find_by_id(id).await? {
            row.delete(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Delete the following row for `(user_id, actor_url)`.
    pub async fn delete_by_pair(&self, user_id: &str, actor_url: &str) -> AppResult<bool> {
        let Some(existing) = self.find_by_pair(user_id, actor_url).await? else {
            return Ok(false);
        };
        existing
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Actors a local user follows, paginated newest-first.
    pub async fn find_following(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        let mut query = Following::find()
            .filter(following::Column::UserId.eq(user_id))
            .order_by_desc(following::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(following::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count of actors a local user follows.
    pub async fn count_following(&self, user_id: &str) -> AppResult<u64> {
        Following::find()
            .filter(following::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Actor URLs of every actor `user_id` follows with an accepted follow,
    /// unpaginated. Used by the visibility engine to restrict FOLLOWERS-only
    /// listings to authors the viewer actually follows.
    pub async fn find_all_accepted_actor_urls(&self, user_id: &str) -> AppResult<Vec<String>> {
        Following::find()
            .filter(following::Column::UserId.eq(user_id))
            .filter(following::Column::Accepted.eq(true))
            .all(self.db.as_ref())
            .await
            .map(|rows| rows.into_iter().map(|row| row.actor_url).collect())
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_row(id: &str, user_id: &str, actor_url: &str, accepted: bool) -> following::Model {
        following::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            actor_url: actor_url.to_string(),
            username: "remote_user".to_string(),
            host: Some("remote.example".to_string()),
            inbox_url: format!("{actor_url}/inbox"),
            shared_inbox_url: None,
            accepted,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn is_following_requires_accepted() {
        let row = test_row("f1", "u1", "https://remote/actor", false);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row]])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert!(!repo.is_following("u1", "https://remote/actor").await.unwrap());
    }

    #[tokio::test]
    async fn find_by_pair_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<following::Model>::new()])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        assert!(repo.find_by_pair("u1", "https://remote/actor").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_following_returns_rows() {
        let f1 = test_row("f1", "u1", "https://remote/a", true);
        let f2 = test_row("f2", "u1", "https://remote/b", true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[f1, f2]])
                .into_connection(),
        );

        let repo = FollowingRepository::new(db);
        let result = repo.find_following("u1", 10, None).await.unwrap();
        assert_eq!(result.len(), 2);
    }
}
