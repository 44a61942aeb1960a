//! Follower repository — inbound follows of local users.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
};

use crate::entities::{follower, Follower};
use fedevents_common::{AppError, AppResult};

/// Follower repository for database operations.
#[derive(Clone)]
pub struct FollowerRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowerRepository {
    /// Create a new follower repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the follower row for `(user_id, actor_url)`.
    pub async fn find_by_pair(
        &self,
        user_id: &str,
        actor_url: &str,
    ) -> AppResult<Option<follower::Model>> {
        Follower::find()
            .filter(follower::Column::UserId.eq(user_id))
            .filter(follower::Column::ActorUrl.eq(actor_url))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new follower row.
    pub async fn create(&self, model: follower::ActiveModel) -> AppResult<follower::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a pending follower row accepted (`autoAcceptFollowers` or an
    /// explicit Accept sent by the followed user).
    pub async fn mark_accepted(
        &self,
        user_id: &str,
        actor_url: &str,
    ) -> AppResult<Option<follower::Model>> {
        let Some(existing) = self.find_by_pair(user_id, actor_url).await? else {
            return Ok(None);
        };
        let mut active: follower::ActiveModel = existing.into();
        active.accepted = Set(true);
        active
            .update(self.db.as_ref())
            .await
            .map(Some)
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the follower row for `(user_id, actor_url)` (Undo of a Follow).
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

    /// All accepted followers of a local user, for recipient expansion when
    /// delivering a FOLLOWERS-visibility event.
    pub async fn find_accepted_by_user(&self, user_id: &str) -> AppResult<Vec<follower::Model>> {
        Follower::find()
            .filter(follower::Column::UserId.eq(user_id))
            .filter(follower::Column::Accepted.eq(true))
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

    fn test_row(user_id: &str, actor_url: &str, accepted: bool) -> follower::Model {
        follower::Model {
            id: "f1".to_string(),
            user_id: user_id.to_string(),
            actor_url: actor_url.to_string(),
            inbox_url: format!("{actor_url}/inbox"),
            shared_inbox_url: None,
            accepted,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn mark_accepted_updates_row() {
        let row = test_row("u1", "https://remote/actor", false);
        let accepted = follower::Model {
            accepted: true,
            ..row.clone()
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![row]])
                .append_query_results([vec![accepted]])
                .into_connection(),
        );

        let repo = FollowerRepository::new(db);
        let result = repo
            .mark_accepted("u1", "https://remote/actor")
            .await
            .unwrap();
        assert!(result.unwrap().accepted);
    }

    #[tokio::test]
    async fn delete_by_pair_missing_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<follower::Model>::new()])
                .into_connection(),
        );

        let repo = FollowerRepository::new(db);
        assert!(!repo.delete_by_pair("u1", "https://remote/actor").await.unwrap());
    }
}
