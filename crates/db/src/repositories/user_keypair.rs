//! User keypair repository.

use std::sync::Arc;

use crate::entities::{user_keypair, UserKeypair};
use fedevents_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// User keypair repository for database operations.
#[derive(Clone)]
pub struct UserKeypairRepository {
    db: Arc<DatabaseConnection>,
}

impl UserKeypairRepository {
    /// Create a new user keypair repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a keypair by user ID.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<user_keypair::Model>> {
        UserKeypair::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a keypair by user ID, returning an error if not found.
    pub async fn get_by_user_id(&self, user_id: &str) -> AppResult<user_keypair::Model> {
        self.find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("keypair for user {user_id}")))
    }

    /// Find a keypair by key id (`<actorUrl>#main-key`), for signature verification.
    pub async fn find_by_key_id(&self, key_id: &str) -> AppResult<Option<user_keypair::Model>> {
        UserKeypair::find()
            .filter(user_keypair::Column::KeyId.eq(key_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new keypair (local users carry a private key, remote actors don't).
    pub async fn create(
        &self,
        model: user_keypair::ActiveModel,
    ) -> AppResult<user_keypair::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a keypair by user id (cascades with the owning user otherwise).
    pub async fn delete_by_user_id(&self, user_id: &str) -> AppResult<()> {
        UserKeypair::delete_by_id(user_id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_keypair(user_id: &str, private: Option<&str>) -> user_keypair::Model {
        user_keypair::Model {
            user_id: user_id.to_string(),
            public_key: "-----BEGIN PUBLIC KEY-----\ntest\n-----END PUBLIC KEY-----".to_string(),
            private_key: private.map(str::to_string),
            key_id: format!("https://example.com/users/{user_id}#main-key"),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn find_by_user_id_found() {
        let keypair = create_test_keypair("user1", Some("priv"));
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[keypair.clone()]])
                .into_connection(),
        );

        let repo = UserKeypairRepository::new(db);
        let result = repo.find_by_user_id("user1").await.unwrap();
        assert_eq!(result.unwrap().user_id, "user1");
    }

    #[tokio::test]
    async fn remote_actor_keypair_has_no_private_key() {
        let keypair = create_test_keypair("remote-user", None);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[keypair.clone()]])
                .into_connection(),
        );

        let repo = UserKeypairRepository::new(db);
        let found = repo.find_by_user_id("remote-user").await.unwrap().unwrap();
        assert!(found.private_key.is_none());
    }
}
