//! User (actor profile) service.
//!
//! Local session authentication is an external collaborator (a
//! `CurrentViewer` extractor upstream of this crate) — this service only
//! owns actor identity and profile fields, plus the one-time RSA keypair a
//! local user needs for `ActivityPub` signing.

use fedevents_common::{generate_rsa_keypair, AppError, AppResult, Config, IdGenerator};
use fedevents_db::{
    entities::{user, user_keypair},
    repositories::{UserKeypairRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    keypair_repo: UserKeypairRepository,
    id_gen: IdGenerator,
    server_url: String,
}

/// Input for registering a new local user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,

    #[validate(length(max = 256))]
    pub name: Option<String>,
}

/// Input for updating a user's profile.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(max = 256))]
    pub name: Option<String>,

    #[validate(length(max = 2048))]
    pub description: Option<String>,

    pub avatar_url: Option<String>,
    pub banner_url: Option<String>,
    pub is_locked: Option<bool>,
    pub timezone: Option<String>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        keypair_repo: UserKeypairRepository,
        config: &Config,
    ) -> Self {
        Self {
            user_repo,
            keypair_repo,
            id_gen: IdGenerator::new(),
            server_url: config.core.base_url.clone(),
        }
    }

    /// Register a new local user, generating its `ActivityPub` RSA keypair.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_local_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("username already taken".to_string()));
        }

        let user_id = self.id_gen.generate();
        let user_model = user::ActiveModel {
            id: Set(user_id.clone()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            name: Set(input.name),
            ..Default::default()
        };
        let created = self.user_repo.create(user_model).await?;

        let keypair = generate_rsa_keypair()?;
        let key_id = format!("{}/users/{}#main-key", self.server_url, input.username);
        let keypair_model = user_keypair::ActiveModel {
            user_id: Set(user_id),
            public_key: Set(keypair.public_key_pem),
            private_key: Set(Some(keypair.private_key_pem)),
            key_id: Set(key_id),
            created_at: Set(chrono::Utc::now().into()),
        };
        self.keypair_repo.create(keypair_model).await?;

        Ok(created)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Find a local user by username.
    pub async fn get_local_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_local_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))
    }

    /// Update a user's profile fields.
    pub async fn update(&self, id: &str, input: UpdateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(name) = input.name {
            active.name = Set(Some(name));
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        if let Some(banner_url) = input.banner_url {
            active.banner_url = Set(Some(banner_url));
        }
        if let Some(is_locked) = input.is_locked {
            active.is_locked = Set(is_locked);
        }
        if let Some(timezone) = input.timezone {
            active.timezone = Set(timezone);
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fedevents_common::config::{CoreConfig, DatabaseConfig, FederationConfig, RedisConfig, ServerConfig};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                url: "https://example.com".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/test".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            redis: RedisConfig {
                url: "redis://localhost".to_string(),
                prefix: "fe:".to_string(),
            },
            federation: FederationConfig {
                enabled: true,
                instance_name: "Test Instance".to_string(),
                instance_description: None,
                maintainer_name: None,
                maintainer_email: None,
            },
            core: CoreConfig::default(),
        }
    }

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: None,
            uri: None,
            name: Some("Test User".to_string()),
            description: None,
            avatar_url: None,
            banner_url: None,
            timezone: "UTC".to_string(),
            followers_count: 0,
            following_count: 0,
            events_count: 0,
            is_locked: false,
            inbox: None,
            shared_inbox: None,
            last_fetched_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn get_user_not_found() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let keypair_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = UserService::new(
            UserRepository::new(user_db),
            UserKeypairRepository::new(keypair_db),
            &create_test_config(),
        );

        let result = service.get("nonexistent").await;
        assert!(matches!(result, Err(AppError::UserNotFound(id)) if id == "nonexistent"));
    }

    #[tokio::test]
    async fn get_local_by_username_found() {
        let user = create_test_user("user1", "alice");
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );
        let keypair_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = UserService::new(
            UserRepository::new(user_db),
            UserKeypairRepository::new(keypair_db),
            &create_test_config(),
        );

        let result = service.get_local_by_username("alice").await.unwrap();
        assert_eq!(result.id, "user1");
    }

    #[test]
    fn create_user_input_validation() {
        let input = CreateUserInput {
            username: "a".repeat(200),
            name: None,
        };
        assert!(input.validate().is_err());

        let input = CreateUserInput {
            username: "alice".to_string(),
            name: Some("Alice".to_string()),
        };
        assert!(input.validate().is_ok());
    }
}
