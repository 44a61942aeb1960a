//! Follow service — outbound follow/unfollow and inbound follower bookkeeping.

use std::sync::Arc;

use fedevents_common::{AppError, AppResult, IdGenerator};
use fedevents_db::{
    entities::{follower, following, user},
    repositories::{FollowerRepository, FollowingRepository, UserRepository},
};
use fedevents_federation::{ActivityBuilder, UrlConfig};
use sea_orm::Set;

use crate::services::delivery::DeliveryService;

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    following_repo: FollowingRepository,
    follower_repo: FollowerRepository,
    user_repo: UserRepository,
    delivery: Option<DeliveryService>,
    activity_builder: ActivityBuilder,
    url_config: UrlConfig,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub fn new(
        following_repo: FollowingRepository,
        follower_repo: FollowerRepository,
        user_repo: UserRepository,
        url_config: UrlConfig,
    ) -> Self {
        let activity_builder = ActivityBuilder::new(url_config.base_url.clone());
        Self {
            following_repo,
            follower_repo,
            user_repo,
            delivery: None,
            activity_builder,
            url_config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the delivery service used to queue outbound `ActivityPub` traffic.
    pub fn set_delivery(&mut self, delivery: DeliveryService) {
        self.delivery = Some(delivery);
    }

    /// Follow a remote (or local) actor by its resolved user row.
    ///
    /// Outbound follows always start unaccepted; they flip to accepted on
    /// receipt of a remote `Accept`, or immediately for local targets with
    /// `auto_accept_followers` semantics handled by the target's own
    /// inbox processor.
    pub async fn follow(&self, follower_id: &str, target: &user::Model) -> AppResult<following::Model> {
        if follower_id == target.id {
            return Err(AppError::BadRequest("cannot follow yourself".to_string()));
        }
        if self.following_repo.find_by_pair(follower_id, &self.actor_url(target)).await?.is_some() {
            return Err(AppError::Conflict("already following".to_string()));
        }

        let follower = self.user_repo.get_by_id(follower_id).await?;
        let target_actor_url = self.actor_url(target);

        let model = following::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(follower_id.to_string()),
            actor_url: Set(target_actor_url.clone()),
            username: Set(target.username.clone()),
            host: Set(target.host.clone()),
            inbox_url: Set(self.inbox_url(target)),
            shared_inbox_url: Set(target.shared_inbox.clone()),
            accepted: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };
        let created = self.following_repo.create(model).await?;

        if let Some(ref delivery) = self.delivery {
            let follower_url = self.url_config.user_url(&follower.username).to_string();
            let activity = self.activity_builder.follow(&follower_url, &target_actor_url);
            let inbox = self.inbox_url(target);
            if let Err(e) = delivery.queue_follow(follower_id, &inbox, activity).await {
                tracing::warn!(error = %e, "failed to queue Follow activity");
            }
        }

        Ok(created)
    }

    /// Unfollow an actor.
    pub async fn unfollow(&self, follower_id: &str, target: &user::Model) -> AppResult<()> {
        let target_actor_url = self.actor_url(target);
        let Some(existing) = self.following_repo.find_by_pair(follower_id, &target_actor_url).await? else {
            return Err(AppError::NotFound("not following".to_string()));
        };

        self.following_repo.delete(&existing.id).await?;

        if let Some(ref delivery) = self.delivery {
            let follower = self.user_repo.get_by_id(follower_id).await?;
            let follower_url = self.url_config.user_url(&follower.username).to_string();
            let follow_activity = self.activity_builder.follow(&follower_url, &target_actor_url);
            let undo = self.activity_builder.undo(&follower_url, follow_activity);
            let inbox = self.inbox_url(target);
            if let Err(e) = delivery.queue_undo(follower_id, vec![inbox], undo).await {
                tracing::warn!(error = %e, "failed to queue Undo Follow activity");
            }
        }

        Ok(())
    }

    /// Process a local Accept received for an outbound Follow.
    pub async fn mark_following_accepted(
        &self,
        follower_id: &str,
        actor_url: &str,
    ) -> AppResult<Option<following::Model>> {
        self.following_repo.mark_accepted(follower_id, actor_url).await
    }

    /// Inbound follow of a local user: upsert a Follower row.
    ///
    /// `accepted` reflects either `auto_accept_followers` or the target's
    /// explicit un-lock state; callers are responsible for emitting the
    /// resulting Accept activity when `accepted` is true.
    pub async fn receive_follow(
        &self,
        local_user: &user::Model,
        actor_url: &str,
        inbox_url: &str,
        shared_inbox_url: Option<&str>,
        accepted: bool,
    ) -> AppResult<follower::Model> {
        if let Some(existing) = self.follower_repo.find_by_pair(&local_user.id, actor_url).await? {
            return Ok(existing);
        }

        let model = follower::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(local_user.id.clone()),
            actor_url: Set(actor_url.to_string()),
            inbox_url: Set(inbox_url.to_string()),
            shared_inbox_url: Set(shared_inbox_url.map(str::to_string)),
            accepted: Set(accepted),
            created_at: Set(chrono::Utc::now().into()),
        };
        let created = self.follower_repo.create(model).await?;
        if accepted {
            self.user_repo.increment_followers_count(&local_user.id).await?;
        }
        Ok(created)
    }

    /// Get followers of a local user (accepted only).
    pub async fn get_followers(&self, user_id: &str) -> AppResult<Vec<follower::Model>> {
        self.follower_repo.find_accepted_by_user(user_id).await
    }

    /// Get actors a local user follows.
    pub async fn get_following(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<following::Model>> {
        self.following_repo.find_following(user_id, limit, until_id).await
    }

    /// Whether `user_id` has an accepted outbound follow of `actor_url`.
    pub async fn is_following(&self, user_id: &str, actor_url: &str) -> AppResult<bool> {
        self.following_repo.is_following(user_id, actor_url).await
    }

    /// Actor URLs of every author `user_id` follows with an accepted follow.
    /// Feeds the visibility engine's `listable_where` FOLLOWERS restriction.
    pub async fn accepted_following_actor_urls(&self, user_id: &str) -> AppResult<Vec<String>> {
        self.following_repo.find_all_accepted_actor_urls(user_id).await
    }

    fn actor_url(&self, user: &user::Model) -> String {
        user.uri.clone().unwrap_or_else(|| self.url_config.user_url(&user.username).to_string())
    }

    fn inbox_url(&self, user: &user::Model) -> String {
        user.shared_inbox.clone().or_else(|| user.inbox.clone()).unwrap_or_else(|| {
            self.url_config.inbox_url(&user.username).to_string()
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use url::Url;

    fn test_config() -> UrlConfig {
        UrlConfig::new(Url::parse("https://this.host").unwrap())
    }

    fn create_test_user(id: &str, username: &str, host: Option<&str>) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            host: host.map(str::to_string),
            uri: host.map(|h| format!("https://{h}/users/{username}")),
            name: None,
            description: None,
            avatar_url: None,
            banner_url: None,
            timezone: "UTC".to_string(),
            followers_count: 0,
            following_count: 0,
            events_count: 0,
            is_locked: false,
            inbox: host.map(|h| format!("https://{h}/users/{username}/inbox")),
            shared_inbox: None,
            last_fetched_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn follow_yourself_is_rejected() {
        let alice = create_test_user("u1", "alice", None);
        let db1 = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let db2 = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let db3 = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = FollowService::new(
            FollowingRepository::new(db1),
            FollowerRepository::new(db2),
            UserRepository::new(db3),
            test_config(),
        );

        let result = service.follow("u1", &alice).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn follow_already_following_is_conflict() {
        let bob = create_test_user("u2", "bob", Some("remote.example"));
        let existing = following::Model {
            id: "f1".to_string(),
            user_id: "u1".to_string(),
            actor_url: bob.uri.clone().unwrap(),
            username: "bob".to_string(),
            host: Some("remote.example".to_string()),
            inbox_url: "https://remote.example/users/bob/inbox".to_string(),
            shared_inbox_url: None,
            accepted: true,
            created_at: Utc::now().into(),
        };

        let db1 = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );
        let db2 = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let db3 = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let service = FollowService::new(
            FollowingRepository::new(db1),
            FollowerRepository::new(db2),
            UserRepository::new(db3),
            test_config(),
        );

        let result = service.follow("u1", &bob).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
