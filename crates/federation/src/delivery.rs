//! Recipient expansion for outbound activities.
//!
//! Turns an activity's `to`/`cc`/`bcc` addressing into the concrete set of
//! inbox URLs it must be delivered to: the `as:Public` recipient is dropped
//! (it addresses nobody directly), the sender's own followers collection is
//! expanded to its accepted followers, and every remaining actor URL is
//! resolved to an inbox, preferring a shared inbox when the remote server
//! advertises one. The queue crate collapses the result to unique inboxes,
//! signs, and performs the actual delivery with retry.

use std::collections::HashSet;

use fedevents_db::entities::user;
use fedevents_db::repositories::FollowerRepository;

use crate::activity::{Addressing, PUBLIC};
use crate::actor::ActorResolver;
use crate::urls::UrlConfig;

/// Expands addressing into a set of inbox URLs for a single outbound activity.
#[derive(Clone)]
pub struct DeliveryPlanner {
    follower_repo: FollowerRepository,
    actor_resolver: ActorResolver,
    url_config: UrlConfig,
}

impl DeliveryPlanner {
    #[must_use]
    pub const fn new(
        follower_repo: FollowerRepository,
        actor_resolver: ActorResolver,
        url_config: UrlConfig,
    ) -> Self {
        Self {
            follower_repo,
            actor_resolver,
            url_config,
        }
    }

    /// Resolve `addressing`, authored by `sender`, to the set of inbox URLs
    /// it must be delivered to. Deduplicated and excludes the sender's own
    /// inbox (an actor never delivers to itself).
    pub async fn plan(
        &self,
        addressing: &Addressing,
        sender: &user::Model,
    ) -> fedevents_common::AppResult<Vec<String>> {
        let followers_url = self.url_config.followers_url(&sender.username).to_string();
        let sender_url = self.url_config.user_url(&sender.username).to_string();

        let mut actor_urls: HashSet<String> = HashSet::new();
        for url in addressing
            .to
            .iter()
            .chain(addressing.cc.iter())
            .chain(addressing.bcc.iter())
        {
            if url == PUBLIC || url == &sender_url {
                continue;
            }
            if url == &followers_url {
                let followers = self.follower_repo.find_accepted_by_user(&sender.id).await?;
                actor_urls.extend(followers.into_iter().map(|f| f.actor_url));
                continue;
            }
            actor_urls.insert(url.clone());
        }

        let mut inboxes: HashSet<String> = HashSet::new();
        for actor_url in actor_urls {
            if let Some(inbox) = self.actor_resolver.resolve_inbox(&actor_url).await? {
                inboxes.insert(inbox);
            }
        }

        Ok(inboxes.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RemoteActorCache;
    use crate::client::ApClient;
    use fedevents_db::repositories::UserRepository;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;
    use url::Url;

    fn test_user() -> user::Model {
        user::Model {
            id: "u1".to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            host: None,
            uri: None,
            name: None,
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
            created_at: chrono::Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_planner() -> DeliveryPlanner {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let url_config = UrlConfig::new(Url::parse("https://this.host").unwrap());
        let user_repo = UserRepository::new(db.clone());
        let follower_repo = FollowerRepository::new(db.clone());
        let redis = Arc::new(fred::clients::Client::new(
            fred::types::config::Config::default(),
            None,
            None,
            None,
        ));
        let cache = RemoteActorCache::new(redis);
        let resolver = ActorResolver::new(user_repo, cache, ApClient::default(), url_config.clone());
        DeliveryPlanner::new(follower_repo, resolver, url_config)
    }

    #[tokio::test]
    async fn plan_drops_public_recipient() {
        let planner = test_planner();
        let sender = test_user();
        let addressing = Addressing {
            to: vec![PUBLIC.to_string()],
            cc: vec![],
            bcc: vec![],
        };
        let inboxes = planner.plan(&addressing, &sender).await.unwrap();
        assert!(inboxes.is_empty());
    }

    #[tokio::test]
    async fn plan_drops_sender_own_url() {
        let planner = test_planner();
        let sender = test_user();
        let addressing = Addressing {
            to: vec!["https://this.host/users/alice".to_string()],
            cc: vec![],
            bcc: vec![],
        };
        let inboxes = planner.plan(&addressing, &sender).await.unwrap();
        assert!(inboxes.is_empty());
    }
}
