//! Actor resolver and local Person document builder.

use std::sync::Arc;

use fedevents_common::IdGenerator;
use fedevents_db::entities::user;
use fedevents_db::repositories::UserRepository;
use sea_orm::Set;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CachedRemoteActor, RemoteActorCache};
use crate::client::ApClient;
use crate::urls::UrlConfig;

/// Resolves `ActivityPub` actor URLs to `User` rows, fetching and persisting
/// remote actors on first sight and converging concurrent resolves of the
/// same URL onto a single row.
#[derive(Clone)]
pub struct ActorResolver {
    user_repo: UserRepository,
    cache: RemoteActorCache,
    client: ApClient,
    url_config: UrlConfig,
    id_gen: IdGenerator,
}

impl ActorResolver {
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        cache: RemoteActorCache,
        client: ApClient,
        url_config: UrlConfig,
    ) -> Self {
        Self {
            user_repo,
            cache,
            client,
            url_config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Resolve `actor_url` to a `User` row. Never surfaces network or parse
    /// failures to the caller — they collapse to `Ok(None)` so the caller can
    /// apply its own retry or rejection policy.
    pub async fn resolve(&self, actor_url: &str) -> fedevents_common::AppResult<Option<user::Model>> {
        if let Some(username) = self.url_config.local_username(actor_url) {
            return self.user_repo.find_local_by_username(&username).await;
        }

        if let Some(existing) = self.user_repo.find_by_uri(actor_url).await? {
            return Ok(Some(existing));
        }

        match self.cache.is_failed_lookup(actor_url).await {
            Ok(true) => return Ok(None),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "negative actor cache lookup failed, proceeding"),
        }

        let host = match Url::parse(actor_url).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(h) => h,
            None => return Ok(None),
        };

        let actor_json = match self.client.fetch_actor(actor_url).await {
            Ok(json) => json,
            Err(e) => {
                debug!(actor_url = %actor_url, error = %e, "actor fetch failed");
                let _ = self.cache.set_failed(actor_url).await;
                return Ok(None);
            }
        };

        let Some(cached) = CachedRemoteActor::from_json(&actor_json, &host) else {
            warn!(actor_url = %actor_url, "actor document missing required fields");
            let _ = self.cache.set_failed(actor_url).await;
            return Ok(None);
        };

        let _ = self.cache.set(&cached).await;

        let now = chrono::Utc::now();
        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(cached.preferred_username.clone()),
            username_lower: Set(cached.preferred_username.to_lowercase()),
            host: Set(Some(host)),
            uri: Set(Some(cached.id.clone())),
            name: Set(cached.name.clone()),
            description: Set(cached.summary.clone()),
            avatar_url: Set(cached.icon.clone()),
            banner_url: Set(cached.image.clone()),
            timezone: Set("UTC".to_string()),
            followers_count: Set(0),
            following_count: Set(0),
            events_count: Set(0),
            is_locked: Set(false),
            inbox: Set(Some(cached.inbox.clone())),
            shared_inbox: Set(cached.shared_inbox.clone()),
            last_fetched_at: Set(Some(now.into())),
            created_at: Set(now.into()),
            updated_at: Set(Some(now.into())),
        };

        let persisted = self.user_repo.upsert_remote_by_uri(model).await?;
        Ok(Some(persisted))
    }

    /// Resolve an actor and return its inbox for delivery, preferring the
    /// shared inbox over the per-actor inbox.
    pub async fn resolve_inbox(&self, actor_url: &str) -> fedevents_common::AppResult<Option<String>> {
        let Some(user) = self.resolve(actor_url).await? else {
            return Ok(None);
        };
        Ok(user.shared_inbox.or(user.inbox))
    }
}

/// Build the `Person` document for a local user (served at `GET /users/<username>`).
#[must_use]
pub fn local_actor_document(
    user: &user::Model,
    url_config: &UrlConfig,
    public_key_pem: Option<&str>,
) -> Value {
    let actor_url = url_config.user_url(&user.username);

    let mut doc = json!({
        "@context": [
            "https://www.w3.org/ns/activitystreams",
            "https://w3id.org/security/v1",
        ],
        "id": actor_url.to_string(),
        "type": "Person",
        "preferredUsername": user.username,
        "name": user.name,
        "summary": user.description,
        "inbox": url_config.inbox_url(&user.username).to_string(),
        "outbox": url_config.outbox_url(&user.username).to_string(),
        "followers": url_config.followers_url(&user.username).to_string(),
        "following": url_config.following_url(&user.username).to_string(),
        "endpoints": { "sharedInbox": url_config.shared_inbox_url().to_string() },
    });

    if let Some(ref avatar) = user.avatar_url {
        doc["icon"] = json!({ "type": "Image", "url": avatar });
    }
    if let Some(ref banner) = user.banner_url {
        doc["image"] = json!({ "type": "Image", "url": banner });
    }
    if let Some(pem) = public_key_pem {
        doc["publicKey"] = json!({
            "id": url_config.key_id(&user.username),
            "owner": actor_url.to_string(),
            "publicKeyPem": pem,
        });
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_user() -> user::Model {
        user::Model {
            id: "u1".to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            host: None,
            uri: None,
            name: Some("Alice".to_string()),
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

    #[test]
    fn local_actor_document_has_inbox_and_outbox() {
        let config = UrlConfig::new(Url::parse("https://this.host").unwrap());
        let doc = local_actor_document(&test_user(), &config, Some("PEM"));
        assert_eq!(doc["type"], "Person");
        assert_eq!(doc["inbox"], "https://this.host/users/alice/inbox");
        assert_eq!(doc["publicKey"]["publicKeyPem"], "PEM");
    }
}
