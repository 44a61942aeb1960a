//! Stable URL construction for the instance's external, federation-facing
//! endpoints (actor, inbox, outbox, followers, following, events).

use url::Url;

/// Builds the fixed-shape URLs this instance publishes and accepts.
#[derive(Clone)]
pub struct UrlConfig {
    pub base_url: Url,
}

impl UrlConfig {
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn join(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .expect("base_url joins to a valid path")
    }

    #[must_use]
    pub fn user_url(&self, username: &str) -> Url {
        self.join(&format!("/users/{username}"))
    }

    #[must_use]
    pub fn key_id(&self, username: &str) -> String {
        format!("{}#main-key", self.user_url(username))
    }

    #[must_use]
    pub fn inbox_url(&self, username: &str) -> Url {
        self.join(&format!("/users/{username}/inbox"))
    }

    #[must_use]
    pub fn shared_inbox_url(&self) -> Url {
        self.join("/inbox")
    }

    #[must_use]
    pub fn outbox_url(&self, username: &str) -> Url {
        self.join(&format!("/users/{username}/outbox"))
    }

    #[must_use]
    pub fn followers_url(&self, username: &str) -> Url {
        self.join(&format!("/users/{username}/followers"))
    }

    #[must_use]
    pub fn following_url(&self, username: &str) -> Url {
        self.join(&format!("/users/{username}/following"))
    }

    #[must_use]
    pub fn event_url(&self, event_id: &str) -> Url {
        self.join(&format!("/events/{event_id}"))
    }

    /// Whether `actor_url` identifies a local user, returning its username.
    #[must_use]
    pub fn local_username(&self, actor_url: &str) -> Option<String> {
        let url = Url::parse(actor_url).ok()?;
        if url.scheme() != self.base_url.scheme() || url.host_str() != self.base_url.host_str() {
            return None;
        }
        url.path_segments()?
            .collect::<Vec<_>>()
            .as_slice()
            .split_first()
            .and_then(|(first, rest)| {
                (*first == "users" && rest.len() == 1).then(|| rest[0].to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_username_matches_same_origin_user_path() {
        let config = UrlConfig::new(Url::parse("https://this.host").unwrap());
        assert_eq!(
            config.local_username("https://this.host/users/alice"),
            Some("alice".to_string())
        );
    }

    #[test]
    fn local_username_rejects_other_origins() {
        let config = UrlConfig::new(Url::parse("https://this.host").unwrap());
        assert_eq!(config.local_username("https://remote.example/users/bob"), None);
    }
}
