//! Mention parsing — spec §4.11.
//!
//! Scans comment text for `@handle` tokens, resolving each to a known
//! `User` row. Resolution failures (unknown local username, unknown
//! remote `username@host` pair) are silently skipped — the comment text is
//! kept verbatim either way, only the mention rows are affected.

use fedevents_db::{entities::user, repositories::UserRepository};
use once_cell::sync::Lazy;
use regex::Regex;

static MENTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@([A-Za-z0-9_\-]+)(?:@([A-Za-z0-9.\-]+))?").expect("static mention regex is valid")
});

/// Extract the raw `(username, host)` pairs referenced in `text`, in order
/// of first appearance, deduplicated.
#[must_use]
pub fn extract_handles(text: &str) -> Vec<(String, Option<String>)> {
    let mut seen = std::collections::HashSet::new();
    let mut handles = Vec::new();
    for capture in MENTION_PATTERN.captures_iter(text) {
        let username = capture[1].to_string();
        let host = capture.get(2).map(|m| m.as_str().to_string());
        let key = (username.to_lowercase(), host.as_ref().map(|h| h.to_lowercase()));
        if seen.insert(key) {
            handles.push((username, host));
        }
    }
    handles
}

/// Resolve the handles mentioned in `text` to known `User` rows, skipping
/// any handle that doesn't resolve to an already-known user. Federated
/// mentions resolve against locally cached remote actors only — this does
/// not perform a fresh webfinger/actor fetch for an unseen handle.
pub async fn resolve_mentions(user_repo: &UserRepository, text: &str) -> fedevents_common::AppResult<Vec<user::Model>> {
    let mut resolved = Vec::new();
    for (username, host) in extract_handles(text) {
        let found = match host {
            None => user_repo.find_local_by_username(&username).await?,
            Some(ref host) => user_repo.find_remote_by_username_and_host(&username, host).await?,
        };
        if let Some(user) = found {
            resolved.push(user);
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_local_and_federated_handles() {
        let handles = extract_handles("hi @alice and @bob@remote.example, see you!");
        assert_eq!(
            handles,
            vec![
                ("alice".to_string(), None),
                ("bob".to_string(), Some("remote.example".to_string())),
            ]
        );
    }

    #[test]
    fn deduplicates_repeated_mentions() {
        let handles = extract_handles("@alice thanks @alice!");
        assert_eq!(handles, vec![("alice".to_string(), None)]);
    }

    #[test]
    fn no_mentions_yields_empty() {
        assert!(extract_handles("just a plain comment").is_empty());
    }
}
