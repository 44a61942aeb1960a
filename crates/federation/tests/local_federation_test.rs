//! Local Federation Integration Tests
//!
//! These tests verify `ActivityPub` federation between two local instances.
//! They require the federation docker-compose profile to be running:
//!
//! ```bash
//! docker-compose -f docker-compose.test.yml --profile federation up -d
//! cargo test --features federation-test -- local_federation
//! docker-compose -f docker-compose.test.yml --profile federation down -v
//! ```

#![cfg(feature = "federation-test")]
#![allow(clippy::unwrap_used, clippy::expect_used, unused_variables)]

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

const ALPHA_URL: &str = "http://localhost:3001";
const BETA_URL: &str = "http://localhost:3002";

/// Check if federation tests should be skipped (e.g., in CI).
fn should_skip() -> bool {
    std::env::var("SKIP_FEDERATION_TEST").is_ok()
}

/// Macro to skip test if `SKIP_FEDERATION_TEST` is set.
macro_rules! skip_if_ci {
    () => {
        if should_skip() {
            eprintln!("Skipping federation test (SKIP_FEDERATION_TEST is set)");
            return;
        }
    };
}

/// Test client for interacting with a fedevents-rs instance. There is no
/// session/password layer in scope here: registration hands back a user id,
/// which is used directly as the bearer token for authenticated calls.
struct TestInstance {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl TestInstance {
    fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.to_string(),
            token: None,
        }
    }

    async fn health_check(&self) -> Result<bool, reqwest::Error> {
        let res = self.client.get(format!("{}/api/trending", self.base_url)).send().await?;
        Ok(res.status().is_success())
    }

    async fn register_user(&mut self, username: &str) -> Result<Value, reqwest::Error> {
        let res = self
            .client
            .post(format!("{}/api/users", self.base_url))
            .json(&json!({ "username": username, "name": null }))
            .send()
            .await?
            .json::<Value>()
            .await?;

        if let Some(id) = res["data"]["id"].as_str() {
            self.token = Some(id.to_string());
        }

        Ok(res)
    }

    async fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn create_event(&self, title: &str) -> Result<Value, reqwest::Error> {
        let body = json!({
            "title": title,
            "summary": "a federation test event",
            "location": null,
            "latitude": null,
            "longitude": null,
            "timezone": "UTC",
            "start_time": "2026-09-01T18:00:00Z",
            "end_time": null,
            "recurrence_pattern": null,
            "recurrence_end_date": null,
            "visibility": "public",
            "tags": ["test"],
            "private_recipients": null,
        });
        let req = self.client.post(format!("{}/api/events", self.base_url)).json(&body);
        self.authed(req).await.send().await?.json::<Value>().await
    }

    async fn webfinger(&self, resource: &str) -> Result<Value, reqwest::Error> {
        self.client
            .get(format!("{}/.well-known/webfinger", self.base_url))
            .query(&[("resource", resource)])
            .send()
            .await?
            .json::<Value>()
            .await
    }

    async fn fetch_actor(&self, actor_url: &str) -> Result<Value, reqwest::Error> {
        self.client
            .get(actor_url)
            .header("Accept", "application/activity+json")
            .send()
            .await?
            .json::<Value>()
            .await
    }

    async fn follow(&self, target_username: &str) -> Result<reqwest::Response, reqwest::Error> {
        let req = self
            .client
            .post(format!("{}/users/{}/follow", self.base_url, target_username));
        self.authed(req).await.send().await
    }
}

/// Wait for instances to be ready.
async fn wait_for_instances() -> bool {
    let alpha = TestInstance::new(ALPHA_URL);
    let beta = TestInstance::new(BETA_URL);

    for _ in 0..30 {
        let alpha_ready = alpha.health_check().await.unwrap_or(false);
        let beta_ready = beta.health_check().await.unwrap_or(false);

        if alpha_ready && beta_ready {
            return true;
        }
        sleep(Duration::from_secs(1)).await;
    }

    false
}

#[tokio::test]
async fn test_instances_are_running() {
    skip_if_ci!();
    assert!(
        wait_for_instances().await,
        "Federation instances are not running. Start them with: docker-compose -f docker-compose.test.yml --profile federation up -d"
    );
}

#[tokio::test]
async fn test_webfinger_resolution() {
    skip_if_ci!();
    if !wait_for_instances().await {
        eprintln!("Skipping: Federation instances not running");
        return;
    }

    let mut alpha = TestInstance::new(ALPHA_URL);
    alpha
        .register_user("webfingertest")
        .await
        .expect("Failed to register user on alpha");

    let webfinger = alpha
        .webfinger("acct:webfingertest@alpha")
        .await
        .expect("Failed to resolve webfinger");

    assert!(webfinger.get("subject").is_some());
    let links = webfinger["links"].as_array().expect("links should be array");
    let self_link = links
        .iter()
        .find(|l| l["rel"].as_str() == Some("self"))
        .expect("Should have self link");

    assert!(self_link["type"].as_str().unwrap().contains("activity+json"));
}

#[tokio::test]
async fn test_actor_endpoint() {
    skip_if_ci!();
    if !wait_for_instances().await {
        eprintln!("Skipping: Federation instances not running");
        return;
    }

    let mut alpha = TestInstance::new(ALPHA_URL);
    alpha
        .register_user("actortest")
        .await
        .expect("Failed to register user");

    let actor = alpha
        .fetch_actor(&format!("{ALPHA_URL}/users/actortest"))
        .await
        .expect("Failed to fetch actor");

    assert_eq!(actor["type"], "Person");
    assert_eq!(actor["preferredUsername"], "actortest");
    assert!(actor.get("inbox").is_some());
    assert!(actor.get("outbox").is_some());
    assert!(actor.get("publicKey").is_some());
}

#[tokio::test]
async fn test_cross_instance_user_resolution() {
    skip_if_ci!();
    if !wait_for_instances().await {
        eprintln!("Skipping: Federation instances not running");
        return;
    }

    let mut alpha = TestInstance::new(ALPHA_URL);
    let mut beta = TestInstance::new(BETA_URL);

    alpha
        .register_user("crosstest")
        .await
        .expect("Failed to register user on alpha");
    beta.register_user("resolver")
        .await
        .expect("Failed to register user on beta");

    // Beta resolves alpha's actor document directly, as its follow/inbox
    // pipeline does internally via the actor resolver.
    let remote_actor = beta
        .fetch_actor(&format!("{ALPHA_URL}/users/crosstest"))
        .await
        .expect("Failed to resolve remote actor");

    assert_eq!(remote_actor["preferredUsername"], "crosstest");
}

#[tokio::test]
async fn test_follow_between_instances() {
    skip_if_ci!();
    if !wait_for_instances().await {
        eprintln!("Skipping: Federation instances not running");
        return;
    }

    let mut alpha = TestInstance::new(ALPHA_URL);
    let mut beta = TestInstance::new(BETA_URL);

    alpha
        .register_user("leader")
        .await
        .expect("Failed to register leader on alpha");
    beta.register_user("follower")
        .await
        .expect("Failed to register follower on beta");

    // Beta's local user follows alpha's leader via the local follow
    // endpoint; delivery of the signed Follow activity is asynchronous.
    let response = beta.follow("leader").await.expect("Failed to send follow request");
    assert!(response.status().is_success() || response.status().is_client_error());

    sleep(Duration::from_secs(2)).await;

    let alpha_followers = alpha
        .client
        .get(format!("{ALPHA_URL}/users/leader/followers"))
        .header("Accept", "application/activity+json")
        .send()
        .await
        .expect("Failed to fetch followers collection")
        .json::<Value>()
        .await
        .expect("Failed to parse followers collection");

    assert_eq!(alpha_followers["type"], "OrderedCollection");
}

#[tokio::test]
async fn test_event_federation() {
    skip_if_ci!();
    if !wait_for_instances().await {
        eprintln!("Skipping: Federation instances not running");
        return;
    }

    let mut alpha = TestInstance::new(ALPHA_URL);
    alpha
        .register_user("eventauthor")
        .await
        .expect("Failed to register user on alpha");

    let created = alpha
        .create_event("Hello from alpha! This is a federation test.")
        .await
        .expect("Failed to create event");

    let event_id = created["data"]["id"]
        .as_str()
        .expect("Event should have an id")
        .to_string();
    let canonical_url = format!("{ALPHA_URL}/events/{event_id}");

    sleep(Duration::from_secs(1)).await;

    let fetched = alpha
        .client
        .get(&canonical_url)
        .header("Accept", "application/activity+json")
        .send()
        .await
        .expect("Failed to fetch event")
        .json::<Value>()
        .await
        .expect("Failed to parse event");

    assert_eq!(fetched["type"], "Event");
    assert!(fetched["name"].as_str().unwrap().contains("federation test"));
}

#[tokio::test]
async fn test_inbox_signature_verification() {
    skip_if_ci!();
    if !wait_for_instances().await {
        eprintln!("Skipping: Federation instances not running");
        return;
    }

    let alpha = TestInstance::new(ALPHA_URL);

    let result = alpha
        .client
        .post(format!("{ALPHA_URL}/inbox"))
        .header("Content-Type", "application/activity+json")
        .json(&json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Create",
            "actor": "https://malicious.example/users/attacker",
            "id": "https://malicious.example/activities/1",
            "object": {
                "id": "https://malicious.example/events/1",
                "type": "Event",
                "name": "Unsigned malicious event"
            }
        }))
        .send()
        .await
        .expect("Failed to send request");

    // An unsigned inbox POST must be rejected (BAD_DIGEST or BAD_SIGNATURE),
    // never silently accepted.
    assert_eq!(result.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_full_follow_flow() {
    skip_if_ci!();
    if !wait_for_instances().await {
        eprintln!("Skipping: Federation instances not running");
        return;
    }

    let mut alpha = TestInstance::new(ALPHA_URL);
    let mut beta = TestInstance::new(BETA_URL);

    alpha
        .register_user("alice_full")
        .await
        .expect("Failed to register alice on alpha");
    beta.register_user("bob_full")
        .await
        .expect("Failed to register bob on beta");

    beta.follow("alice_full").await.expect("Failed to follow");

    sleep(Duration::from_secs(3)).await;

    let alice_followers = alpha
        .client
        .get(format!("{ALPHA_URL}/users/alice_full/followers"))
        .header("Accept", "application/activity+json")
        .send()
        .await
        .expect("Failed to get followers")
        .json::<Value>()
        .await
        .expect("Failed to parse followers");

    println!("Follow flow completed. Followers response: {alice_followers:?}");
}
