//! Deliver worker.

use apalis::prelude::*;
use fedevents_db::repositories::UserKeypairRepository;
use fedevents_federation::HttpSigner;
use reqwest::Client;
use std::collections::HashMap;
use tracing::{error, info, warn};
use url::Url;

use crate::jobs::DeliverJob;

/// Context for the deliver worker.
#[derive(Clone)]
pub struct DeliverContext {
    pub keypair_repo: UserKeypairRepository,
    pub http_client: Client,
    pub user_agent: String,
}

impl DeliverContext {
    /// Create a new deliver context.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to build.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(keypair_repo: UserKeypairRepository, user_agent: String) -> Self {
        Self {
            keypair_repo,
            http_client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            user_agent,
        }
    }
}

/// Worker function for delivering activities.
///
/// # Errors
/// Returns an error if the activity delivery fails.
pub async fn deliver_worker(job: DeliverJob, ctx: Data<DeliverContext>) -> Result<(), Error> {
    info!(
        user_id = %job.user_id,
        inbox = %job.inbox,
        "Delivering activity"
    );

    match deliver_activity(&job, &ctx).await {
        Ok(()) => {
            info!(inbox = %job.inbox, "Activity delivered successfully");
            Ok(())
        }
        Err(e) => {
            error!(inbox = %job.inbox, error = %e, "Failed to deliver activity");
            Err(Error::Failed(e.into()))
        }
    }
}

async fn deliver_activity(
    job: &DeliverJob,
    ctx: &DeliverContext,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Get user's keypair
    let keypair = ctx
        .keypair_repo
        .get_by_user_id(&job.user_id)
        .await
        .map_err(|e| format!("Failed to get keypair: {e}"))?;

    // Parse inbox URL
    let inbox_url = Url::parse(&job.inbox)?;

    // Serialize activity
    let body = serde_json::to_vec(&job.activity)?;

    // Sign and build headers
    let private_key = keypair
        .private_key
        .as_deref()
        .ok_or("local keypair missing private key")?;
    let signer = HttpSigner::new(private_key, keypair.key_id.clone())
        .map_err(|e| format!("Failed to load private key: {e}"))?;
    let headers = signer
        .sign_request("POST", &inbox_url, Some(&body), &HashMap::new())
        .map_err(|e| format!("Failed to sign request: {e}"))?;

    // Send request
    let response = ctx
        .http_client
        .post(&job.inbox)
        .headers(headers)
        .header("Content-Type", "application/activity+json")
        .header("Accept", "application/activity+json")
        .header("User-Agent", &ctx.user_agent)
        .body(body)
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        Ok(())
    } else if status.as_u16() == 410 {
        // Gone - remote actor deleted
        warn!(inbox = %job.inbox, "Remote actor gone (410)");
        Ok(())
    } else if status.as_u16() == 408 || status.as_u16() == 429 {
        // Request timeout / rate limited - retry like a server error
        let body = response.text().await.unwrap_or_default();
        Err(format!("Retryable error {status}: {body}").into())
    } else if status.is_client_error() {
        // Client error - don't retry
        let body = response.text().await.unwrap_or_default();
        Err(format!("Client error {status}: {body}").into())
    } else {
        // Server error - retry
        let body = response.text().await.unwrap_or_default();
        Err(format!("Server error {status}: {body}").into())
    }
}
