//! HTTP Signature verification middleware for Authorized Fetch.
//!
//! Implements the full inbound verification contract: recompute the body
//! digest and compare against `Digest` (`BAD_DIGEST`), resolve the signing
//! key from the claimed actor (`UNKNOWN_KEY`), verify the signature over the
//! reconstructed signing string (`BAD_SIGNATURE`), and reject a `Date` header
//! outside the accepted clock skew (`STALE`). Body bytes are buffered once
//! here so the digest can be checked, then reattached to the request for the
//! handler underneath.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::Request,
    response::{IntoResponse, Response},
};
use fedevents_common::AppError;
use futures::future::BoxFuture;
use tower::Layer;
use tracing::{debug, warn};

use crate::client::ApClient;
use crate::security::ActivitySecurityChecker;
use crate::signature::{calculate_digest, verify_digest, HttpVerifier};

/// Maximum inbox body size accepted before buffering for digest
/// verification. Generously large for an Activity Streams object graph.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Accepted clock skew between the signed `Date` header and this instance's
/// clock, per the `STALE` verification failure.
const MAX_CLOCK_SKEW_SECS: i64 = 12 * 60 * 60;

/// State required for signature verification.
#[derive(Clone)]
pub struct SignatureVerificationState {
    /// `ActivityPub` client for fetching actor public keys.
    pub ap_client: ApClient,
    /// Whether signature verification is globally required.
    pub require_signatures: bool,
    /// Replay/staleness and per-instance rate-limit checks, when a Redis
    /// connection is configured. `None` disables both (e.g. in tests).
    pub security: Option<ActivitySecurityChecker>,
}

impl SignatureVerificationState {
    /// Create a new signature verification state.
    #[must_use]
    pub const fn new(ap_client: ApClient, require_signatures: bool) -> Self {
        Self {
            ap_client,
            require_signatures,
            security: None,
        }
    }

    /// Attach a security checker for staleness and per-instance rate limiting.
    #[must_use]
    pub fn with_security(mut self, security: ActivitySecurityChecker) -> Self {
        self.security = Some(security);
        self
    }
}

/// Marker type indicating the request signature was verified.
///
/// Can be extracted in handlers via `Extension<SignatureVerified>` to confirm
/// the request was properly signed.
#[derive(Clone, Debug)]
pub struct SignatureVerified {
    /// The actor URL that signed this request.
    pub actor_url: Option<String>,
}

/// Layer for adding signature verification to routes.
#[derive(Clone)]
pub struct SignatureVerificationLayer {
    state: Arc<SignatureVerificationState>,
}

impl SignatureVerificationLayer {
    /// Create a new signature verification layer.
    #[must_use]
    pub fn new(state: SignatureVerificationState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

impl<S> Layer<S> for SignatureVerificationLayer {
    type Service = SignatureVerificationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SignatureVerificationService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Service that verifies HTTP signatures on requests.
#[derive(Clone)]
pub struct SignatureVerificationService<S> {
    inner: S,
    state: Arc<SignatureVerificationState>,
}

impl<S> tower::Service<Request<Body>> for SignatureVerificationService<S>
where
    S: tower::Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        tower::Service::poll_ready(&mut self.inner, cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = self.state.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !state.require_signatures {
                let (parts, body) = req.into_parts();
                let mut req = Request::from_parts(parts, body);
                req.extensions_mut()
                    .insert(SignatureVerified { actor_url: None });
                return tower::Service::call(&mut inner, req).await;
            }

            match verify(&state, req).await {
                Ok(verified_req) => tower::Service::call(&mut inner, verified_req).await,
                Err(err) => Ok(err.into_response()),
            }
        })
    }
}

/// Run the full verification contract, returning the request with its body
/// reattached on success.
async fn verify(state: &SignatureVerificationState, req: Request<Body>) -> Result<Request<Body>, AppError> {
    let (parts, body) = req.into_parts();
    let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            warn!(error = %e, "failed to buffer inbox body");
            AppError::BadRequest("body too large or unreadable".to_string())
        })?;

    let digest_header = parts
        .headers
        .get("digest")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::BadDigest)?;
    if !verify_digest(&body_bytes, digest_header) {
        warn!("body digest did not match Digest header");
        return Err(AppError::BadDigest);
    }

    let signature_header = parts
        .headers
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("missing Signature header on request requiring authorization");
            AppError::BadSignature
        })?;

    let components = HttpVerifier::parse_signature_header(signature_header).map_err(|e| {
        warn!(error = %e, "invalid signature header format");
        AppError::BadSignature
    })?;

    let actor_url = extract_actor_url(&components.key_id);

    let public_key_pem = fetch_public_key(&state.ap_client, &components.key_id)
        .await
        .map_err(|e| {
            warn!(error = %e, key_id = %components.key_id, "failed to resolve signing key");
            AppError::UnknownKey
        })?;

    let method = parts.method.as_str();
    let path = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), std::string::ToString::to_string);
    let headers_map = build_headers_map(&parts.headers, method, &path, &components.headers);

    match HttpVerifier::verify(&public_key_pem, &components, method, &path, &headers_map) {
        Ok(true) => {}
        Ok(false) => {
            warn!(actor = ?actor_url, "signature verification failed");
            return Err(AppError::BadSignature);
        }
        Err(e) => {
            warn!(error = %e, "signature verification error");
            return Err(AppError::BadSignature);
        }
    }

    if let Some(date_header) = parts.headers.get("date").and_then(|v| v.to_str().ok()) {
        check_staleness(date_header)?;
        if let (Some(security), Some(actor)) = (&state.security, &actor_url) {
            check_rate_limit(security, actor).await?;
        }
    } else {
        warn!("missing Date header on signed request");
        return Err(AppError::Stale);
    }

    debug!(actor = ?actor_url, "signature verified");
    let mut req = Request::from_parts(parts, Body::from(body_bytes));
    req.extensions_mut().insert(SignatureVerified { actor_url });
    Ok(req)
}

/// Reject a `Date` header outside the accepted clock skew.
fn check_staleness(date_header: &str) -> Result<(), AppError> {
    let signed_at = crate::security::parse_http_date(date_header).map_err(|e| {
        warn!(date = %date_header, error = %e, "unparseable Date header");
        AppError::Stale
    })?;

    let skew = (chrono::Utc::now() - signed_at).num_seconds().abs();
    if skew > MAX_CLOCK_SKEW_SECS {
        warn!(skew_secs = skew, max_secs = MAX_CLOCK_SKEW_SECS, "Date header outside accepted clock skew");
        return Err(AppError::Stale);
    }
    Ok(())
}

/// Per-source-instance rate limiting, ambient hardening against a single
/// remote instance flooding the inbox. Never blocks on a legitimate actor's
/// own signature/digest failures, only on request volume from its host.
async fn check_rate_limit(security: &ActivitySecurityChecker, actor_url: &str) -> Result<(), AppError> {
    let Ok(url) = url::Url::parse(actor_url) else {
        return Ok(());
    };
    let Some(host) = url.host_str() else {
        return Ok(());
    };
    security.rate_limiter().check(host).await.map_err(|e| {
        warn!(instance = %host, error = %e, "federation rate limit exceeded");
        AppError::RateLimited
    })?;
    Ok(())
}

/// Extract actor URL from `key_id` (removes the `#main-key` fragment).
fn extract_actor_url(key_id: &str) -> Option<String> {
    key_id.split('#').next().map(String::from)
}

/// Fetch actor's public key from the `key_id` URL.
async fn fetch_public_key(ap_client: &ApClient, key_id: &str) -> Result<String, String> {
    let actor_url = extract_actor_url(key_id).ok_or_else(|| "Invalid key_id format".to_string())?;

    let actor_json = ap_client
        .fetch_actor(&actor_url)
        .await
        .map_err(|e| format!("Failed to fetch actor: {e}"))?;

    let public_key = actor_json
        .get("publicKey")
        .ok_or_else(|| "Actor missing publicKey".to_string())?;

    let public_key_pem = public_key
        .get("publicKeyPem")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Actor missing publicKeyPem".to_string())?;

    Ok(public_key_pem.to_string())
}

/// Build headers map for signature verification.
fn build_headers_map(
    headers: &axum::http::HeaderMap,
    method: &str,
    path: &str,
    signed_headers: &[String],
) -> HashMap<String, String> {
    let mut out = HashMap::new();

    for header_name in signed_headers {
        let value = if header_name == "(request-target)" {
            format!("{} {path}", method.to_lowercase())
        } else if let Some(value) = headers.get(header_name.as_str()) {
            value.to_str().unwrap_or("").to_string()
        } else {
            continue;
        };

        out.insert(header_name.clone(), value);
    }

    out
}

/// Whether a user requires authorized fetch based on their profile settings.
#[must_use]
pub const fn user_requires_authorized_fetch(secure_fetch_only: bool) -> bool {
    secure_fetch_only
}

/// Whether an instance requires authorized fetch.
#[must_use]
pub const fn instance_requires_authorized_fetch(require_authorized_fetch: bool) -> bool {
    require_authorized_fetch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_date_header_passes_staleness_check() {
        let now = chrono::Utc::now().to_rfc2822();
        assert!(check_staleness(&now).is_ok());
    }

    #[test]
    fn date_header_skewed_13_hours_is_stale() {
        let skewed = (chrono::Utc::now() - chrono::Duration::hours(13)).to_rfc2822();
        assert!(matches!(check_staleness(&skewed), Err(AppError::Stale)));
    }

    #[test]
    fn unparseable_date_header_is_stale() {
        assert!(matches!(check_staleness("not a date"), Err(AppError::Stale)));
    }

    #[test]
    fn extract_actor_url_strips_fragment() {
        assert_eq!(
            extract_actor_url("https://example.com/users/alice#main-key").as_deref(),
            Some("https://example.com/users/alice")
        );
    }
}
