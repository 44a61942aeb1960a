//! `ActivityPub` federation for the event/social-action platform.
//!
//! This crate implements the closed slice of `ActivityPub` this instance
//! speaks:
//!
//! - **Activities**: Create, Update, Delete, Follow, Accept, Reject,
//!   TentativeAccept, Like, Announce, Undo
//! - **Actors**: Person actor resolution, caching, and local document
//!   serving
//! - **Codec**: parsing inbound wire JSON into a normalized [`Activity`],
//!   building outbound envelopes back out
//! - **Handlers**: `WebFinger`, actor document, inbox, outbox/followers/
//!   following collections
//! - **Security**: HTTP signatures, replay protection, per-instance rate
//!   limiting
//! - **Delivery**: recipient expansion and shared-inbox collapsing ahead of
//!   the queue crate's signed-delivery workers

pub mod activity;
pub mod actor;
pub mod cache;
pub mod client;
pub mod delivery;
pub mod handler;
pub mod middleware;
pub mod security;
pub mod signature;
pub mod urls;

pub use activity::{
    comment_object, event_object, Activity, ActivityBuilder, ActivityKind, ActivityParseError,
    Addressing, ObjectRef, PUBLIC,
};
pub use actor::{local_actor_document, ActorResolver};
pub use cache::{CacheError, CacheStats, CachedRemoteActor, RemoteActorCache};
pub use client::{ApClient, ApClientError};
pub use delivery::DeliveryPlanner;
pub use handler::*;
pub use middleware::{SignatureVerificationLayer, SignatureVerificationState, SignatureVerified};
pub use security::{
    ActivitySecurityChecker, FederationRateLimiter, RateLimitError, RateLimitStatus, ReplayError,
    ReplayProtection, SecurityCheckResult, SecurityError,
};
pub use signature::{HttpSigner, HttpVerifier, SignatureComponents, SignatureError};
pub use urls::UrlConfig;
