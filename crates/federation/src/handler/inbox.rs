//! Inbox handler for receiving `ActivityPub` activities.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
};
use fedevents_common::broadcast::{BroadcastMessage, Broadcaster, MessageType};
use fedevents_common::{AppError, AppResult, IdGenerator};
use fedevents_db::entities::{attendance, comment, comment_mention, event, follower, like, notification};
use fedevents_db::repositories::{
    AttendanceRepository, CommentMentionRepository, CommentRepository, EventRepository,
    FollowerRepository, FollowingRepository, LikeRepository, NotificationRepository,
    ProcessedActivityRepository, UserKeypairRepository, UserRepository,
};
use sea_orm::Set;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::activity::{Activity, ActivityBuilder, ActivityKind, ObjectRef};
use crate::actor::ActorResolver;
use crate::cache::RemoteActorCache;
use crate::client::ApClient;
use crate::middleware::SignatureVerified;
use crate::urls::UrlConfig;

/// State required for the inbox handler.
#[derive(Clone)]
pub struct InboxState {
    pub user_repo: UserRepository,
    pub keypair_repo: UserKeypairRepository,
    pub event_repo: EventRepository,
    pub attendance_repo: AttendanceRepository,
    pub like_repo: LikeRepository,
    pub comment_repo: CommentRepository,
    pub mention_repo: CommentMentionRepository,
    pub follower_repo: FollowerRepository,
    pub following_repo: FollowingRepository,
    pub processed_repo: ProcessedActivityRepository,
    pub notification_repo: NotificationRepository,
    pub actor_resolver: ActorResolver,
    pub actor_cache: RemoteActorCache,
    pub ap_client: ApClient,
    pub url_config: UrlConfig,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub auto_accept_followers: bool,
    pub processed_activity_ttl_days: i64,
}

/// `POST /users/{username}/inbox` and `POST /inbox` (shared inbox).
///
/// Accepts any activity this instance's vocabulary covers, checks it for
/// replay, verifies the claimed actor matches the HTTP signature, and
/// dispatches it to the handler for its kind. Returns `202 Accepted` once
/// queued for processing; processing failures are logged, not surfaced,
/// since the remote server has no useful recovery action for a 5xx here.
pub async fn inbox_handler(
    State(state): State<InboxState>,
    signature: Option<Extension<SignatureVerified>>,
    body: Bytes,
) -> impl IntoResponse {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "failed to parse inbox body as JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let activity = match Activity::parse(raw) {
        Ok(a) => a,
        Err(e) => {
            warn!(error = %e, "failed to parse activity");
            return StatusCode::BAD_REQUEST;
        }
    };

    info!(kind = ?activity.kind, actor = %activity.actor, "received activity");

    if let Some(Extension(verified)) = &signature
        && let Some(ref signed_actor) = verified.actor_url
        && signed_actor.as_str() != activity.actor.as_str()
    {
        warn!(signed_actor = %signed_actor, claimed_actor = %activity.actor, "actor/signature mismatch");
        return StatusCode::FORBIDDEN;
    }

    match state.processed_repo.exists(activity.id.as_str()).await {
        Ok(true) => {
            info!(activity_id = %activity.id, "duplicate activity, ignoring");
            return StatusCode::ACCEPTED;
        }
        Ok(false) => {}
        Err(e) => {
            error!(error = %e, "failed to check processed-activity ledger");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }

    match dispatch(&state, &activity).await {
        Ok(()) => {
            if let Err(e) = state
                .processed_repo
                .insert(activity.id.as_str(), state.processed_activity_ttl_days)
                .await
            {
                warn!(error = %e, "failed to record processed activity");
            }
            StatusCode::ACCEPTED
        }
        Err(e) if e.is_server_error() => {
            // Transient/internal failure: no ProcessedActivity row, so the
            // sender's retry has a chance of succeeding once it does.
            error!(error = %e, activity_id = %activity.id, kind = ?activity.kind, "internal failure processing activity");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            // Deterministic handler rejection (bad payload, unknown object,
            // actor mismatch, ...): absorb it. Retrying the same activity
            // would only ever fail the same way, so mark it processed to
            // keep the sender from retry-storming us.
            warn!(error = %e, activity_id = %activity.id, kind = ?activity.kind, "rejected activity, marking processed");
            if let Err(e) = state
                .processed_repo
                .insert(activity.id.as_str(), state.processed_activity_ttl_days)
                .await
            {
                warn!(error = %e, "failed to record processed activity");
            }
            StatusCode::ACCEPTED
        }
    }
}

async fn dispatch(state: &InboxState, activity: &Activity) -> AppResult<()> {
    match activity.kind {
        ActivityKind::Follow => handle_follow(state, activity).await,
        ActivityKind::Accept => handle_accept(state, activity).await,
        ActivityKind::Reject => handle_reject(state, activity).await,
        ActivityKind::TentativeAccept => handle_rsvp(state, activity, attendance::AttendanceStatus::Maybe).await,
        ActivityKind::Create => handle_create(state, activity).await,
        ActivityKind::Update => handle_update(state, activity).await,
        ActivityKind::Delete => handle_delete(state, activity).await,
        ActivityKind::Like => handle_like(state, activity).await,
        ActivityKind::Announce => handle_announce(state, activity).await,
        ActivityKind::Undo => handle_undo(state, activity).await,
    }
}

async fn handle_follow(state: &InboxState, activity: &Activity) -> AppResult<()> {
    let Some(target_url) = activity.object.id() else {
        return Err(AppError::BadRequest("Follow missing object".to_string()));
    };
    let Some(username) = state.url_config.local_username(&target_url) else {
        return Err(AppError::BadRequest("Follow target is not local".to_string()));
    };
    let Some(target) = state.user_repo.find_local_by_username(&username).await? else {
        return Err(AppError::UserNotFound(username));
    };

    let Some(sender) = state.actor_resolver.resolve(activity.actor.as_str()).await? else {
        return Err(AppError::Federation("could not resolve follower actor".to_string()));
    };

    if state
        .follower_repo
        .find_by_pair(&target.id, activity.actor.as_str())
        .await?
        .is_none()
    {
        let id_gen = IdGenerator::new();
        let active = follower::ActiveModel {
            id: Set(id_gen.generate()),
            user_id: Set(target.id.clone()),
            actor_url: Set(activity.actor.to_string()),
            inbox_url: Set(sender.inbox.clone().unwrap_or_else(|| format!("{}/inbox", activity.actor))),
            shared_inbox_url: Set(sender.shared_inbox.clone()),
            accepted: Set(state.auto_accept_followers),
            created_at: Set(chrono::Utc::now().into()),
        };
        state.follower_repo.create(active).await?;
        state.user_repo.increment_followers_count(&target.id).await?;
    }

    state
        .notification_repo
        .create(notification::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            user_id: Set(target.id.clone()),
            actor_id: Set(Some(sender.id.clone())),
            notification_type: Set(notification::NotificationType::Follow),
            title: Set(format!("{} started following you", sender.username)),
            body: Set(String::new()),
            data: Set(None),
            is_read: Set(false),
            read_at: Set(None),
            created_at: Set(chrono::Utc::now().into()),
        })
        .await?;

    state.broadcaster.publish(BroadcastMessage::targeted(
        MessageType::NotificationCreated,
        target.id.clone(),
        serde_json::json!({ "type": "follow", "actorId": sender.id }),
    ));

    if state.auto_accept_followers {
        send_accept_for_follow(state, &target, activity).await;
    }

    Ok(())
}

async fn send_accept_for_follow(state: &InboxState, target: &fedevents_db::entities::user::Model, follow: &Activity) {
    let Ok(Some(keypair)) = state.keypair_repo.find_by_user_id(&target.id).await else {
        warn!(user_id = %target.id, "cannot send Accept, local keypair missing");
        return;
    };
    let Some(ref private_key) = keypair.private_key else {
        warn!(user_id = %target.id, "cannot send Accept, keypair has no private key");
        return;
    };
    let Ok(Some(inbox_url)) = state.actor_resolver.resolve_inbox(follow.actor.as_str()).await else {
        warn!(actor = %follow.actor, "cannot send Accept, follower inbox unresolvable");
        return;
    };

    let builder = ActivityBuilder::new(state.url_config.base_url.clone());
    let actor_url = state.url_config.user_url(&target.username).to_string();
    let accept = builder.accept(&actor_url, follow.raw.clone());
    let key_id = state.url_config.key_id(&target.username);

    if let Err(e) = state
        .ap_client
        .deliver(&inbox_url, &accept, private_key, &key_id)
        .await
    {
        warn!(error = %e, actor = %follow.actor, "failed to deliver Accept");
    }
}

async fn handle_accept(state: &InboxState, activity: &Activity) -> AppResult<()> {
    let Some(inner) = activity.object.as_inline() else {
        return Err(AppError::BadRequest("Accept missing inline object".to_string()));
    };
    let Some(follower_actor_url) = inner.get("actor").and_then(Value::as_str) else {
        return Err(AppError::BadRequest("Accept object missing actor".to_string()));
    };
    let Some(username) = state.url_config.local_username(follower_actor_url) else {
        return Err(AppError::BadRequest("Accept does not target a local follower".to_string()));
    };
    let Some(local_user) = state.user_repo.find_local_by_username(&username).await? else {
        return Err(AppError::UserNotFound(username));
    };

    if state
        .following_repo
        .mark_accepted(&local_user.id, activity.actor.as_str())
        .await?
        .is_some()
    {
        state.user_repo.increment_following_count(&local_user.id).await?;
    }

    Ok(())
}

async fn handle_reject(state: &InboxState, activity: &Activity) -> AppResult<()> {
    let Some(inner) = activity.object.as_inline() else {
        return Err(AppError::BadRequest("Reject missing inline object".to_string()));
    };
    let Some(follower_actor_url) = inner.get("actor").and_then(Value::as_str) else {
        return Err(AppError::BadRequest("Reject object missing actor".to_string()));
    };
    let Some(username) = state.url_config.local_username(follower_actor_url) else {
        return Err(AppError::BadRequest("Reject does not target a local follower".to_string()));
    };
    let Some(local_user) = state.user_repo.find_local_by_username(&username).await? else {
        return Err(AppError::UserNotFound(username));
    };

    state
        .following_repo
        .delete_by_pair(&local_user.id, activity.actor.as_str())
        .await?;

    Ok(())
}

async fn handle_rsvp(
    state: &InboxState,
    activity: &Activity,
    status: attendance::AttendanceStatus,
) -> AppResult<()> {
    let Some(object_id) = activity.object.id() else {
        return Err(AppError::BadRequest("RSVP missing object".to_string()));
    };
    let Some(event) = state.event_repo.find_by_external_id(&object_id).await? else {
        return Err(AppError::EventNotFound(object_id));
    };
    let Some(sender) = state.actor_resolver.resolve(activity.actor.as_str()).await? else {
        return Err(AppError::Federation("could not resolve RSVP actor".to_string()));
    };

    let previous_status = state
        .attendance_repo
        .find_by_pair(&event.id, &sender.id)
        .await?
        .map(|a| a.status);

    let activity_id = activity.id.to_string();
    let id_gen = IdGenerator::new();
    state
        .attendance_repo
        .upsert_status(&event.id, &sender.id, status.clone(), Some(activity_id), || id_gen.generate())
        .await?;

    let was_attending = previous_status == Some(attendance::AttendanceStatus::Attending);
    let now_attending = status == attendance::AttendanceStatus::Attending;
    if now_attending && !was_attending {
        state.event_repo.increment_attendance_count(&event.id).await?;
    } else if was_attending && !now_attending {
        state.event_repo.decrement_attendance_count(&event.id).await?;
    }

    state.broadcaster.publish(BroadcastMessage::targeted(
        MessageType::AttendanceUpdated,
        event.user_id.clone(),
        serde_json::json!({ "eventId": event.id, "actorId": sender.id }),
    ));

    Ok(())
}

async fn handle_create(state: &InboxState, activity: &Activity) -> AppResult<()> {
    let ObjectRef::Inline(ref object) = activity.object else {
        return Err(AppError::BadRequest("Create object must be inline".to_string()));
    };

    match object.get("type").and_then(Value::as_str) {
        Some("Event") => handle_create_event(state, activity, object).await,
        Some("Note") => handle_create_note(state, activity, object).await,
        other => {
            warn!(object_type = ?other, "unsupported Create object type, ignoring");
            Ok(())
        }
    }
}

/// Parse `{type: "Hashtag", name: "#foo"}` tag objects into normalized tags.
fn parse_hashtags(object: &Value) -> Vec<String> {
    object
        .get("tag")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|t| t.get("type").and_then(Value::as_str) == Some("Hashtag"))
        .filter_map(|t| t.get("name").and_then(Value::as_str))
        .map(|name| name.trim_start_matches('#').to_lowercase())
        .collect()
}

/// `{type: "Place", name, latitude, longitude}` → `(location, lat, lon)`.
fn parse_location(object: &Value) -> (Option<String>, Option<f64>, Option<f64>) {
    match object.get("location") {
        Some(loc) => (
            loc.get("name").and_then(Value::as_str).map(str::to_string),
            loc.get("latitude").and_then(Value::as_f64),
            loc.get("longitude").and_then(Value::as_f64),
        ),
        None => (None, None, None),
    }
}

async fn handle_create_event(state: &InboxState, activity: &Activity, object: &Value) -> AppResult<()> {
    let external_id = object
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Event missing id".to_string()))?;

    // A Create of an object whose id already exists upserts idempotently.
    if state.event_repo.find_by_external_id(external_id).await?.is_some() {
        return Ok(());
    }

    let Some(author) = state.actor_resolver.resolve(activity.actor.as_str()).await? else {
        return Err(AppError::Federation("could not resolve event author".to_string()));
    };

    let title = object
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Event missing name".to_string()))?
        .to_string();
    let summary = object.get("content").and_then(Value::as_str).map(str::to_string);
    let start_time = object
        .get("startTime")
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .ok_or_else(|| AppError::BadRequest("Event missing valid startTime".to_string()))?;
    let end_time = object
        .get("endTime")
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok());
    let (location, latitude, longitude) = parse_location(object);
    let tags = parse_hashtags(object);

    let id_gen = IdGenerator::new();
    let active = event::ActiveModel {
        id: Set(id_gen.generate()),
        user_id: Set(author.id.clone()),
        external_id: Set(Some(external_id.to_string())),
        attributed_to: Set(activity.actor.to_string()),
        title: Set(title),
        summary: Set(summary),
        location: Set(location),
        latitude: Set(latitude),
        longitude: Set(longitude),
        timezone: Set("UTC".to_string()),
        start_time: Set(start_time.into()),
        end_time: Set(end_time.map(Into::into)),
        recurrence_pattern: Set(None),
        recurrence_end_date: Set(None),
        visibility: Set(activity.addressing.infer_visibility()),
        tags: Set(serde_json::json!(tags)),
        private_recipients: Set(None),
        shared_event_id: Set(None),
        is_local: Set(false),
        likes_count: Set(0),
        attendance_count: Set(0),
        comments_count: Set(0),
        shares_count: Set(0),
        created_at: Set(chrono::Utc::now().into()),
        updated_at: Set(None),
    };
    let created = state.event_repo.create(active).await?;
    state.user_repo.increment_events_count(&author.id).await?;

    state.broadcaster.publish(BroadcastMessage::all(
        MessageType::EventCreated,
        serde_json::json!({ "eventId": created.id }),
    ));

    Ok(())
}

async fn handle_update_event(state: &InboxState, activity: &Activity, object: &Value) -> AppResult<()> {
    let external_id = object
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Event missing id".to_string()))?;

    // An Update to an Event not previously seen is ignored (do not create).
    let Some(existing) = state.event_repo.find_by_external_id(external_id).await? else {
        return Ok(());
    };
    if existing.attributed_to != activity.actor.as_str() {
        return Err(AppError::AuthMismatch);
    }

    let mut active: event::ActiveModel = existing.into();
    if let Some(title) = object.get("name").and_then(Value::as_str) {
        active.title = Set(title.to_string());
    }
    if let Some(content) = object.get("content").and_then(Value::as_str) {
        active.summary = Set(Some(content.to_string()));
    }
    if let Some(start) = object
        .get("startTime")
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
    {
        active.start_time = Set(start.into());
    }
    if object.get("endTime").is_some() {
        active.end_time = Set(object
            .get("endTime")
            .and_then(Value::as_str)
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(Into::into));
    }
    if object.get("location").is_some() {
        let (location, latitude, longitude) = parse_location(object);
        active.location = Set(location);
        active.latitude = Set(latitude);
        active.longitude = Set(longitude);
    }
    if object.get("tag").is_some() {
        active.tags = Set(serde_json::json!(parse_hashtags(object)));
    }
    active.visibility = Set(activity.addressing.infer_visibility());
    active.updated_at = Set(Some(chrono::Utc::now().into()));

    let updated = state.event_repo.update(active).await?;

    state.broadcaster.publish(BroadcastMessage::all(
        MessageType::EventUpdated,
        serde_json::json!({ "eventId": updated.id }),
    ));

    Ok(())
}

async fn handle_create_note(state: &InboxState, activity: &Activity, object: &Value) -> AppResult<()> {
    let external_id = object
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Note missing id".to_string()))?;
    let content = object
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Note missing content".to_string()))?;
    let in_reply_to = object
        .get("inReplyTo")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::BadRequest("Note missing inReplyTo".to_string()))?;

    if state.comment_repo.find_by_external_id(external_id).await?.is_some() {
        return Ok(());
    }

    let Some(author) = state.actor_resolver.resolve(activity.actor.as_str()).await? else {
        return Err(AppError::Federation("could not resolve comment author".to_string()));
    };

    let (event_id, parent_comment_id) =
        if let Some(event) = state.event_repo.find_by_external_id(in_reply_to).await? {
            (event.id, None)
        } else if let Some(parent) = state.comment_repo.find_by_external_id(in_reply_to).await? {
            (parent.event_id, Some(parent.id))
        } else {
            return Err(AppError::BadRequest(format!("inReplyTo target {in_reply_to} not found")));
        };

    let id_gen = IdGenerator::new();
    let comment_id = id_gen.generate();
    let active = comment::ActiveModel {
        id: Set(comment_id.clone()),
        event_id: Set(event_id.clone()),
        author_id: Set(author.id.clone()),
        in_reply_to_id: Set(parent_comment_id),
        content: Set(content.to_string()),
        external_id: Set(Some(external_id.to_string())),
        created_at: Set(chrono::Utc::now().into()),
    };
    state.comment_repo.create(active).await?;
    state.event_repo.increment_comments_count(&event_id).await?;

    for mentioned in object
        .get("tag")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|t| t.get("type").and_then(Value::as_str) == Some("Mention"))
        .filter_map(|t| t.get("href").and_then(Value::as_str))
    {
        let Some(username) = state.url_config.local_username(mentioned) else {
            continue;
        };
        let Some(mentioned_user) = state.user_repo.find_local_by_username(&username).await? else {
            continue;
        };
        state
            .mention_repo
            .create(comment_mention::ActiveModel {
                id: Set(id_gen.generate()),
                comment_id: Set(comment_id.clone()),
                mentioned_user_id: Set(mentioned_user.id.clone()),
                created_at: Set(chrono::Utc::now().into()),
            })
            .await?;
        state
            .notification_repo
            .create(notification::ActiveModel {
                id: Set(id_gen.generate()),
                user_id: Set(mentioned_user.id.clone()),
                actor_id: Set(Some(author.id.clone())),
                notification_type: Set(notification::NotificationType::Mention),
                title: Set(format!("{} mentioned you", author.username)),
                body: Set(content.to_string()),
                data: Set(Some(serde_json::json!({ "commentId": comment_id }))),
                is_read: Set(false),
                read_at: Set(None),
                created_at: Set(chrono::Utc::now().into()),
            })
            .await?;
    }

    state.broadcaster.publish(BroadcastMessage::all(
        MessageType::CommentCreated,
        serde_json::json!({ "eventId": event_id, "commentId": comment_id }),
    ));

    Ok(())
}

async fn handle_update(state: &InboxState, activity: &Activity) -> AppResult<()> {
    match activity.object.object_type() {
        Some("Person") => {
            let _ = state.actor_cache.invalidate(activity.actor.as_str()).await;
            info!(actor = %activity.actor, "invalidated cached actor after Update");
            Ok(())
        }
        Some("Event") => {
            let ObjectRef::Inline(ref object) = activity.object else {
                return Err(AppError::BadRequest("Update object must be inline".to_string()));
            };
            handle_update_event(state, activity, object).await
        }
        other => {
            warn!(object_type = ?other, "unsupported Update object type, ignoring");
            Ok(())
        }
    }
}

async fn handle_delete(state: &InboxState, activity: &Activity) -> AppResult<()> {
    let former_type = activity.object.as_inline().and_then(|o| o.get("formerType")).and_then(Value::as_str);

    if former_type == Some("Person") {
        if let Some(user) = state.user_repo.find_by_uri(activity.actor.as_str()).await? {
            state.user_repo.mark_tombstoned(&user.id).await?;
        }
        return Ok(());
    }

    let Some(object_id) = activity.object.id() else {
        return Ok(());
    };

    if let Some(existing) = state.event_repo.find_by_external_id(&object_id).await? {
        if existing.attributed_to != activity.actor.as_str() {
            return Err(AppError::AuthMismatch);
        }
        state.event_repo.delete(&existing.id).await?;
        state.broadcaster.publish(BroadcastMessage::all(
            MessageType::EventDeleted,
            serde_json::json!({ "eventId": existing.id }),
        ));
        return Ok(());
    }

    if let Some(existing) = state.comment_repo.find_by_external_id(&object_id).await? {
        state.comment_repo.delete(&existing.id).await?;
        state.event_repo.decrement_comments_count(&existing.event_id).await?;
        state.broadcaster.publish(BroadcastMessage::all(
            MessageType::CommentDeleted,
            serde_json::json!({ "commentId": existing.id }),
        ));
    }

    Ok(())
}

async fn handle_like(state: &InboxState, activity: &Activity) -> AppResult<()> {
    let Some(object_id) = activity.object.id() else {
        return Err(AppError::BadRequest("Like missing object".to_string()));
    };
    let Some(event) = state.event_repo.find_by_external_id(&object_id).await? else {
        return Err(AppError::EventNotFound(object_id));
    };
    let Some(sender) = state.actor_resolver.resolve(activity.actor.as_str()).await? else {
        return Err(AppError::Federation("could not resolve liking actor".to_string()));
    };

    if state.like_repo.find_by_pair(&event.id, &sender.id).await?.is_some() {
        return Ok(());
    }

    state
        .like_repo
        .create(like::ActiveModel {
            id: Set(IdGenerator::new().generate()),
            user_id: Set(sender.id.clone()),
            event_id: Set(event.id.clone()),
            external_id: Set(Some(activity.id.to_string())),
            created_at: Set(chrono::Utc::now().into()),
        })
        .await?;
    state.event_repo.increment_likes_count(&event.id).await?;

    state.broadcaster.publish(BroadcastMessage::targeted(
        MessageType::LikeAdded,
        event.user_id.clone(),
        serde_json::json!({ "eventId": event.id, "actorId": sender.id }),
    ));

    Ok(())
}

async fn handle_announce(state: &InboxState, activity: &Activity) -> AppResult<()> {
    let Some(object_id) = activity.object.id() else {
        return Err(AppError::BadRequest("Announce missing object".to_string()));
    };
    let Some(event) = state.event_repo.find_by_external_id(&object_id).await? else {
        return Err(AppError::EventNotFound(object_id));
    };
    let Some(sharer) = state.actor_resolver.resolve(activity.actor.as_str()).await? else {
        return Err(AppError::Federation("could not resolve sharing actor".to_string()));
    };

    // a given actor may have at most one outstanding share per original event
    if state
        .event_repo
        .find_existing_share(&sharer.id, &event.id)
        .await?
        .is_some()
    {
        return Ok(());
    }

    let id_gen = IdGenerator::new();
    let share_active = event::ActiveModel {
        id: Set(id_gen.generate()),
        user_id: Set(sharer.id.clone()),
        external_id: Set(Some(activity.id.to_string())),
        attributed_to: Set(activity.actor.to_string()),
        title: Set(event.title.clone()),
        summary: Set(event.summary.clone()),
        location: Set(event.location.clone()),
        latitude: Set(event.latitude),
        longitude: Set(event.longitude),
        timezone: Set(event.timezone.clone()),
        start_time: Set(event.start_time),
        end_time: Set(event.end_time),
        recurrence_pattern: Set(None),
        recurrence_end_date: Set(None),
        visibility: Set(event::Visibility::Public),
        tags: Set(event.tags.clone()),
        private_recipients: Set(None),
        shared_event_id: Set(Some(event.id.clone())),
        is_local: Set(false),
        likes_count: Set(0),
        attendance_count: Set(0),
        comments_count: Set(0),
        shares_count: Set(0),
        created_at: Set(chrono::Utc::now().into()),
        updated_at: Set(None),
    };
    state.event_repo.create(share_active).await?;
    state.event_repo.increment_shares_count(&event.id).await?;

    state.broadcaster.publish(BroadcastMessage::targeted(
        MessageType::EventShared,
        event.user_id.clone(),
        serde_json::json!({ "eventId": event.id }),
    ));

    Ok(())
}

async fn handle_undo(state: &InboxState, activity: &Activity) -> AppResult<()> {
    let Some(inner) = activity.object.as_inline() else {
        return Err(AppError::BadRequest("Undo missing inline object".to_string()));
    };
    let inner_type = inner.get("type").and_then(Value::as_str);
    let Some(inner_object_id) = inner
        .get("object")
        .and_then(|o| o.as_str().map(str::to_string).or_else(|| o.get("id").and_then(Value::as_str).map(str::to_string)))
    else {
        return Err(AppError::BadRequest("Undo inner activity missing object".to_string()));
    };

    match inner_type {
        Some("Follow") => {
            let Some(username) = state.url_config.local_username(&inner_object_id) else {
                return Ok(());
            };
            let Some(target) = state.user_repo.find_local_by_username(&username).await? else {
                return Ok(());
            };
            if state
                .follower_repo
                .delete_by_pair(&target.id, activity.actor.as_str())
                .await?
            {
                state.user_repo.decrement_followers_count(&target.id).await?;
            }
        }
        Some("Like") => {
            let Some(event) = state.event_repo.find_by_external_id(&inner_object_id).await? else {
                return Ok(());
            };
            let Some(sender) = state.actor_resolver.resolve(activity.actor.as_str()).await? else {
                return Ok(());
            };
            if state.like_repo.delete_by_pair(&event.id, &sender.id).await? {
                state.event_repo.decrement_likes_count(&event.id).await?;
                state.broadcaster.publish(BroadcastMessage::targeted(
                    MessageType::LikeRemoved,
                    event.user_id.clone(),
                    serde_json::json!({ "eventId": event.id, "userId": sender.id }),
                ));
            }
        }
        Some("TentativeAccept") | Some("Accept") => {
            let Some(event) = state.event_repo.find_by_external_id(&inner_object_id).await? else {
                return Ok(());
            };
            let Some(sender) = state.actor_resolver.resolve(activity.actor.as_str()).await? else {
                return Ok(());
            };
            let was_attending = state
                .attendance_repo
                .find_by_pair(&event.id, &sender.id)
                .await?
                .is_some_and(|a| a.status == attendance::AttendanceStatus::Attending);
            if state.attendance_repo.delete_by_pair(&event.id, &sender.id).await? {
                if was_attending {
                    state.event_repo.decrement_attendance_count(&event.id).await?;
                }
                state.broadcaster.publish(BroadcastMessage::targeted(
                    MessageType::AttendanceRemoved,
                    event.user_id.clone(),
                    serde_json::json!({ "eventId": event.id, "userId": sender.id }),
                ));
            }
        }
        other => {
            warn!(inner_type = ?other, "unsupported Undo inner activity type, ignoring");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn activity_parse_feeds_dispatch_match() {
        let raw = json!({
            "id": "https://remote/activities/1",
            "type": "Like",
            "actor": "https://remote/users/bob",
            "object": "https://this.host/events/1",
        });
        let activity = Activity::parse(raw).unwrap();
        assert_eq!(activity.kind, ActivityKind::Like);
    }
}
