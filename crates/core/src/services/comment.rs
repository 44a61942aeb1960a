//! Comment service — create/delete comments, with mention resolution,
//! spec §4.6 and §4.11.

use std::sync::Arc;

use fedevents_common::broadcast::{BroadcastMessage, Broadcaster, MessageType};
use fedevents_common::{AppError, AppResult, IdGenerator};
use fedevents_db::{
    entities::{comment, comment_mention, notification::NotificationType},
    repositories::{CommentMentionRepository, CommentRepository, EventRepository, UserRepository},
};
use fedevents_federation::{comment_object, ActivityBuilder, Addressing, UrlConfig, PUBLIC};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::services::delivery::DeliveryService;
use crate::services::mention::resolve_mentions;
use crate::services::notification::NotificationService;

/// Soft display cap on reply-tree depth (spec §3).
const REPLY_DEPTH_CAP: u32 = 3;

/// Input for creating a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentInput {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    pub in_reply_to_id: Option<String>,
}

/// Comment service.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    mention_repo: CommentMentionRepository,
    event_repo: EventRepository,
    user_repo: UserRepository,
    notifications: NotificationService,
    delivery: Option<DeliveryService>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    activity_builder: ActivityBuilder,
    url_config: UrlConfig,
    id_gen: IdGenerator,
}

impl CommentService {
    #[must_use]
    pub fn new(
        comment_repo: CommentRepository,
        mention_repo: CommentMentionRepository,
        event_repo: EventRepository,
        user_repo: UserRepository,
        notifications: NotificationService,
        url_config: UrlConfig,
    ) -> Self {
        let activity_builder = ActivityBuilder::new(url_config.base_url.clone());
        Self {
            comment_repo,
            mention_repo,
            event_repo,
            user_repo,
            notifications,
            delivery: None,
            broadcaster: None,
            activity_builder,
            url_config,
            id_gen: IdGenerator::new(),
        }
    }

    pub fn set_delivery(&mut self, delivery: DeliveryService) {
        self.delivery = Some(delivery);
    }

    pub fn set_broadcaster(&mut self, broadcaster: Arc<dyn Broadcaster>) {
        self.broadcaster = Some(broadcaster);
    }

    /// Create a comment on `event_id` authored by `user_id`.
    pub async fn create(
        &self,
        user_id: &str,
        event_id: &str,
        input: CreateCommentInput,
    ) -> AppResult<comment::Model> {
        input.validate()?;

        let event = self.event_repo.get_by_id(event_id).await?;
        let author = self.user_repo.get_by_id(user_id).await?;

        if let Some(ref parent_id) = input.in_reply_to_id {
            let parent = self
                .comment_repo
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("comment {parent_id}")))?;
            if parent.event_id != event_id {
                return Err(AppError::BadRequest(
                    "a reply's parent must belong to the same event".to_string(),
                ));
            }
            let depth = self.comment_repo.depth(parent_id, REPLY_DEPTH_CAP).await?;
            if depth >= REPLY_DEPTH_CAP {
                tracing::debug!(parent_id, depth, "reply tree exceeds soft display cap");
            }
        }

        let comment_id = self.id_gen.generate();
        let external_id = self
            .url_config
            .base_url
            .join(&format!("/comments/{comment_id}"))
            .expect("base_url joins to a valid comment id")
            .to_string();
        let attributed_to = self.url_config.user_url(&author.username).to_string();

        let model = comment::ActiveModel {
            id: Set(comment_id.clone()),
            event_id: Set(event_id.to_string()),
            author_id: Set(user_id.to_string()),
            in_reply_to_id: Set(input.in_reply_to_id.clone()),
            content: Set(input.content.clone()),
            external_id: Set(Some(external_id.clone())),
            created_at: Set(chrono::Utc::now().into()),
        };
        let created = self.comment_repo.create(model).await?;
        self.event_repo.increment_comments_count(event_id).await?;

        let mentioned_users = resolve_mentions(&self.user_repo, &input.content).await?;
        for mentioned in &mentioned_users {
            if mentioned.id == user_id {
                continue;
            }
            let mention_model = comment_mention::ActiveModel {
                id: Set(self.id_gen.generate()),
                comment_id: Set(comment_id.clone()),
                mentioned_user_id: Set(mentioned.id.clone()),
                created_at: Set(chrono::Utc::now().into()),
            };
            self.mention_repo.create(mention_model).await?;

            if mentioned.host.is_none() {
                self.notifications
                    .create(
                        &mentioned.id,
                        Some(user_id),
                        NotificationType::Mention,
                        "New mention".to_string(),
                        format!("{} mentioned you in a comment", author.username),
                        Some(serde_json::json!({ "eventId": event_id, "commentId": comment_id })),
                    )
                    .await?;
            }
        }

        if event.user_id != user_id {
            self.notifications
                .create(
                    &event.user_id,
                    Some(user_id),
                    NotificationType::Comment,
                    "New comment".to_string(),
                    format!("{} commented on your event", author.username),
                    Some(serde_json::json!({ "eventId": event_id, "commentId": comment_id })),
                )
                .await?;
        }

        if let Some(ref delivery) = self.delivery {
            let mut inboxes = Vec::new();
            if !event.is_local
                && let Some(owner) = self.user_repo.find_by_id(&event.user_id).await?
            {
                if let Some(inbox) = owner.shared_inbox.or(owner.inbox) {
                    inboxes.push(inbox);
                }
            }
            inboxes.sort();
            inboxes.dedup();

            if !inboxes.is_empty() {
                let event_canonical_id = event
                    .external_id
                    .clone()
                    .unwrap_or_else(|| self.url_config.event_url(&event.id).to_string());
                let object = comment_object(
                    &external_id,
                    &created.content,
                    &attributed_to,
                    &event_canonical_id,
                    chrono::Utc::now(),
                );
                let addressing = Addressing {
                    to: vec![PUBLIC.to_string()],
                    cc: inboxes.clone(),
                    bcc: vec![],
                };
                let activity = self.activity_builder.create(&attributed_to, object, &addressing);
                if let Err(e) = delivery
                    .queue_create_event(user_id, event_id, activity, inboxes)
                    .await
                {
                    tracing::warn!(error = %e, "failed to queue Create activity for comment");
                }
            }
        }

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::all(
                MessageType::CommentCreated,
                serde_json::json!({ "eventId": event_id, "commentId": comment_id }),
            ));
        }

        Ok(created)
    }

    /// Delete a comment, scoped to its author.
    pub async fn delete(&self, user_id: &str, comment_id: &str) -> AppResult<()> {
        let existing = self.comment_repo.get_by_id(comment_id).await?;
        if existing.author_id != user_id {
            return Err(AppError::Forbidden(
                "only the comment's author may delete it".to_string(),
            ));
        }

        self.comment_repo.delete(comment_id).await?;
        self.event_repo.decrement_comments_count(&existing.event_id).await?;

        if let Some(ref broadcaster) = self.broadcaster {
            broadcaster.publish(BroadcastMessage::all(
                MessageType::CommentDeleted,
                serde_json::json!({ "commentId": comment_id, "eventId": existing.event_id }),
            ));
        }

        Ok(())
    }

    /// Comments on an event, oldest first.
    pub async fn list_by_event(&self, event_id: &str) -> AppResult<Vec<comment::Model>> {
        self.comment_repo.find_by_event(event_id).await
    }
}
