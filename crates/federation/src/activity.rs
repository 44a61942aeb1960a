//! Tagged `ActivityPub` activity documents: the closed activity vocabulary
//! this instance speaks, plus the codec that parses wire JSON into it and
//! builds outbound envelopes back out of it.
//!
//! Replaces a duck-typed `serde_json::Value` dispatch with a closed set of
//! constructors and a parser that returns a normalized [`Activity`] or a
//! structured [`ActivityParseError`]. Builders here only assemble the
//! envelope (id/type/actor/object/addressing); object payloads (Event, Note,
//! Person) are built by their owning module (`actor` for Person, `delivery`
//! for Event/Note) since those need entity-specific fields.

use fedevents_common::IdGenerator;
use fedevents_db::entities::event;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

/// The `as:Public` magic recipient.
pub const PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

/// The closed set of activity types this instance speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Create,
    Update,
    Delete,
    Follow,
    Accept,
    Reject,
    TentativeAccept,
    Like,
    Announce,
    Undo,
}

impl ActivityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Follow => "Follow",
            Self::Accept => "Accept",
            Self::Reject => "Reject",
            Self::TentativeAccept => "TentativeAccept",
            Self::Like => "Like",
            Self::Announce => "Announce",
            Self::Undo => "Undo",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "Create" => Some(Self::Create),
            "Update" => Some(Self::Update),
            "Delete" => Some(Self::Delete),
            "Follow" => Some(Self::Follow),
            "Accept" => Some(Self::Accept),
            "Reject" => Some(Self::Reject),
            "TentativeAccept" => Some(Self::TentativeAccept),
            "Like" => Some(Self::Like),
            "Announce" => Some(Self::Announce),
            "Undo" => Some(Self::Undo),
            _ => None,
        }
    }
}

/// An activity's `object`: either a bare reference URL or an inlined document.
#[derive(Debug, Clone)]
pub enum ObjectRef {
    Url(Url),
    Inline(Value),
}

impl ObjectRef {
    /// The object's `id`, whether it's a bare URL or an inlined document.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self {
            Self::Url(url) => Some(url.to_string()),
            Self::Inline(value) => value
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    /// The object's `type`, if inlined.
    #[must_use]
    pub fn object_type(&self) -> Option<&str> {
        match self {
            Self::Url(_) => None,
            Self::Inline(value) => value.get("type").and_then(Value::as_str),
        }
    }

    #[must_use]
    pub const fn as_inline(&self) -> Option<&Value> {
        match self {
            Self::Inline(value) => Some(value),
            Self::Url(_) => None,
        }
    }
}

/// Normalized `to`/`cc`/`bcc` addressing, always arrays regardless of the
/// scalar-or-array wire representation.
#[derive(Debug, Clone, Default)]
pub struct Addressing {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl Addressing {
    /// Addressing rules by visibility.
    #[must_use]
    pub fn for_visibility(
        visibility: &event::Visibility,
        followers_url: &str,
        private_recipients: &[String],
    ) -> Self {
        match visibility {
            event::Visibility::Public => Self {
                to: vec![PUBLIC.to_string()],
                cc: vec![followers_url.to_string()],
                bcc: vec![],
            },
            event::Visibility::Unlisted => Self {
                to: vec![followers_url.to_string()],
                cc: vec![PUBLIC.to_string()],
                bcc: vec![],
            },
            event::Visibility::Followers => Self {
                to: vec![followers_url.to_string()],
                cc: vec![],
                bcc: vec![],
            },
            event::Visibility::Private => Self {
                to: private_recipients.to_vec(),
                cc: vec![],
                bcc: vec![],
            },
        }
    }

    /// Infer the originating visibility class of an inbound activity from
    /// its normalized addressing, the reverse of [`Self::for_visibility`].
    /// Used by the inbox processor when materializing a remote `Event` — the
    /// wire format carries addressing, not a visibility tag.
    #[must_use]
    pub fn infer_visibility(&self) -> event::Visibility {
        let to_public = self.to.iter().any(|u| u == PUBLIC);
        let cc_public = self.cc.iter().any(|u| u == PUBLIC);
        if to_public {
            event::Visibility::Public
        } else if cc_public {
            event::Visibility::Unlisted
        } else if !self.to.is_empty() {
            event::Visibility::Followers
        } else {
            event::Visibility::Private
        }
    }

    fn merge_field(value: &Value, field: &str) -> Vec<String> {
        match value.get(field) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => vec![],
        }
    }
}

/// A parse or build error for activity documents.
#[derive(Debug, thiserror::Error)]
pub enum ActivityParseError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unrecognized activity type `{0}`")]
    UnknownType(String),
    #[error("field `{0}` is not a valid URL")]
    InvalidUrl(&'static str),
    #[error("object is neither a URL nor an inlined document")]
    InvalidObject,
}

/// A normalized inbound or outbound activity.
#[derive(Debug, Clone)]
pub struct Activity {
    pub id: Url,
    pub kind: ActivityKind,
    pub actor: Url,
    pub object: ObjectRef,
    pub addressing: Addressing,
    pub raw: Value,
}

impl Activity {
    /// Parse a wire-format JSON document into a normalized activity.
    ///
    /// Inbound documents are untyped JSON from a remote server; this is the
    /// single place that turns that dynamic shape into the closed
    /// [`ActivityKind`] set, per the tagged-variant redesign.
    pub fn parse(raw: Value) -> Result<Self, ActivityParseError> {
        let type_str = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ActivityParseError::MissingField("type"))?;
        let kind =
            ActivityKind::from_str(type_str).ok_or_else(|| {
                ActivityParseError::UnknownType(type_str.to_string())
            })?;

        let id_str = raw
            .get("id")
            .and_then(Value::as_str)
            .ok_or(ActivityParseError::MissingField("id"))?;
        let id = Url::parse(id_str).map_err(|_| ActivityParseError::InvalidUrl("id"))?;

        let actor_str = raw
            .get("actor")
            .and_then(Value::as_str)
            .ok_or(ActivityParseError::MissingField("actor"))?;
        let actor =
            Url::parse(actor_str).map_err(|_| ActivityParseError::InvalidUrl("actor"))?;

        let object_value = raw
            .get("object")
            .cloned()
            .ok_or(ActivityParseError::MissingField("object"))?;
        let object = match object_value {
            Value::String(s) => {
                ObjectRef::Url(Url::parse(&s).map_err(|_| ActivityParseError::InvalidUrl("object"))?)
            }
            Value::Object(_) => ObjectRef::Inline(object_value),
            _ => return Err(ActivityParseError::InvalidObject),
        };

        let addressing = Addressing {
            to: Addressing::merge_field(&raw, "to"),
            cc: Addressing::merge_field(&raw, "cc"),
            bcc: Addressing::merge_field(&raw, "bcc"),
        };

        Ok(Self {
            id,
            kind,
            actor,
            object,
            addressing,
            raw,
        })
    }
}

/// Builds outbound activity envelopes. Object payloads are supplied by the
/// caller already serialized — envelope construction is kept separate from
/// object construction, the latter owned by the entity whose action produced it.
#[derive(Clone)]
pub struct ActivityBuilder {
    base_url: Url,
    id_gen: IdGenerator,
}

impl ActivityBuilder {
    #[must_use]
    pub const fn new(base_url: Url) -> Self {
        Self {
            base_url,
            id_gen: IdGenerator::new(),
        }
    }

    fn new_activity_id(&self) -> Url {
        self.base_url
            .join(&format!("/activities/{}", self.id_gen.generate()))
            .expect("base_url joins to a valid activity id")
    }

    fn envelope(
        &self,
        kind: ActivityKind,
        actor_url: &str,
        object: Value,
        addressing: &Addressing,
    ) -> Value {
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": self.new_activity_id().to_string(),
            "type": kind.as_str(),
            "actor": actor_url,
            "object": object,
            "to": addressing.to,
            "cc": addressing.cc,
        })
    }

    /// `Create` wrapping an inline object (Event or Note/comment).
    #[must_use]
    pub fn create(&self, actor_url: &str, object: Value, addressing: &Addressing) -> Value {
        self.envelope(ActivityKind::Create, actor_url, object, addressing)
    }

    /// `Update` wrapping an inline object (Event or Person).
    #[must_use]
    pub fn update(&self, actor_url: &str, object: Value, addressing: &Addressing) -> Value {
        self.envelope(ActivityKind::Update, actor_url, object, addressing)
    }

    /// `Delete` of an object, represented as a Tombstone.
    #[must_use]
    pub fn delete(&self, actor_url: &str, object_id: &str, former_type: &str) -> Value {
        self.envelope(
            ActivityKind::Delete,
            actor_url,
            json!({ "id": object_id, "type": "Tombstone", "formerType": former_type }),
            &Addressing {
                to: vec![PUBLIC.to_string()],
                cc: vec![],
                bcc: vec![],
            },
        )
    }

    /// `Follow` a target actor.
    #[must_use]
    pub fn follow(&self, actor_url: &str, target_actor_url: &str) -> Value {
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": self.new_activity_id().to_string(),
            "type": ActivityKind::Follow.as_str(),
            "actor": actor_url,
            "object": target_actor_url,
        })
    }

    /// `Accept` of an inline inner activity (a Follow, typically).
    #[must_use]
    pub fn accept(&self, actor_url: &str, inner_activity: Value) -> Value {
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": self.new_activity_id().to_string(),
            "type": ActivityKind::Accept.as_str(),
            "actor": actor_url,
            "object": inner_activity,
        })
    }

    /// `Reject` of an inline inner activity.
    #[must_use]
    pub fn reject(&self, actor_url: &str, inner_activity: Value) -> Value {
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": self.new_activity_id().to_string(),
            "type": ActivityKind::Reject.as_str(),
            "actor": actor_url,
            "object": inner_activity,
        })
    }

    /// `TentativeAccept` of an event (maybe-attending RSVP).
    #[must_use]
    pub fn tentative_accept(&self, actor_url: &str, object_id: &str) -> Value {
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": self.new_activity_id().to_string(),
            "type": ActivityKind::TentativeAccept.as_str(),
            "actor": actor_url,
            "object": object_id,
        })
    }

    /// `Like` of an event.
    #[must_use]
    pub fn like(&self, actor_url: &str, object_id: &str) -> Value {
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": self.new_activity_id().to_string(),
            "type": ActivityKind::Like.as_str(),
            "actor": actor_url,
            "object": object_id,
        })
    }

    /// `Announce` (share) of an event, always publicly addressed per the
    /// invariant that shares are PUBLIC.
    #[must_use]
    pub fn announce(&self, actor_url: &str, object_id: &str, followers_url: &str) -> Value {
        self.envelope(
            ActivityKind::Announce,
            actor_url,
            Value::String(object_id.to_string()),
            &Addressing {
                to: vec![PUBLIC.to_string()],
                cc: vec![followers_url.to_string()],
                bcc: vec![],
            },
        )
    }

    /// `Undo` of an inline inner activity (Like, Follow, Accept, TentativeAccept).
    #[must_use]
    pub fn undo(&self, actor_url: &str, inner_activity: Value) -> Value {
        json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": self.new_activity_id().to_string(),
            "type": ActivityKind::Undo.as_str(),
            "actor": actor_url,
            "object": inner_activity,
        })
    }
}

/// Build the `Event` object payload for an outbound Create/Update/Announce.
///
/// `canonical_id` is the wire id to publish under: for a local event this is
/// derived from `baseUrl` at call time (the row itself carries no
/// `external_id`), for a remote one it's the id the event was received under.
#[must_use]
pub fn event_object(model: &event::Model, attributed_to: &str, canonical_id: &str) -> Value {
    let tags: Vec<String> = serde_json::from_value(model.tags.clone()).unwrap_or_default();
    let tag_objects: Vec<Value> = tags
        .into_iter()
        .map(|name| json!({ "type": "Hashtag", "name": format!("#{name}") }))
        .collect();

    let mut object = json!({
        "id": canonical_id,
        "type": "Event",
        "name": model.title,
        "content": model.summary,
        "startTime": model.start_time.to_rfc3339(),
        "endTime": model.end_time.map(|t| t.to_rfc3339()),
        "eventStatus": "EventScheduled",
        "eventAttendanceMode": "MixedEventAttendanceMode",
        "attributedTo": attributed_to,
        "published": model.created_at.to_rfc3339(),
        "updated": model.updated_at.map(|t| t.to_rfc3339()),
        "tag": tag_objects,
    });

    if let Some(ref location) = model.location {
        let mut loc = json!({ "type": "Place", "name": location });
        if let (Some(lat), Some(lon)) = (model.latitude, model.longitude) {
            loc["latitude"] = json!(lat);
            loc["longitude"] = json!(lon);
        }
        object["location"] = loc;
    }

    object
}

/// Build the `Note` object payload for an outbound comment Create.
#[must_use]
pub fn comment_object(
    id: &str,
    content: &str,
    attributed_to: &str,
    in_reply_to: &str,
    published: chrono::DateTime<chrono::Utc>,
) -> Value {
    json!({
        "id": id,
        "type": "Note",
        "content": content,
        "attributedTo": attributed_to,
        "inReplyTo": in_reply_to,
        "published": published.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_unknown_type() {
        let raw = json!({
            "id": "https://remote/activities/1",
            "type": "Arrive",
            "actor": "https://remote/users/bob",
            "object": "https://remote/events/1",
        });
        let err = Activity::parse(raw).unwrap_err();
        assert!(matches!(err, ActivityParseError::UnknownType(t) if t == "Arrive"));
    }

    #[test]
    fn parse_normalizes_scalar_to_into_array() {
        let raw = json!({
            "id": "https://remote/activities/1",
            "type": "Like",
            "actor": "https://remote/users/bob",
            "object": "https://this.host/events/1",
            "to": "https://www.w3.org/ns/activitystreams#Public",
        });
        let activity = Activity::parse(raw).unwrap();
        assert_eq!(activity.addressing.to, vec![PUBLIC.to_string()]);
        assert_eq!(activity.kind, ActivityKind::Like);
    }

    #[test]
    fn parse_accepts_inline_object() {
        let raw = json!({
            "id": "https://remote/activities/2",
            "type": "Create",
            "actor": "https://remote/users/bob",
            "object": { "id": "https://remote/events/2", "type": "Event", "name": "Meetup" },
        });
        let activity = Activity::parse(raw).unwrap();
        assert_eq!(activity.object.object_type(), Some("Event"));
        assert_eq!(activity.object.id().as_deref(), Some("https://remote/events/2"));
    }

    #[test]
    fn infer_visibility_round_trips_public() {
        let addressing = Addressing::for_visibility(&event::Visibility::Public, "https://this.host/users/alice/followers", &[]);
        assert_eq!(addressing.infer_visibility(), event::Visibility::Public);
    }

    #[test]
    fn infer_visibility_round_trips_followers() {
        let addressing = Addressing::for_visibility(&event::Visibility::Followers, "https://this.host/users/alice/followers", &[]);
        assert_eq!(addressing.infer_visibility(), event::Visibility::Followers);
    }

    #[test]
    fn builder_follow_has_no_addressing() {
        let builder = ActivityBuilder::new(Url::parse("https://this.host").unwrap());
        let doc = builder.follow("https://this.host/users/alice", "https://remote/users/bob");
        assert_eq!(doc["type"], "Follow");
        assert!(doc.get("to").is_none());
    }
}
