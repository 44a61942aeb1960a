//! Federation compatibility tests.
//!
//! Tests that verify the `ActivityPub` documents we produce and parse line up
//! with what other implementations (Mastodon, Pleroma/Akkoma) expect, and
//! that incoming documents from those servers parse correctly here.

use chrono::{TimeZone, Utc};
use fedevents_db::entities::event;
use fedevents_federation::activity::{Activity, ActivityBuilder, ActivityKind, Addressing, comment_object, event_object, PUBLIC};
use serde_json::json;
use url::Url;

fn base_url() -> Url {
    Url::parse("https://example.com").unwrap()
}

fn sample_event() -> event::Model {
    event::Model {
        id: "11111111-1111-1111-1111-111111111111".to_string(),
        user_id: "22222222-2222-2222-2222-222222222222".to_string(),
        external_id: None,
        attributed_to: "https://example.com/users/alice".to_string(),
        title: "Rooftop meetup".to_string(),
        summary: Some("<p>Bring your own chair.</p>".to_string()),
        location: Some("Rooftop bar".to_string()),
        latitude: Some(40.7128),
        longitude: Some(-74.0060),
        timezone: "America/New_York".to_string(),
        start_time: Utc.with_ymd_and_hms(2026, 8, 1, 18, 0, 0).unwrap().into(),
        end_time: Some(Utc.with_ymd_and_hms(2026, 8, 1, 21, 0, 0).unwrap().into()),
        recurrence_pattern: None,
        recurrence_end_date: None,
        visibility: event::Visibility::Public,
        tags: json!(["rust", "meetup"]),
        private_recipients: None,
        shared_event_id: None,
        is_local: true,
        likes_count: 0,
        attendance_count: 0,
        comments_count: 0,
        shares_count: 0,
        created_at: Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap().into(),
        updated_at: None,
    }
}

// =============================================================================
// Mastodon/Pleroma compatible Event object construction
// =============================================================================

mod event_object_compat {
    use super::*;

    /// Mastodon and Pleroma both expect a flat `attributedTo`/`published`
    /// ActivityStreams object with a real `type`.
    #[test]
    fn test_event_has_required_fields() {
        let model = sample_event();
        let object = event_object(&model, "https://example.com/users/alice", "https://example.com/events/11111111-1111-1111-1111-111111111111");

        assert_eq!(object["type"], "Event");
        assert!(object["id"].is_string());
        assert!(object["attributedTo"].is_string());
        assert!(object["published"].is_string());
        assert_eq!(object["name"], "Rooftop meetup");
    }

    /// `startTime`/`endTime` must be RFC 3339 so generic AS2 consumers that
    /// don't know the `Event` type can still display a date.
    #[test]
    fn test_event_times_are_rfc3339() {
        let model = sample_event();
        let object = event_object(&model, "https://example.com/users/alice", "https://example.com/events/11111111-1111-1111-1111-111111111111");

        let start = object["startTime"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(start).is_ok());

        let end = object["endTime"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(end).is_ok());
    }

    /// schema.org-derived `eventStatus`/`eventAttendanceMode` fields, used by
    /// Mastodon's own event-object rendering.
    #[test]
    fn test_event_status_fields_present() {
        let model = sample_event();
        let object = event_object(&model, "https://example.com/users/alice", "https://example.com/events/11111111-1111-1111-1111-111111111111");

        assert_eq!(object["eventStatus"], "EventScheduled");
        assert_eq!(object["eventAttendanceMode"], "MixedEventAttendanceMode");
    }

    /// Location becomes a `Place` object with coordinates when present.
    #[test]
    fn test_event_location_is_place_object() {
        let model = sample_event();
        let object = event_object(&model, "https://example.com/users/alice", "https://example.com/events/11111111-1111-1111-1111-111111111111");

        let location = &object["location"];
        assert_eq!(location["type"], "Place");
        assert_eq!(location["name"], "Rooftop bar");
        assert!((location["latitude"].as_f64().unwrap() - 40.7128).abs() < f64::EPSILON);
    }

    /// Location is omitted entirely when the event has none, rather than a
    /// null/empty `Place`.
    #[test]
    fn test_event_without_location_omits_field() {
        let mut model = sample_event();
        model.location = None;
        model.latitude = None;
        model.longitude = None;
        let object = event_object(&model, "https://example.com/users/alice", "https://example.com/events/11111111-1111-1111-1111-111111111111");

        assert!(object.get("location").is_none());
    }

    /// Tags render as `Hashtag` tag objects, matching Mastodon's hashtag tag format.
    #[test]
    fn test_event_tags_are_hashtag_objects() {
        let model = sample_event();
        let object = event_object(&model, "https://example.com/users/alice", "https://example.com/events/11111111-1111-1111-1111-111111111111");

        let tags = object["tag"].as_array().unwrap();
        assert_eq!(tags.len(), 2);
        for tag in tags {
            assert_eq!(tag["type"], "Hashtag");
            assert!(tag["name"].as_str().unwrap().starts_with('#'));
        }
    }
}

// =============================================================================
// Comment (Note) object construction
// =============================================================================

mod comment_object_compat {
    use super::*;

    /// Comments federate as plain `Note` objects so generic AS2 readers
    /// (Mastodon/Pleroma included) render them without understanding `Event`.
    #[test]
    fn test_comment_is_note_type() {
        let object = comment_object(
            "https://example.com/comments/1",
            "Looking forward to this!",
            "https://example.com/users/bob",
            "https://example.com/events/1",
            Utc::now(),
        );

        assert_eq!(object["type"], "Note");
        assert_eq!(object["inReplyTo"], "https://example.com/events/1");
        assert!(object["published"].is_string());
    }
}

// =============================================================================
// Addressing compatibility: `to`/`cc` semantics other servers rely on
// =============================================================================

mod addressing_compat {
    use super::*;

    /// Public visibility must carry the literal `as:Public` magic value
    /// Mastodon/Pleroma use to decide whether a post is publicly listed.
    #[test]
    fn test_public_visibility_uses_as_public() {
        let addressing = Addressing::for_visibility(
            &event::Visibility::Public,
            "https://example.com/users/alice/followers",
            &[],
        );

        assert!(addressing.to.contains(&PUBLIC.to_string()));
        assert!(addressing.cc.contains(&"https://example.com/users/alice/followers".to_string()));
    }

    /// Unlisted visibility puts followers in `to` and Public in `cc` — the
    /// convention Mastodon itself uses for "quiet public" posts.
    #[test]
    fn test_unlisted_visibility_addressing() {
        let addressing = Addressing::for_visibility(
            &event::Visibility::Unlisted,
            "https://example.com/users/alice/followers",
            &[],
        );

        assert!(addressing.to.contains(&"https://example.com/users/alice/followers".to_string()));
        assert!(addressing.cc.contains(&PUBLIC.to_string()));
    }

    /// Followers-only visibility never includes Public in either field.
    #[test]
    fn test_followers_only_visibility_excludes_public() {
        let addressing = Addressing::for_visibility(
            &event::Visibility::Followers,
            "https://example.com/users/alice/followers",
            &[],
        );

        assert!(!addressing.to.contains(&PUBLIC.to_string()));
        assert!(!addressing.cc.contains(&PUBLIC.to_string()));
    }

    /// Private visibility addresses explicit actor URLs directly, matching
    /// how Mastodon/Pleroma deliver direct messages.
    #[test]
    fn test_private_visibility_addresses_specific_actors() {
        let recipients = vec!["https://example.com/users/carol".to_string()];
        let addressing = Addressing::for_visibility(&event::Visibility::Private, "https://example.com/users/alice/followers", &recipients);

        assert_eq!(addressing.to, recipients);
        assert!(addressing.cc.is_empty());
    }
}

// =============================================================================
// Outbound activity envelopes
// =============================================================================

mod activity_envelopes {
    use super::*;

    /// Every outbound envelope carries the activitystreams context, a
    /// dereferenceable `id`, and a bare actor URL — the fields every
    /// `ActivityPub` implementation checks before doing anything else.
    #[test]
    fn test_create_envelope_has_required_fields() {
        let builder = ActivityBuilder::new(base_url());
        let model = sample_event();
        let object = event_object(&model, "https://example.com/users/alice", "https://example.com/events/11111111-1111-1111-1111-111111111111");
        let addressing = Addressing::for_visibility(&event::Visibility::Public, "https://example.com/users/alice/followers", &[]);

        let envelope = builder.create("https://example.com/users/alice", object, &addressing);

        assert_eq!(envelope["@context"], "https://www.w3.org/ns/activitystreams");
        assert_eq!(envelope["type"], "Create");
        assert!(envelope["id"].as_str().unwrap().starts_with("https://example.com/activities/"));
        assert_eq!(envelope["actor"], "https://example.com/users/alice");
        assert_eq!(envelope["object"]["type"], "Event");
    }

    /// A `Follow` activity carries no addressing — delivery is always to the
    /// target actor's inbox directly, which Mastodon/Pleroma both expect.
    #[test]
    fn test_follow_envelope_has_no_addressing() {
        let builder = ActivityBuilder::new(base_url());
        let envelope = builder.follow("https://example.com/users/alice", "https://mastodon.social/users/bob");

        assert_eq!(envelope["type"], "Follow");
        assert!(envelope.get("to").is_none());
        assert!(envelope.get("cc").is_none());
    }

    /// `Delete` always publishes a `Tombstone` carrying the `formerType`,
    /// the shape Mastodon/Pleroma expect to process a remote deletion.
    #[test]
    fn test_delete_envelope_wraps_tombstone() {
        let builder = ActivityBuilder::new(base_url());
        let envelope = builder.delete(
            "https://example.com/users/alice",
            "https://example.com/events/1",
            "Event",
        );

        assert_eq!(envelope["type"], "Delete");
        assert_eq!(envelope["object"]["type"], "Tombstone");
        assert_eq!(envelope["object"]["formerType"], "Event");
        assert!(envelope["to"].as_array().unwrap().contains(&json!(PUBLIC)));
    }

    /// `Announce` (share) is always publicly addressed regardless of the
    /// shared object's own visibility.
    #[test]
    fn test_announce_envelope_is_always_public() {
        let builder = ActivityBuilder::new(base_url());
        let envelope = builder.announce(
            "https://example.com/users/alice",
            "https://remote.example/events/9",
            "https://example.com/users/alice/followers",
        );

        assert_eq!(envelope["type"], "Announce");
        assert!(envelope["to"].as_array().unwrap().contains(&json!(PUBLIC)));
    }
}

// =============================================================================
// Incoming activity parsing (what we receive from other servers)
// =============================================================================

mod incoming_parsing {
    use super::*;

    /// Parse a `Create`/`Event` pair shaped the way Mastodon's own event
    /// extension would send it.
    #[test]
    fn test_parse_mastodon_style_create_event() {
        let raw = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "id": "https://mastodon.social/activities/123",
            "type": "Create",
            "actor": "https://mastodon.social/users/alice",
            "object": {
                "id": "https://mastodon.social/events/123",
                "type": "Event",
                "name": "Mastodon meetup",
                "startTime": "2026-09-01T18:00:00Z",
            },
            "to": "https://www.w3.org/ns/activitystreams#Public",
            "cc": ["https://mastodon.social/users/alice/followers"],
        });

        let activity = Activity::parse(raw).unwrap();

        assert_eq!(activity.kind, ActivityKind::Create);
        assert_eq!(activity.object.object_type(), Some("Event"));
        assert_eq!(activity.addressing.to, vec![PUBLIC.to_string()]);
    }

    /// Parse a `Like` from a Pleroma-style instance, where `object` is a bare
    /// URL reference rather than an inlined document.
    #[test]
    fn test_parse_pleroma_style_like() {
        let raw = json!({
            "id": "https://pleroma.example/activities/like1",
            "type": "Like",
            "actor": "https://pleroma.example/users/bob",
            "object": "https://example.com/events/1",
        });

        let activity = Activity::parse(raw).unwrap();

        assert_eq!(activity.kind, ActivityKind::Like);
        assert_eq!(activity.object.id().as_deref(), Some("https://example.com/events/1"));
    }

    /// Parse a `Follow` whose addressing fields are entirely absent, which
    /// both Mastodon and Pleroma omit for this activity type.
    #[test]
    fn test_parse_follow_without_addressing() {
        let raw = json!({
            "id": "https://mastodon.social/activities/follow1",
            "type": "Follow",
            "actor": "https://mastodon.social/users/alice",
            "object": "https://example.com/users/carol",
        });

        let activity = Activity::parse(raw).unwrap();

        assert_eq!(activity.kind, ActivityKind::Follow);
        assert!(activity.addressing.to.is_empty());
        assert!(activity.addressing.cc.is_empty());
    }

    /// An unrecognized activity type is rejected rather than silently
    /// accepted, since we only speak the closed vocabulary.
    #[test]
    fn test_parse_rejects_unknown_activity_type() {
        let raw = json!({
            "id": "https://remote.example/activities/1",
            "type": "Arrive",
            "actor": "https://remote.example/users/bob",
            "object": "https://example.com/events/1",
        });

        let err = Activity::parse(raw).unwrap_err();
        assert!(matches!(err, fedevents_federation::activity::ActivityParseError::UnknownType(t) if t == "Arrive"));
    }

    /// Scalar `to`/`cc` fields (a bare string instead of an array) must
    /// normalize into single-element arrays, since some implementations send
    /// a lone recipient unwrapped.
    #[test]
    fn test_parse_normalizes_scalar_addressing() {
        let raw = json!({
            "id": "https://remote.example/activities/2",
            "type": "Announce",
            "actor": "https://remote.example/users/bob",
            "object": "https://example.com/events/1",
            "to": "https://www.w3.org/ns/activitystreams#Public",
            "cc": "https://remote.example/users/bob/followers",
        });

        let activity = Activity::parse(raw).unwrap();

        assert_eq!(activity.addressing.to, vec![PUBLIC.to_string()]);
        assert_eq!(activity.addressing.cc, vec!["https://remote.example/users/bob/followers".to_string()]);
    }
}
