//! Event entity — the primary authored object of the federation core.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Visibility {
    #[sea_orm(string_value = "public")]
    Public,
    #[sea_orm(string_value = "followers")]
    Followers,
    #[sea_orm(string_value = "unlisted")]
    Unlisted,
    #[sea_orm(string_value = "private")]
    Private,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum RecurrencePattern {
    #[sea_orm(string_value = "daily")]
    Daily,
    #[sea_orm(string_value = "weekly")]
    Weekly,
    #[sea_orm(string_value = "monthly")]
    Monthly,
    #[sea_orm(string_value = "yearly")]
    Yearly,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Authoring user. Local if the user row has no `host`, remote otherwise.
    pub user_id: String,

    /// Canonical `ActivityPub` object id this event was received under, for
    /// events that originated remotely. `None` for local events — their wire
    /// id is derived from `baseUrl` at activity-build time instead of stored.
    #[sea_orm(unique, nullable)]
    pub external_id: Option<String>,

    /// `attributedTo` URL of the authoring actor, as recorded at creation time.
    pub attributed_to: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub summary: Option<String>,

    #[sea_orm(nullable)]
    pub location: Option<String>,

    #[sea_orm(nullable)]
    pub latitude: Option<f64>,

    #[sea_orm(nullable)]
    pub longitude: Option<f64>,

    /// IANA timezone id the start/end times are anchored to.
    pub timezone: String,

    pub start_time: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeWithTimeZone>,

    #[sea_orm(nullable)]
    pub recurrence_pattern: Option<RecurrencePattern>,

    #[sea_orm(nullable)]
    pub recurrence_end_date: Option<DateTimeWithTimeZone>,

    pub visibility: Visibility,

    /// Normalized, deduplicated hashtag list (without the leading `#`).
    pub tags: Json,

    /// Explicit recipient actor URLs for PRIVATE events, used directly as
    /// the `to` list when addressing the outbound activity. `None` for
    /// all other visibility classes.
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub private_recipients: Option<Json>,

    /// Set when this row is a share (Announce) of another event.
    #[sea_orm(nullable)]
    pub shared_event_id: Option<String>,

    #[sea_orm(default_value = true)]
    pub is_local: bool,

    #[sea_orm(default_value = 0)]
    pub likes_count: i32,

    #[sea_orm(default_value = 0)]
    pub attendance_count: i32,

    #[sea_orm(default_value = 0)]
    pub comments_count: i32,

    #[sea_orm(default_value = 0)]
    pub shares_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,

    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendances,

    #[sea_orm(has_many = "super::like::Entity")]
    Likes,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::reminder::Entity")]
    Reminders,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::SharedEventId",
        to = "Column::Id"
    )]
    SharedEvent,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendances.def()
    }
}

impl Related<super::like::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Likes.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::reminder::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reminders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
