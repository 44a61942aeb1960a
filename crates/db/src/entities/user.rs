//! User entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    pub username_lower: String,

    /// NULL = local user, Some(host) = remote user.
    #[sea_orm(nullable)]
    pub host: Option<String>,

    /// `ActivityPub` actor URL. Required for remote users, absent for local ones.
    #[sea_orm(unique, nullable)]
    pub uri: Option<String>,

    /// Display name.
    #[sea_orm(nullable)]
    pub name: Option<String>,

    /// Profile summary.
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    #[sea_orm(nullable)]
    pub avatar_url: Option<String>,

    #[sea_orm(nullable)]
    pub banner_url: Option<String>,

    /// IANA timezone id, e.g. "America/New_York".
    #[sea_orm(default_value = "UTC")]
    pub timezone: String,

    /// Followers count (denormalized).
    #[sea_orm(default_value = 0)]
    pub followers_count: i32,

    /// Following count (denormalized).
    #[sea_orm(default_value = 0)]
    pub following_count: i32,

    /// Events authored (denormalized).
    #[sea_orm(default_value = 0)]
    pub events_count: i32,

    /// Requires explicit Accept before a Follow is recorded as accepted.
    #[sea_orm(default_value = false)]
    pub is_locked: bool,

    /// `ActivityPub` inbox URL (remote users).
    #[sea_orm(nullable)]
    pub inbox: Option<String>,

    /// `ActivityPub` shared inbox URL (remote users).
    #[sea_orm(nullable)]
    pub shared_inbox: Option<String>,

    /// Last time this remote user's actor document was re-fetched.
    #[sea_orm(nullable)]
    pub last_fetched_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event::Entity")]
    Events,

    #[sea_orm(has_one = "super::user_keypair::Entity")]
    Keypair,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl Related<super::user_keypair::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Keypair.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
