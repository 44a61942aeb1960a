//! Following entity — a local user's outbound follow of a remote (or local)
//! actor. Paired with [`super::follower`], which records the inbound side.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "following")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The local user doing the following.
    pub user_id: String,

    /// `ActivityPub` actor URL of the followed actor.
    pub actor_url: String,

    /// Cached username of the followed actor, for display without a fetch.
    pub username: String,

    #[sea_orm(nullable)]
    pub host: Option<String>,

    pub inbox_url: String,

    #[sea_orm(nullable)]
    pub shared_inbox_url: Option<String>,

    /// True once the corresponding Accept has been received (or
    /// `autoAcceptFollowers` bypassed the request entirely).
    #[sea_orm(default_value = false)]
    pub accepted: bool,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
