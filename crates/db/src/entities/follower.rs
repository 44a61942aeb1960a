//! Follower entity — a remote (or local) actor's inbound follow of a local
//! user. Paired with [`super::following`], which records the outbound side.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "follower")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The local user being followed.
    pub user_id: String,

    /// `ActivityPub` actor URL of the following actor.
    pub actor_url: String,

    pub inbox_url: String,

    #[sea_orm(nullable)]
    pub shared_inbox_url: Option<String>,

    /// True once this Follow has been accepted (see `autoAcceptFollowers`
    /// and the per-user `is_locked` override).
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
