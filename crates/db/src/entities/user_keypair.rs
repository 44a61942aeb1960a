//! User keypair entity (RSA keys for `ActivityPub` signing).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User keypair for `ActivityPub` HTTP Signatures.
///
/// Every user (local or remote) gets a row once its public key is known: a
/// local user's row is created at registration with both halves, a remote
/// actor's row is created by the actor resolver with `private_key = None`
/// (a remote user has a public key only, never a private key).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user_keypair")]
pub struct Model {
    /// Same as user.id (1:1 relationship)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// RSA public key (PEM format)
    #[sea_orm(column_type = "Text")]
    pub public_key: String,

    /// RSA private key (PEM format). `None` for remote actors.
    #[sea_orm(column_type = "Text", nullable)]
    pub private_key: Option<String>,

    /// Key ID (typically the user's `ActivityPub` ID + #main-key)
    pub key_id: String,

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
