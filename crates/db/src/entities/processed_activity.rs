//! Processed activity entity — replay-protection ledger for inbound
//! `ActivityPub` activities. Rows are pruned once `expires_at` has passed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "processed_activity")]
pub struct Model {
    /// The activity's own `id` field, as asserted by the sender.
    #[sea_orm(primary_key, auto_increment = false, unique)]
    pub activity_id: String,

    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
