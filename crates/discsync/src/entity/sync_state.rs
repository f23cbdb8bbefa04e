//! SyncState entity - one record per list type, written when a sync completes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::list_type::ListType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sync_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// List this record describes (unique).
    #[sea_orm(unique)]
    pub list_type: ListType,
    /// When the last completed sync finished.
    pub last_refreshed_at: DateTimeWithTimeZone,
    /// Entries confirmed by that sync.
    pub item_count: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
