//! LibraryEntry entity - one locally mirrored entry of a remote list.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::entry_key::EntryKey;
use crate::entity::list_type::ListType;
use crate::platform::LibraryItem;

/// LibraryEntry model - written only by the reconciler.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "library_entries")]
pub struct Model {
    /// Internal UUID primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // ─── Identity ────────────────────────────────────────────────────────────
    /// Canonical [`EntryKey`] string; upserts conflict on it.
    #[sea_orm(unique)]
    pub entry_key: String,
    /// Owning list.
    pub list_type: ListType,
    /// Catalog release id.
    pub release_id: i64,
    /// Collection instance id (absent for wantlist entries).
    pub instance_id: Option<i64>,

    // ─── Display ─────────────────────────────────────────────────────────────
    pub title: String,
    pub artist: String,
    pub year: Option<i32>,
    pub format: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub thumb_url: Option<String>,

    // ─── Organisation ────────────────────────────────────────────────────────
    /// Collection folder holding this copy.
    pub folder_id: Option<i64>,
    /// User rating, 0-5.
    pub rating: Option<i16>,
    /// Position in the remote list at the last sync.
    pub position: Option<i32>,
    /// When the entry was added remotely.
    pub date_added: Option<DateTimeWithTimeZone>,

    // ─── Tracking ────────────────────────────────────────────────────────────
    /// When this record was last written by a sync.
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Build a model from a fetched list item.
    pub fn from_item(
        list_type: ListType,
        item: &LibraryItem,
        position: Option<i32>,
        updated_at: DateTimeWithTimeZone,
    ) -> Self {
        let instance_id = if list_type.has_instances() {
            item.instance_id
        } else {
            None
        };
        let key = EntryKey::new(list_type, item.release_id, instance_id);

        Self {
            id: Uuid::new_v4(),
            entry_key: key.storage_key(),
            list_type,
            release_id: item.release_id as i64,
            instance_id: instance_id.map(|i| i as i64),
            title: item.title.clone(),
            artist: item.artist.clone(),
            year: item.year,
            format: item.format.clone(),
            thumb_url: item.thumb_url.clone(),
            folder_id: item.folder_id.map(|f| f as i64),
            rating: item.rating.map(i16::from),
            position,
            date_added: item.date_added,
            updated_at,
        }
    }

    /// Identity of this entry.
    pub fn key(&self) -> EntryKey {
        EntryKey::new(
            self.list_type,
            self.release_id as u64,
            self.instance_id.map(|i| i as u64),
        )
    }
}
