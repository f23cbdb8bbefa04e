//! Keyed persistence for mirrored list entries.
//!
//! The reconciler talks to storage only through the [`RecordStore`] trait;
//! [`SqlRecordStore`] is the sea-orm implementation.

mod errors;
mod sql;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::entity::entry_key::EntryKey;
use crate::entity::library_entry;
use crate::entity::list_type::ListType;
use crate::entity::sync_state;

pub use errors::{Result, StoreError};
pub use sql::SqlRecordStore;

/// Persistence operations the reconciler needs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or update entries by their entry key. Returns rows written.
    async fn upsert_entries(&self, entries: Vec<library_entry::Model>) -> Result<u64>;

    /// Keys of every stored entry of `list_type`.
    async fn keys_for(&self, list_type: ListType) -> Result<HashSet<EntryKey>>;

    /// Every stored entry of `list_type`, in list order.
    async fn entries_for(&self, list_type: ListType) -> Result<Vec<library_entry::Model>>;

    /// Number of stored entries of `list_type`.
    async fn count_for(&self, list_type: ListType) -> Result<u64>;

    /// Stored entries of `list_type` for one release (several collection copies possible).
    async fn find_release(
        &self,
        list_type: ListType,
        release_id: u64,
    ) -> Result<Vec<library_entry::Model>>;

    /// Delete `stale` entries and record the completed refresh, atomically.
    ///
    /// Returns the number of entries deleted.
    async fn sweep(
        &self,
        list_type: ListType,
        stale: &[EntryKey],
        refreshed_at: DateTime<FixedOffset>,
        item_count: u64,
    ) -> Result<u64>;

    /// Refresh record of `list_type`, if a sync ever completed.
    async fn sync_state(&self, list_type: ListType) -> Result<Option<sync_state::Model>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DbErr, EntityTrait, QueryTrait};

    use crate::db::connect_and_migrate;
    use crate::entity::library_entry::Entity as LibraryEntry;
    use crate::platform::LibraryItem;

    async fn store() -> SqlRecordStore {
        let db = connect_and_migrate("sqlite::memory:")
            .await
            .expect("in-memory database");
        SqlRecordStore::new(db)
    }

    fn entry(
        list_type: ListType,
        release_id: u64,
        instance_id: Option<u64>,
        title: &str,
    ) -> library_entry::Model {
        let item = LibraryItem {
            release_id,
            instance_id,
            title: title.to_string(),
            artist: "Various".to_string(),
            year: None,
            format: None,
            thumb_url: None,
            folder_id: Some(1),
            rating: None,
            date_added: None,
        };
        library_entry::Model::from_item(list_type, &item, None, Utc::now().fixed_offset())
    }

    #[test]
    fn test_store_error_transient_classification() {
        let locked = StoreError::Database(DbErr::Custom("database is locked".to_string()));
        // Custom errors are never retried, even with a matching message.
        assert!(!locked.is_transient());

        let exec = StoreError::Database(DbErr::Exec(sea_orm::RuntimeErr::Internal(
            "database is locked".to_string(),
        )));
        assert!(exec.is_transient());

        let invalid = StoreError::InvalidKey {
            key: "bogus".to_string(),
        };
        assert!(!invalid.is_transient());
    }

    #[test]
    fn test_on_conflict_targets_entry_key() {
        let sql = LibraryEntry::insert(library_entry::ActiveModel::from(entry(
            ListType::Wantlist,
            1,
            None,
            "x",
        )))
        .on_conflict(sql::build_entry_on_conflict())
        .build(sea_orm::DatabaseBackend::Sqlite)
        .to_string();

        assert!(sql.contains("ON CONFLICT (\"entry_key\") DO UPDATE"));
        assert!(!sql.contains("\"id\" = \"excluded\".\"id\""));
    }

    #[tokio::test]
    async fn store_over_mock_connection_is_shared_through_arc() {
        use std::sync::Arc;

        use sea_orm::{DatabaseBackend, MockDatabase};

        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<library_entry::Model>::new()])
            .into_connection();
        let store = Arc::new(SqlRecordStore::new(db));

        let reader = Arc::clone(&store);
        let entries = tokio::spawn(async move { reader.entries_for(ListType::Wantlist).await })
            .await
            .expect("reader task")
            .unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_updates_fields() {
        let store = store().await;

        store
            .upsert_entries(vec![entry(ListType::Collection, 1, Some(10), "Old title")])
            .await
            .unwrap();
        store
            .upsert_entries(vec![entry(ListType::Collection, 1, Some(10), "New title")])
            .await
            .unwrap();

        let entries = store.entries_for(ListType::Collection).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "New title");
    }

    #[tokio::test]
    async fn upsert_empty_batch_is_noop() {
        let store = store().await;
        assert_eq!(store.upsert_entries(Vec::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn keys_are_scoped_by_list_type() {
        let store = store().await;
        store
            .upsert_entries(vec![
                entry(ListType::Collection, 1, Some(10), "a"),
                entry(ListType::Collection, 1, Some(11), "a"),
                entry(ListType::Wantlist, 2, None, "b"),
            ])
            .await
            .unwrap();

        let keys = store.keys_for(ListType::Collection).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&EntryKey::new(ListType::Collection, 1, Some(11))));

        assert_eq!(store.count_for(ListType::Wantlist).await.unwrap(), 1);
        assert_eq!(
            store.find_release(ListType::Collection, 1).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn sweep_deletes_stale_and_records_state() {
        let store = store().await;
        store
            .upsert_entries(vec![
                entry(ListType::Wantlist, 1, None, "keep"),
                entry(ListType::Wantlist, 2, None, "drop"),
                entry(ListType::Collection, 2, Some(5), "other list"),
            ])
            .await
            .unwrap();

        let refreshed_at = Utc::now().fixed_offset();
        let deleted = store
            .sweep(
                ListType::Wantlist,
                &[EntryKey::new(ListType::Wantlist, 2, None)],
                refreshed_at,
                1,
            )
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.count_for(ListType::Wantlist).await.unwrap(), 1);
        assert_eq!(store.count_for(ListType::Collection).await.unwrap(), 1);

        let state = store.sync_state(ListType::Wantlist).await.unwrap().unwrap();
        assert_eq!(state.item_count, 1);
        assert_eq!(state.last_refreshed_at.timestamp(), refreshed_at.timestamp());
    }

    #[tokio::test]
    async fn repeated_sweeps_update_single_state_record() {
        let store = store().await;
        let first = Utc::now().fixed_offset();
        let second = first + chrono::Duration::minutes(5);

        store.sweep(ListType::Collection, &[], first, 3).await.unwrap();
        store.sweep(ListType::Collection, &[], second, 4).await.unwrap();

        let state = store.sync_state(ListType::Collection).await.unwrap().unwrap();
        assert_eq!(state.last_refreshed_at.timestamp(), second.timestamp());
        assert_eq!(state.item_count, 4);
        assert!(store.sync_state(ListType::Wantlist).await.unwrap().is_none());
    }
}
