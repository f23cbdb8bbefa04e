use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::entity::entry_key::EntryKey;
use crate::entity::library_entry::{self, Column, Entity as LibraryEntry};
use crate::entity::list_type::ListType;
use crate::entity::sync_state::{self, Entity as SyncState};
use crate::retry::{RetryConfig, with_retry};

use super::RecordStore;
use super::errors::{Result, StoreError};

/// Rows per INSERT statement; keeps bind parameters under SQLite's limit.
const UPSERT_CHUNK_SIZE: usize = 50;
/// Keys per DELETE statement.
const DELETE_CHUNK_SIZE: usize = 500;

/// [`RecordStore`] backed by a sea-orm connection (SQLite or Postgres).
#[derive(Debug)]
pub struct SqlRecordStore {
    db: DatabaseConnection,
    retry: RetryConfig,
}

impl SqlRecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry policy for transient database errors.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The underlying connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn upsert_once(&self, entries: &[library_entry::Model]) -> Result<u64> {
        let txn = self.db.begin().await?;

        for chunk in entries.chunks(UPSERT_CHUNK_SIZE) {
            LibraryEntry::insert_many(chunk.iter().cloned().map(library_entry::ActiveModel::from))
                .on_conflict(build_entry_on_conflict())
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(entries.len() as u64)
    }

    async fn sweep_once(
        &self,
        list_type: ListType,
        stale: &[EntryKey],
        refreshed_at: DateTime<FixedOffset>,
        item_count: u64,
    ) -> Result<u64> {
        let txn = self.db.begin().await?;

        let mut deleted = 0u64;
        for chunk in stale.chunks(DELETE_CHUNK_SIZE) {
            let result = LibraryEntry::delete_many()
                .filter(Column::ListType.eq(list_type))
                .filter(Column::EntryKey.is_in(chunk.iter().map(EntryKey::storage_key)))
                .exec(&txn)
                .await?;
            deleted += result.rows_affected;
        }

        let state = sync_state::ActiveModel {
            id: Set(Uuid::new_v4()),
            list_type: Set(list_type),
            last_refreshed_at: Set(refreshed_at),
            item_count: Set(item_count as i64),
        };
        SyncState::insert(state)
            .on_conflict(
                OnConflict::column(sync_state::Column::ListType)
                    .update_columns([
                        sync_state::Column::LastRefreshedAt,
                        sync_state::Column::ItemCount,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        txn.commit().await?;
        Ok(deleted)
    }
}

/// Build the ON CONFLICT clause used by entry upserts.
///
/// Conflict detection uses the canonical entry key; every other column is
/// refreshed from the incoming row except the primary key.
pub(crate) fn build_entry_on_conflict() -> OnConflict {
    OnConflict::column(Column::EntryKey)
        .update_columns([
            Column::ListType,
            Column::ReleaseId,
            Column::InstanceId,
            Column::Title,
            Column::Artist,
            Column::Year,
            Column::Format,
            Column::ThumbUrl,
            Column::FolderId,
            Column::Rating,
            Column::Position,
            Column::DateAdded,
            Column::UpdatedAt,
        ])
        .to_owned()
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn upsert_entries(&self, entries: Vec<library_entry::Model>) -> Result<u64> {
        if entries.is_empty() {
            return Ok(0);
        }

        tracing::debug!(count = entries.len(), "Upserting library entries");
        with_retry(
            || self.upsert_once(&entries),
            StoreError::is_transient,
            self.retry.clone(),
            "upsert entries",
        )
        .await
    }

    async fn keys_for(&self, list_type: ListType) -> Result<HashSet<EntryKey>> {
        let raw: Vec<String> = with_retry(
            || async {
                LibraryEntry::find()
                    .select_only()
                    .column(Column::EntryKey)
                    .filter(Column::ListType.eq(list_type))
                    .into_tuple::<String>()
                    .all(&self.db)
                    .await
                    .map_err(StoreError::from)
            },
            StoreError::is_transient,
            self.retry.clone(),
            "load entry keys",
        )
        .await?;

        raw.into_iter()
            .map(|key| EntryKey::parse(&key).ok_or(StoreError::InvalidKey { key }))
            .collect()
    }

    async fn entries_for(&self, list_type: ListType) -> Result<Vec<library_entry::Model>> {
        let entries = LibraryEntry::find()
            .filter(Column::ListType.eq(list_type))
            .order_by_asc(Column::Position)
            .order_by_asc(Column::EntryKey)
            .all(&self.db)
            .await?;
        Ok(entries)
    }

    async fn count_for(&self, list_type: ListType) -> Result<u64> {
        let count = LibraryEntry::find()
            .filter(Column::ListType.eq(list_type))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn find_release(
        &self,
        list_type: ListType,
        release_id: u64,
    ) -> Result<Vec<library_entry::Model>> {
        let entries = LibraryEntry::find()
            .filter(Column::ListType.eq(list_type))
            .filter(Column::ReleaseId.eq(release_id as i64))
            .order_by_asc(Column::InstanceId)
            .all(&self.db)
            .await?;
        Ok(entries)
    }

    async fn sweep(
        &self,
        list_type: ListType,
        stale: &[EntryKey],
        refreshed_at: DateTime<FixedOffset>,
        item_count: u64,
    ) -> Result<u64> {
        let deleted = with_retry(
            || self.sweep_once(list_type, stale, refreshed_at, item_count),
            StoreError::is_transient,
            self.retry.clone(),
            "sweep entries",
        )
        .await?;

        tracing::debug!(%list_type, deleted, item_count, "Swept stale entries");
        Ok(deleted)
    }

    async fn sync_state(&self, list_type: ListType) -> Result<Option<sync_state::Model>> {
        let state = SyncState::find()
            .filter(sync_state::Column::ListType.eq(list_type))
            .one(&self.db)
            .await?;
        Ok(state)
    }
}
