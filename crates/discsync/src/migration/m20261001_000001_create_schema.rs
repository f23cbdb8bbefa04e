//! Initial migration to create the discsync database schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_library_entries(manager).await?;
        self.create_sync_states(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SyncStates::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LibraryEntries::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_library_entries(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LibraryEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LibraryEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    // Identity
                    .col(
                        ColumnDef::new(LibraryEntries::EntryKey)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(LibraryEntries::ListType).string().not_null())
                    .col(
                        ColumnDef::new(LibraryEntries::ReleaseId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LibraryEntries::InstanceId)
                            .big_integer()
                            .null(),
                    )
                    // Display
                    .col(ColumnDef::new(LibraryEntries::Title).string().not_null())
                    .col(ColumnDef::new(LibraryEntries::Artist).string().not_null())
                    .col(ColumnDef::new(LibraryEntries::Year).integer().null())
                    .col(ColumnDef::new(LibraryEntries::Format).string().null())
                    .col(ColumnDef::new(LibraryEntries::ThumbUrl).text().null())
                    // Organisation
                    .col(
                        ColumnDef::new(LibraryEntries::FolderId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(LibraryEntries::Rating).small_integer().null())
                    .col(ColumnDef::new(LibraryEntries::Position).integer().null())
                    .col(
                        ColumnDef::new(LibraryEntries::DateAdded)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Tracking
                    .col(
                        ColumnDef::new(LibraryEntries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index on list_type, used by every key scan and sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_library_entries_list_type")
                    .table(LibraryEntries::Table)
                    .col(LibraryEntries::ListType)
                    .to_owned(),
            )
            .await?;

        // Composite index on (list_type, release_id) for membership checks
        manager
            .create_index(
                Index::create()
                    .name("idx_library_entries_list_release")
                    .table(LibraryEntries::Table)
                    .col(LibraryEntries::ListType)
                    .col(LibraryEntries::ReleaseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_sync_states(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SyncStates::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncStates::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(SyncStates::ListType)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SyncStates::LastRefreshedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SyncStates::ItemCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "library_entries")]
enum LibraryEntries {
    Table,
    Id,
    EntryKey,
    ListType,
    ReleaseId,
    InstanceId,
    Title,
    Artist,
    Year,
    Format,
    ThumbUrl,
    FolderId,
    Rating,
    Position,
    DateAdded,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "sync_states")]
enum SyncStates {
    Table,
    Id,
    ListType,
    LastRefreshedAt,
    ItemCount,
}
