//! Common re-exports for convenient entity usage.

pub use super::entry_key::EntryKey;
pub use super::library_entry::{
    ActiveModel as LibraryEntryActiveModel, Column as LibraryEntryColumn, Entity as LibraryEntry,
    Model as LibraryEntryModel,
};
pub use super::list_type::ListType;
pub use super::sync_state::{
    ActiveModel as SyncStateActiveModel, Column as SyncStateColumn, Entity as SyncState,
    Model as SyncStateModel,
};
