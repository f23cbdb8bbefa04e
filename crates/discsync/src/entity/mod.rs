//! SeaORM entity definitions for the discsync database schema.

pub mod entry_key;
pub mod library_entry;
pub mod list_type;
pub mod prelude;
pub mod sync_state;
