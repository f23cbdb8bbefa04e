//! List synchronization.
//!
//! # Module Structure
//!
//! - [`types`] - Core types: `SyncSummary`, `SyncOptions`, `SyncError`, constants
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`session`] - Active-session tracking: `SessionRegistry`
//! - [`engine`] - The mark-and-sweep `Reconciler`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use discsync::sync::{Reconciler, SyncOptions};
//!
//! let reconciler = Reconciler::new(Arc::new(client), Arc::new(store), SyncOptions::default());
//! for (list_type, result) in reconciler.sync_lists(&ListType::ALL, None, None).await {
//!     match result {
//!         Ok(summary) => println!("{list_type}: {} items", summary.items_fetched),
//!         Err(e) if e.is_cancellation() => {}
//!         Err(e) => eprintln!("{list_type}: {e}"),
//!     }
//! }
//! ```

pub mod engine;
mod progress;
pub mod session;
mod types;

pub use types::{
    DEFAULT_PER_PAGE, MAX_RATE_LIMIT_ATTEMPTS, PageMeta, Result, SyncError, SyncOptions,
    SyncSummary,
};

pub use progress::{ProgressCallback, SyncProgress, emit};

pub use engine::{PageCallback, Reconciler, item_position};
pub use session::{SessionId, SessionRegistry, WriterGuard};
