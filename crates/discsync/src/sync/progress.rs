//! Progress reporting types for list syncs.
//!
//! Events are emitted by the reconciler and consumed by the UI (progress
//! bars or log lines).

use crate::entity::list_type::ListType;

/// Progress events emitted during a list sync.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// A session started for a list.
    SyncStarted {
        /// The list being synced.
        list_type: ListType,
    },

    /// A page was fetched and applied to the store.
    FetchedPage {
        /// The list this page belongs to.
        list_type: ListType,
        /// Page number (1-indexed).
        page: u32,
        /// Total pages as most recently reported by the server.
        total_pages: u32,
        /// Number of items on this page.
        count: usize,
        /// Running total of items fetched so far.
        total_so_far: u64,
        /// Total items the server expects across all pages.
        total_expected: u64,
    },

    /// Page fetch rate limited, retrying.
    PageRetry {
        /// The list being synced.
        list_type: ListType,
        /// Page number being retried.
        page: u32,
        /// Time to wait before retry (ms).
        retry_after_ms: u64,
        /// Attempt that was rejected.
        attempt: u32,
    },

    /// Stale entries were removed after the final page.
    Swept {
        /// The list that was swept.
        list_type: ListType,
        /// Number of local entries deleted.
        removed: u64,
    },

    /// The session reached the final page and committed.
    SyncComplete {
        /// The list that finished.
        list_type: ListType,
        /// Total items fetched.
        items: u64,
        /// Entries removed by the sweep.
        removed: u64,
    },

    /// The session was replaced by a newer one and stopped quietly.
    SyncSuperseded {
        /// The list whose session was replaced.
        list_type: ListType,
    },

    /// The session failed; nothing was swept.
    SyncFailed {
        /// The list that failed.
        list_type: ListType,
        /// Error message.
        error: String,
    },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
///
/// # Example
///
/// ```ignore
/// use discsync::sync::{emit, SyncProgress, ProgressCallback};
///
/// fn my_sync(on_progress: Option<&ProgressCallback>) {
///     emit(on_progress, SyncProgress::SyncStarted { list_type: ListType::Wantlist });
/// }
/// ```
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
