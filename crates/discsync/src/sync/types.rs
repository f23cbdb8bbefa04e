//! Sync types and constants.

use thiserror::Error;

use crate::entity::list_type::ListType;
use crate::platform::{ServiceError, rate_limits};
use crate::store::StoreError;

/// Default page size requested from the catalog service.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Attempts per page before a rate-limited session fails.
pub const MAX_RATE_LIMIT_ATTEMPTS: u32 = rate_limits::MAX_RATE_LIMIT_ATTEMPTS;

/// Options for syncing one list.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Attempts per page when the service answers with a rate-limit rejection.
    pub max_rate_limit_attempts: u32,
    /// Page size to request. The server may use a different one.
    pub per_page: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_rate_limit_attempts: MAX_RATE_LIMIT_ATTEMPTS,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Metadata handed to the page callback after a page is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub list_type: ListType,
    /// Page number (1-indexed).
    pub page: u32,
    /// Total pages as most recently reported.
    pub total_pages: u32,
    /// Items received on this page.
    pub items_received: usize,
    /// Total items the server expects across all pages.
    pub total_items_expected: u64,
}

/// Outcome of one sync session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub list_type: ListType,
    pub pages_fetched: u32,
    pub total_pages: u32,
    pub items_fetched: u64,
    pub total_items_expected: u64,
    /// Local entries deleted by the final sweep.
    pub swept: u64,
    /// True once the final page was applied and the sweep committed.
    pub completed: bool,
}

impl SyncSummary {
    pub(crate) fn new(list_type: ListType) -> Self {
        Self {
            list_type,
            pages_fetched: 0,
            total_pages: 0,
            items_fetched: 0,
            total_items_expected: 0,
            swept: 0,
            completed: false,
        }
    }
}

/// Errors that end a sync session.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A catalog call failed (rate limit exhausted, auth, network, ...).
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Writing to the record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A newer session for the same list took over.
    #[error("Sync of {list_type} superseded by a newer session")]
    Superseded { list_type: ListType },
}

impl SyncError {
    /// True for a quiet cancellation rather than a failure.
    #[inline]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SyncError::Superseded { .. })
    }

    /// True if the session failed because credentials were missing or rejected.
    #[inline]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, SyncError::Service(e) if e.is_unauthenticated())
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
