//! discsync - rate-limited, cached synchronization of a catalog account's
//! collection and wantlist into a local database.
//!
//! The crate is built from three pieces:
//!
//! - [`platform::RateLimiter`] - a token bucket with an enforced backoff
//!   window, shared by every request to one service.
//! - [`cache::SingleFlightCache`] - a TTL cache that runs at most one fetch
//!   per key, used for on-demand lookups in [`lookup`].
//! - [`sync::Reconciler`] - a paginated mark-and-sweep sync of one list into
//!   a [`store::RecordStore`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use discsync::{connect_and_migrate, CatalogClient, CredentialStore, Credentials};
//! use discsync::platform::{RateLimitConfig, RateLimitedClient, RateLimiter};
//! use discsync::store::SqlRecordStore;
//! use discsync::sync::{Reconciler, SyncOptions};
//!
//! let db = connect_and_migrate("sqlite://discsync.db?mode=rwc").await?;
//! let client = CatalogClient::new(discsync::remote::DEFAULT_BASE_URL, "my-app/1.0")?;
//! let client = Arc::new(RateLimitedClient::new(
//!     client,
//!     RateLimiter::new(RateLimitConfig::default()),
//!     CredentialStore::with_credentials(Credentials::new("alice", "token")),
//! ));
//!
//! let reconciler = Reconciler::new(client, Arc::new(SqlRecordStore::new(db)), SyncOptions::default());
//! let summary = reconciler.sync(ListType::Collection, None, None).await?;
//! ```

pub mod cache;
pub mod db;
pub mod entity;
pub mod http;
pub mod lookup;
pub mod migration;
pub mod platform;
pub mod remote;
pub mod retry;
pub mod store;
pub mod sync;

pub use cache::{CacheStats, SingleFlightCache};
pub use db::{connect, connect_and_migrate};
pub use entity::prelude::*;
pub use lookup::{CacheTtls, CatalogLookups};
pub use platform::{
    CatalogFetcher, CredentialStore, Credentials, FetchOutcome, RateLimitConfig,
    RateLimitedClient, RateLimiter, ServiceError, rate_limits,
};
pub use remote::CatalogClient;
pub use store::{RecordStore, SqlRecordStore, StoreError};
pub use sync::{Reconciler, SyncError, SyncOptions, SyncProgress, SyncSummary};
