//! Service-neutral access to the remote catalog.
//!
//! This module defines the [`CatalogFetcher`] trait that a concrete client
//! implements, and the [`RateLimitedClient`] that governs every call to it
//! through a shared [`RateLimiter`] and [`CredentialStore`].
//!
//! # Example
//!
//! ```ignore
//! use discsync::platform::{CredentialStore, Credentials, RateLimitedClient, RateLimiter};
//!
//! let credentials = CredentialStore::with_credentials(Credentials::new("digger", token));
//! let client = RateLimitedClient::new(fetcher, RateLimiter::default(), credentials);
//!
//! let page = client.list_page(ListType::Collection, 1, 100).await?;
//! for item in page.items {
//!     println!("{} - {}", item.artist, item.title);
//! }
//! ```

mod credentials;
mod errors;
mod rate_limit;
mod types;

pub use credentials::{CredentialStore, Credentials};
pub use errors::{Result, ServiceError, short_error_message};
pub use rate_limit::{
    BackoffNotify, RateLimitConfig, RateLimitedClient, RateLimiter, RetryGate, RetryHooks,
    TokenBucketState, rate_limits,
};
pub use types::{
    CatalogFetcher, FetchOutcome, LibraryItem, ListPage, MarketStats, Membership, PaginationInfo,
    ReleaseDetail, SearchResult,
};
