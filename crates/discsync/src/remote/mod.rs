//! Catalog service HTTP client.
//!
//! # Module Structure
//!
//! - [`client`] - [`CatalogClient`], the [`CatalogFetcher`](crate::platform::CatalogFetcher)
//!   implementation over an [`HttpTransport`](crate::http::HttpTransport)
//! - [`signer`] - request signing
//! - [`types`] - wire payloads
//! - `convert` - wire to platform type conversion

pub mod client;
mod convert;
mod error;
pub mod signer;
pub mod types;

pub use client::{CatalogClient, DEFAULT_BASE_URL, DEFAULT_USER_AGENT, parse_retry_after};
pub use convert::clean_artist_name;
pub use error::RemoteError;
pub use signer::{AuthSigner, TokenSigner};
