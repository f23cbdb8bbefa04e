//! Error types for catalog client construction.

use thiserror::Error;

use crate::http::HttpError;
use crate::platform::ServiceError;

/// Errors raised while building a [`CatalogClient`](super::CatalogClient).
///
/// Per-request failures are reported as
/// [`FetchOutcome`](crate::platform::FetchOutcome) values instead.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The base URL could not be parsed.
    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("Base URL cannot be a base: {0}")]
    NotABase(String),

    /// The HTTP transport could not be created.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
}

impl From<RemoteError> for ServiceError {
    fn from(err: RemoteError) -> Self {
        ServiceError::network(err.to_string())
    }
}
