use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by calls to the catalog service.
///
/// The type is `Clone` so a single failed in-flight fetch can hand the same
/// error to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Still rate limited after exhausting the retry budget.
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimited {
        attempts: u32,
        retry_after: Option<Duration>,
    },

    /// Credentials are missing or were rejected by the service.
    #[error("Authentication required")]
    Unauthenticated,

    /// Resource not found (release, list entry, etc.).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Non-success response from the service.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Network or transport error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The response body could not be decoded.
    #[error("Malformed response: {message}")]
    Decode { message: String },
}

impl ServiceError {
    /// Create an API error.
    #[inline]
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Check if this error is a rate limit error.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if this error means the user has to authenticate again.
    #[inline]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Check if this error is a not-found error.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which keeps multi-line
/// response bodies out of progress events and log lines.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for catalog service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
