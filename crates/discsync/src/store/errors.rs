use sea_orm::DbErr;
use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A stored entry key could not be parsed.
    #[error("Invalid entry key: {key}")]
    InvalidKey { key: String },
}

impl StoreError {
    /// Whether retrying the operation may succeed (locked, busy, dropped connection).
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Database(db_err) => is_retryable_db_error(db_err),
            StoreError::InvalidKey { .. } => false,
        }
    }
}

pub(crate) fn is_retryable_db_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(_) | DbErr::Query(_) => {
            let err_str = err.to_string().to_lowercase();
            // SQLite: database is locked, busy
            // PostgreSQL: connection refused, too many connections
            err_str.contains("locked")
                || err_str.contains("busy")
                || err_str.contains("timeout")
                || err_str.contains("connection")
                || err_str.contains("temporarily unavailable")
        }
        _ => false,
    }
}

/// Result type alias for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
