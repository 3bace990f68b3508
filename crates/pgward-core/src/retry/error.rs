//! Database error type for retry classification.

use thiserror::Error;

/// Error produced by a single database round trip.
///
/// The retry loop classifies these before deciding whether to re-attempt;
/// only `Database` errors with a recognized SQLSTATE are ever retried.
#[derive(Debug, Error)]
pub enum DbError {
    /// The server reported an error. `code` is the SQLSTATE when the
    /// driver surfaced one; a missing code is never retryable.
    #[error("postgres {}: {message}", .code.as_deref().unwrap_or("<no sqlstate>"))]
    Database {
        code: Option<String>,
        message: String,
    },

    /// Driver or transport failure without a server-side SQLSTATE
    /// (broken socket, protocol error). Not retried.
    #[error("driver: {0}")]
    Driver(String),

    /// The operation was abandoned because the cancel token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl DbError {
    /// SQLSTATE carried by this error, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            DbError::Database { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Build from a driver error, keeping the SQLSTATE when the server
    /// sent one and demoting everything else to a fatal driver error.
    pub fn from_pg(err: tokio_postgres::Error) -> Self {
        match err.as_db_error() {
            Some(db) => DbError::Database {
                code: Some(db.code().code().to_string()),
                message: db.message().to_string(),
            },
            None => DbError::Driver(err.to_string()),
        }
    }
}
