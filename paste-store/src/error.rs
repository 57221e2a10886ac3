//! Error types for paste-store.

use paste_types::{ClientFault, Outcome};
use std::path::PathBuf;

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database path error.
    #[error("invalid database path: {path}")]
    InvalidPath {
        /// The invalid path.
        path: PathBuf,
    },

    /// Injected failure (in-memory backend only).
    #[error("injected failure: {0}")]
    Injected(String),
}

impl StoreError {
    /// Convert into a client-side storage failure.
    pub fn into_outcome<T>(self) -> Outcome<T> {
        Outcome::client_error(ClientFault::Storage(self.to_string()))
    }
}

/// Result type alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Lift a storage result into an [`Outcome`].
pub(crate) fn to_outcome<T>(result: StoreResult<T>) -> Outcome<T> {
    match result {
        Ok(value) => Outcome::Success(value),
        Err(e) => {
            tracing::warn!("Local store operation failed: {}", e);
            e.into_outcome()
        }
    }
}
