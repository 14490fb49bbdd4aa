//! Book repository errors
//!
//! The taxonomy callers see. Storage errors are folded into two buckets:
//! the store refused a write, or the store could not serve the call.

use thiserror::Error;

use crate::ids::IdError;
use crate::storage::StorageError;

/// Errors returned by [`crate::repository::UserBooks`]
#[derive(Error, Debug)]
pub enum BookError {
    /// The request itself was malformed
    #[error("Invalid request: {0}")]
    Validation(String),

    /// No book with this ID in the user's collection
    #[error("Book '{0}' not found")]
    NotFound(String),

    /// The store was reachable but refused the write
    #[error("Write rejected by document store: {0}")]
    WriteRejected(#[source] StorageError),

    /// The store call failed outright
    #[error("Document store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),

    /// A stored document could not be read as a book
    #[error("Stored book '{id}' could not be decoded: {source}")]
    DecodeFailure {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<StorageError> for BookError {
    fn from(error: StorageError) -> Self {
        if error.is_rejection() {
            BookError::WriteRejected(error)
        } else {
            BookError::StoreUnavailable(error)
        }
    }
}

impl From<IdError> for BookError {
    fn from(error: IdError) -> Self {
        BookError::Validation(error.to_string())
    }
}

impl BookError {
    /// The underlying storage error, if any
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            BookError::WriteRejected(e) | BookError::StoreUnavailable(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for repository operations
pub type BookResult<T> = Result<T, BookError>;
