//! Storage error handling
//!
//! Typed errors for document store operations. Errors are classified so the
//! repository can tell a rejected write (quota, permission, conflict) apart
//! from a store that could not be reached at all.

use std::io;
use std::path::PathBuf;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during document store operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create the data directory
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The store refused access
    #[error("Permission denied writing '{location}'. Check file permissions.")]
    PermissionDenied { location: String },

    /// Disk is full or quota exceeded
    #[error("Disk full or quota exceeded while writing '{location}'. Free up disk space and try again.")]
    DiskFull { location: String },

    /// Create was called for a document that is already present
    #[error("Document '{path}' already exists")]
    AlreadyExists { path: String },

    /// Store is busy or locked by another process
    #[error("Document store is busy: {0}")]
    Busy(String),

    /// A lock guarding the store was poisoned by a panicking thread
    #[error("Document store lock poisoned")]
    Poisoned,

    /// Any other SQLite failure
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),
}

impl StorageError {
    /// Classify a SQLite error by its extended code
    pub fn from_sqlite(error: rusqlite::Error, location: impl Into<String>) -> Self {
        let code = match &error {
            rusqlite::Error::SqliteFailure(e, _) => Some(e.code),
            _ => None,
        };
        match code {
            Some(ErrorCode::DiskFull) => StorageError::DiskFull {
                location: location.into(),
            },
            Some(ErrorCode::ReadOnly) | Some(ErrorCode::PermissionDenied) => {
                StorageError::PermissionDenied {
                    location: location.into(),
                }
            }
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                StorageError::Busy(error.to_string())
            }
            _ => StorageError::Database(error),
        }
    }

    /// Create an error from an I/O error with path context
    pub fn from_io(error: io::Error, path: PathBuf) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                location: path.display().to_string(),
            },
            _ if is_disk_full_error(&error) => StorageError::DiskFull {
                location: path.display().to_string(),
            },
            _ => StorageError::CreateDirectory {
                path,
                source: error,
            },
        }
    }

    /// True when the store was reachable but refused this particular write
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StorageError::DiskFull { .. }
                | StorageError::PermissionDenied { .. }
                | StorageError::AlreadyExists { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::DiskFull { .. } => Some("Free up disk space and try again."),
            StorageError::PermissionDenied { .. } => {
                Some("Check that the data directory and database file are writable by the server.")
            }
            StorageError::Busy(_) => {
                Some("Another process holds the database lock. Make sure only one server uses this data directory.")
            }
            StorageError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            _ => None,
        }
    }
}

/// Check if an I/O error indicates disk full condition
fn is_disk_full_error(error: &io::Error) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("no space left")
        || msg.contains("disk full")
        || msg.contains("quota exceeded")
        || msg.contains("not enough space")
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
