//! Document store layer
//!
//! A document store addresses opaque JSON bodies by collection path and
//! document ID. The repository layer decodes them; the store never does.
//!
//! ## Backends
//!
//! - **SQLite**: durable, one table keyed by `(collection, id)`
//! - **Memory**: process-local map, used for tests and throwaway servers

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryDocumentStore;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteDocumentStore;

use crate::ids::{BookId, CollectionPath, DocumentPath};

/// A raw document as read back from a collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Document ID as recorded by the store
    pub id: String,
    /// JSON body, exactly as written
    pub body: String,
}

/// Key/value document backend
///
/// Implementations must be safe to share across request handlers. Every
/// call is a single round trip; nothing is retried.
pub trait DocumentStore: Send + Sync {
    /// Allocate an ID for a new document in `collection`
    ///
    /// The ID is not reserved; `create` fails if it turns out to be taken.
    fn new_document_id(&self, _collection: &CollectionPath) -> BookId {
        BookId::generate()
    }

    /// Read one document, `None` if absent
    fn get(&self, path: &DocumentPath) -> StorageResult<Option<String>>;

    /// Write a document, replacing any existing body (upsert)
    fn set(&self, path: &DocumentPath, body: &str) -> StorageResult<()>;

    /// Write a document that must not exist yet
    fn create(&self, path: &DocumentPath, body: &str) -> StorageResult<()>;

    /// Remove a document; removing an absent document succeeds
    fn delete(&self, path: &DocumentPath) -> StorageResult<()>;

    /// Every document in `collection`
    fn list(&self, collection: &CollectionPath) -> StorageResult<Vec<StoredDocument>>;
}
