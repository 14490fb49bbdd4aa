//! Tracer Core Library
//!
//! This crate provides the core functionality for Tracer, a personal
//! reading tracker: per-user book records kept in a document store.
//!
//! # Architecture
//!
//! - **Document store**: opaque JSON documents addressed by collection path
//!   and ID (SQLite or in-memory)
//! - **Repository**: book operations scoped to one user's collection
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(SqliteDocumentStore::open(&config)?);
//! let repo = BookRepository::new(store);
//!
//! let books = repo.for_user(UserId::new("u1")?);
//! let dune = books.add(Book::new("Dune", "Herbert"))?;
//! let listing = books.list();
//! ```
//!
//! # Modules
//!
//! - `repository`: Tenant-scoped book operations (main entry point)
//! - `models`: Book and note records
//! - `ids`: Validated user/book IDs and document paths
//! - `storage`: Document store trait and backends
//! - `error`: Repository error taxonomy
//! - `suggest`: External catalog lookups
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod repository;
pub mod storage;
pub mod suggest;

pub use config::{Config, StoreBackend};
pub use error::{BookError, BookResult};
pub use ids::{BookId, CollectionPath, DocumentPath, IdError, UserId};
pub use models::{Book, Note};
pub use repository::{BookListing, BookRepository, ListingWarning, UserBooks};
pub use storage::{
    DocumentStore, MemoryDocumentStore, SqliteDocumentStore, StorageError, StorageResult,
    StoredDocument,
};
pub use suggest::{SuggestError, SuggestionClient};
