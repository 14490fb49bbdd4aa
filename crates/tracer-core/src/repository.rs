//! Book repository
//!
//! Maps book operations onto one user's collection in a [`DocumentStore`].
//!
//! ## Scoping
//!
//! [`BookRepository`] owns the store handle. Every operation goes through a
//! [`UserBooks`] view obtained from [`BookRepository::for_user`], which fixes
//! the collection to `users/{user}/books`. There is no way to address another
//! user's documents through a view.
//!
//! ## Write policy
//!
//! - IDs come from the store on create; a client-supplied ID is discarded.
//! - `lastUpdatedProgress` is stamped on every create and update.
//! - Update is a full overwrite and creates the document if it is missing.
//! - Delete of an absent book succeeds.
//!
//! ## Usage
//!
//! ```ignore
//! let repo = BookRepository::new(Arc::new(MemoryDocumentStore::new()));
//! let books = repo.for_user(UserId::new("u1")?);
//!
//! let dune = books.add(Book::new("Dune", "Herbert"))?;
//! let listing = books.list();
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{BookError, BookResult};
use crate::ids::{BookId, CollectionPath, UserId};
use crate::models::Book;
use crate::storage::{DocumentStore, StoredDocument};

/// Entry point for book operations; cheap to clone
pub struct BookRepository<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for BookRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore + ?Sized> BookRepository<S> {
    /// Wrap a long-lived store handle
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Get the underlying store
    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Scope operations to one user's collection
    pub fn for_user(&self, user: UserId) -> UserBooks<'_, S> {
        let collection = CollectionPath::books_of(&user);
        UserBooks {
            store: self.store.as_ref(),
            user,
            collection,
        }
    }
}

/// Book operations bound to a single user
pub struct UserBooks<'a, S: ?Sized> {
    store: &'a S,
    user: UserId,
    collection: CollectionPath,
}

/// Result of listing a collection
///
/// Listing never fails. Problems are reported in `warnings` next to
/// whatever books could be read.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookListing {
    pub books: Vec<Book>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ListingWarning>,
}

impl BookListing {
    /// True when every stored document was returned
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Why part of a listing is missing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListingWarning {
    /// Document that was skipped; absent when the whole listing failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub message: String,
}

impl<S: DocumentStore + ?Sized> UserBooks<'_, S> {
    /// Store a new book under a freshly allocated ID
    ///
    /// Returns the stored record, including its ID and progress marker.
    pub fn add(&self, mut book: Book) -> BookResult<Book> {
        let id = self.store.new_document_id(&self.collection);
        book.id = Some(id.clone());
        book.touch();
        check_pages(&book);

        let body = encode(&book)?;
        self.store.create(&self.collection.document(&id), &body)?;

        info!("Added book {} for user {}", id, self.user);
        Ok(book)
    }

    /// Every readable book in the collection, most recently updated first
    pub fn list(&self) -> BookListing {
        let documents = match self.store.list(&self.collection) {
            Ok(documents) => documents,
            Err(e) => {
                warn!("Failed to list {}: {}", self.collection, e);
                return BookListing {
                    books: Vec::new(),
                    warnings: vec![ListingWarning {
                        id: None,
                        message: format!("Could not list books: {}", e),
                    }],
                };
            }
        };

        let mut listing = BookListing::default();
        for document in documents {
            match decode_listed(document) {
                Ok(book) => listing.books.push(book),
                Err(warning) => {
                    warn!(
                        "Skipping unreadable document in {}: {}",
                        self.collection, warning.message
                    );
                    listing.warnings.push(warning);
                }
            }
        }

        listing.books.sort_by(newest_first);
        debug!(
            "Listed {} books for user {} ({} skipped)",
            listing.books.len(),
            self.user,
            listing.warnings.len()
        );
        listing
    }

    /// Look up a single book by ID
    pub fn get(&self, id: &BookId) -> BookResult<Book> {
        let path = self.collection.document(id);
        let body = self
            .store
            .get(&path)?
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;

        let mut book = decode(id.as_str(), &body)?;
        book.id = Some(id.clone());
        Ok(book)
    }

    /// Overwrite a book by its ID, creating it if missing
    pub fn update(&self, mut book: Book) -> BookResult<Book> {
        let id = book
            .id
            .clone()
            .ok_or_else(|| BookError::Validation("book id is required for update".to_string()))?;
        book.touch();
        check_pages(&book);

        let body = encode(&book)?;
        self.store.set(&self.collection.document(&id), &body)?;

        info!("Updated book {} for user {}", id, self.user);
        Ok(book)
    }

    /// Remove a book; removing an absent book succeeds
    pub fn delete(&self, id: &BookId) -> BookResult<()> {
        self.store.delete(&self.collection.document(id))?;
        info!("Deleted book {} for user {}", id, self.user);
        Ok(())
    }
}

fn encode(book: &Book) -> BookResult<String> {
    serde_json::to_string(book)
        .map_err(|e| BookError::Validation(format!("book could not be encoded: {}", e)))
}

fn decode(id: &str, body: &str) -> BookResult<Book> {
    serde_json::from_str(body).map_err(|source| BookError::DecodeFailure {
        id: id.to_string(),
        source,
    })
}

/// Decode a listed document; the store key is the authoritative ID
fn decode_listed(document: StoredDocument) -> Result<Book, ListingWarning> {
    let warning = |message: String| ListingWarning {
        id: Some(document.id.clone()),
        message,
    };

    let id = BookId::new(document.id.as_str()).map_err(|e| warning(e.to_string()))?;
    let mut book = decode(&document.id, &document.body).map_err(|e| warning(e.to_string()))?;

    if book.id.as_ref().is_some_and(|stored| stored != &id) {
        debug!("Document {} carries a stale id field; using the key", id);
    }
    book.id = Some(id);
    Ok(book)
}

fn newest_first(a: &Book, b: &Book) -> Ordering {
    b.last_updated_progress
        .cmp(&a.last_updated_progress)
        .then_with(|| a.id.cmp(&b.id))
}

fn check_pages(book: &Book) {
    if book.is_past_last_page() {
        warn!(
            "Book {:?} is at page {} of {}",
            book.title, book.current_page_number, book.total_page_numbers
        );
    }
}
