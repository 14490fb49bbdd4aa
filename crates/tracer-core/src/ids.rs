//! User and book identifiers, and the document paths built from them
//!
//! Every path into the document store is assembled from a validated
//! [`UserId`] and, for single documents, a validated [`BookId`]. Raw strings
//! never reach the store, so a caller cannot escape its own collection by
//! smuggling `/` or `..` into a header.
//!
//! Layout: `users/{user}/books/{book}`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Longest identifier accepted, in bytes
pub const MAX_ID_LEN: usize = 128;

/// Errors from identifier validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} is longer than {max} bytes")]
    TooLong { kind: &'static str, max: usize },

    #[error("{kind} '{value}' contains a forbidden character")]
    ForbiddenCharacter { kind: &'static str, value: String },

    #[error("{kind} '{value}' is reserved")]
    Reserved { kind: &'static str, value: String },
}

fn validate(kind: &'static str, value: &str) -> Result<(), IdError> {
    if value.is_empty() {
        return Err(IdError::Empty { kind });
    }
    if value.len() > MAX_ID_LEN {
        return Err(IdError::TooLong {
            kind,
            max: MAX_ID_LEN,
        });
    }
    if value == "." || value == ".." {
        return Err(IdError::Reserved {
            kind,
            value: value.to_string(),
        });
    }
    if value.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
        return Err(IdError::ForbiddenCharacter {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

macro_rules! path_segment_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Validate and wrap an identifier
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                validate($kind, &value)?;
                Ok(Self(value))
            }

            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let value = String::deserialize(deserializer)?;
                Self::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

path_segment_id!(
    /// Tenant identifier; owns exactly one book collection
    UserId,
    "user id"
);

path_segment_id!(
    /// Book identifier, unique within one user's collection
    BookId,
    "book id"
);

impl BookId {
    /// Allocate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

/// A collection of documents, e.g. `users/u1/books`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// The book collection owned by `user`
    pub fn books_of(user: &UserId) -> Self {
        Self(format!("users/{}/books", user))
    }

    /// Path of the document `id` inside this collection
    pub fn document(&self, id: &BookId) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.clone(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single document: collection plus document ID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: BookId,
}

impl DocumentPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
