//! Data models for Tracer
//!
//! A [`Book`] is the unit of storage: one document per book in the owner's
//! collection. Field names on the wire and in the store are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::BookId;

/// A book on a user's shelf, with reading progress and notes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Assigned by the store on creation; required for updates
    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<BookId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "coverURL", alias = "coverUrl", default)]
    pub cover_url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub current_page_number: u32,
    #[serde(default)]
    pub total_page_numbers: u32,
    /// Server-set on every create and update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_progress: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Book {
    /// Create a book with just a title and author
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            ..Self::default()
        }
    }

    /// Stamp the progress marker with the current time
    pub fn touch(&mut self) {
        self.last_updated_progress = Some(Utc::now());
    }

    /// True when the current page is past the last page
    pub fn is_past_last_page(&self) -> bool {
        self.total_page_numbers > 0 && self.current_page_number > self.total_page_numbers
    }
}

/// A note pinned to a location in a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Free-form location marker (chapter, page, heading)
    #[serde(default)]
    pub section: String,
    #[serde(default = "Utc::now")]
    pub date_posted: DateTime<Utc>,
}

/// Clients often send `"id": ""` for a new book; treat that as absent.
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<BookId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => BookId::new(s).map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_new() {
        let book = Book::new("Dune", "Herbert");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Herbert");
        assert!(book.id.is_none());
        assert!(book.last_updated_progress.is_none());
        assert!(book.notes.is_empty());
    }

    #[test]
    fn test_touch_sets_progress_marker() {
        let mut book = Book::new("Dune", "Herbert");
        book.touch();
        let first = book.last_updated_progress.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        book.touch();
        assert!(book.last_updated_progress.unwrap() >= first);
    }

    #[test]
    fn test_past_last_page() {
        let mut book = Book::new("Dune", "Herbert");
        book.current_page_number = 10;
        assert!(!book.is_past_last_page());

        book.total_page_numbers = 400;
        book.current_page_number = 400;
        assert!(!book.is_past_last_page());

        book.current_page_number = 500;
        assert!(book.is_past_last_page());
    }

    #[test]
    fn test_deserialize_minimal_body() {
        let json = r#"{"title":"Dune","author":"Herbert","totalPageNumbers":412}"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.total_page_numbers, 412);
        assert_eq!(book.current_page_number, 0);
        assert!(book.cover_url.is_empty());
        assert!(book.id.is_none());
    }

    #[test]
    fn test_empty_id_is_absent() {
        let book: Book = serde_json::from_str(r#"{"id":"","title":"x"}"#).unwrap();
        assert!(book.id.is_none());
    }

    #[test]
    fn test_invalid_id_rejected() {
        let result: Result<Book, _> = serde_json::from_str(r#"{"id":"../other","title":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_page_rejected() {
        let result: Result<Book, _> = serde_json::from_str(r#"{"currentPageNumber":-3}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_cover_url_field_names() {
        let book: Book =
            serde_json::from_str(r#"{"coverUrl":"http://img/1.jpg"}"#).unwrap();
        assert_eq!(book.cover_url, "http://img/1.jpg");

        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["coverURL"], "http://img/1.jpg");
        assert!(json.get("coverUrl").is_none());
        // Unset marker and id are omitted
        assert!(json.get("lastUpdatedProgress").is_none());
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_note_defaults_date_posted() {
        let before = Utc::now();
        let note: Note = serde_json::from_str(r#"{"section":"Chapter 3"}"#).unwrap();
        assert_eq!(note.section, "Chapter 3");
        assert!(note.date_posted >= before);
    }

    #[test]
    fn test_note_keeps_client_date() {
        let note: Note =
            serde_json::from_str(r#"{"section":"p. 12","datePosted":"2024-03-01T10:00:00Z"}"#)
                .unwrap();
        assert_eq!(note.date_posted.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }
}
