//! Request handlers
//!
//! - `GET    /books`: list books, or one book when `bookID` is set
//! - `POST   /books`: add a book
//! - `PUT    /books`: replace a book (body must carry `id`)
//! - `DELETE /books`: delete the book named by `BookID`
//! - `GET    /books/suggestions?q=`: catalog lookup
//! - `GET    /health`: liveness
//!
//! The caller is identified by the `UserID` header on every `/books` call.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tracer_core::{Book, BookError, BookId, IdError, UserId};

use crate::app::AppState;
use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "userid";
pub const BOOK_ID_HEADER: &str = "bookid";

/// `{"message": ...}` envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize)]
struct CreatedResponse {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<BookId>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub books: Vec<Book>,
}

#[derive(Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    q: String,
}

// ── Header helpers ────────────────────────────────────────────────────────

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, ApiError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| ApiError::BadRequest(format!("{} header is not valid text", name)))?
                .trim();
            Ok(if value.is_empty() { None } else { Some(value) })
        }
    }
}

fn user_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = header(headers, USER_ID_HEADER)?
        .ok_or_else(|| ApiError::BadRequest("UserID header is required".to_string()))?;
    Ok(UserId::new(raw)?)
}

/// Raw `BookID` header paired with its validated form
///
/// An ID that fails validation cannot name a stored book, so it is kept
/// around for the not-found reply instead of being rejected outright.
fn book_id(headers: &HeaderMap) -> Result<Option<(String, Result<BookId, IdError>)>, ApiError> {
    Ok(header(headers, BOOK_ID_HEADER)?.map(|raw| (raw.to_string(), BookId::new(raw))))
}

fn parse_book(body: &Bytes) -> Result<Book, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid book: {}", e)))
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn health() -> Json<MessageResponse> {
    debug!("Reached the health endpoint");
    Json(MessageResponse::new("UP"))
}

pub async fn get_books(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = user_id(&headers)?;
    let books = state.repo.for_user(user);

    match book_id(&headers)? {
        Some((_, Ok(id))) => {
            let book = books.get(&id)?;
            Ok((StatusCode::OK, Json(book)).into_response())
        }
        Some((raw, Err(e))) => {
            debug!("No book can have id {:?}: {}", raw, e);
            Err(BookError::NotFound(raw).into())
        }
        None => {
            let listing = books.list();
            Ok((StatusCode::OK, Json(listing)).into_response())
        }
    }
}

pub async fn add_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let user = user_id(&headers)?;
    let book = parse_book(&body)?;

    let stored = state.repo.for_user(user).add(book)?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "post called",
            id: stored.id,
        }),
    )
        .into_response())
}

pub async fn update_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let user = user_id(&headers)?;
    let book = parse_book(&body)?;

    state.repo.for_user(user).update(book)?;
    Ok((StatusCode::ACCEPTED, Json(MessageResponse::new("put called"))).into_response())
}

pub async fn delete_book(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let user = user_id(&headers)?;
    let (raw, id) = book_id(&headers)?
        .ok_or_else(|| ApiError::BadRequest("BookID header is required".to_string()))?;

    match id {
        Ok(id) => state.repo.for_user(user).delete(&id)?,
        Err(e) => debug!("Nothing to delete for book id {:?}: {}", raw, e),
    }
    Ok((StatusCode::OK, Json(MessageResponse::new("delete successful"))).into_response())
}

pub async fn suggest_books(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let books = state.suggestions.suggest(&query.q).await?;
    Ok(Json(SuggestionsResponse { books }))
}
