//! HTTP error mapping
//!
//! Every failure leaves the server as a JSON `{"message": ...}` body with a
//! status code chosen from the repository's error classification.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, warn};

use tracer_core::{BookError, IdError, SuggestError};

use crate::handlers::MessageResponse;

/// Errors a handler can return
#[derive(Debug)]
pub enum ApiError {
    /// Bad header, bad body, missing field
    BadRequest(String),
    /// Repository failure
    Book(BookError),
    /// Catalog lookup failure
    Suggest(SuggestError),
}

impl From<BookError> for ApiError {
    fn from(error: BookError) -> Self {
        ApiError::Book(error)
    }
}

impl From<SuggestError> for ApiError {
    fn from(error: SuggestError) -> Self {
        ApiError::Suggest(error)
    }
}

impl From<IdError> for ApiError {
    fn from(error: IdError) -> Self {
        ApiError::BadRequest(error.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Book(e) => match e {
                BookError::Validation(_) => StatusCode::BAD_REQUEST,
                BookError::NotFound(_) => StatusCode::NOT_FOUND,
                BookError::WriteRejected(_) => StatusCode::EXPECTATION_FAILED,
                BookError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                BookError::DecodeFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Suggest(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Book(e) => e.to_string(),
            ApiError::Suggest(e) => e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() || status == StatusCode::EXPECTATION_FAILED {
            let suggestion = match &self {
                ApiError::Book(e) => e.storage_error().and_then(|s| s.recovery_suggestion()),
                _ => None,
            };
            match suggestion {
                Some(hint) => error!("{} ({}): {}", status, self.message(), hint),
                None => error!("{}: {}", status, self.message()),
            }
        } else {
            warn!("{}: {}", status, self.message());
        }

        let body = Json(MessageResponse {
            message: self.message(),
        });
        (status, body).into_response()
    }
}
