//! HTTP error type.
//!
//! Bodies keep the `{"error": "..."}` shape the web app already parses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::shortener::ShortenError;

/// Error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid input.
    BadRequest(String),
    /// The upstream shortener failed.
    Upstream,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Upstream => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to shorten link".to_owned(),
            ),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<ShortenError> for AppError {
    fn from(err: ShortenError) -> Self {
        tracing::warn!(error = %err, "upstream shortener failed");
        Self::Upstream
    }
}
