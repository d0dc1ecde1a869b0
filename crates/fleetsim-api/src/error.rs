//! Error types for the Fleetsim API server.
//!
//! [`ApiError`] unifies all handler failure modes into a single enum
//! with an [`IntoResponse`](axum::response::IntoResponse)
//! implementation, so handlers can return `Result<_, ApiError>` and
//! use `?` throughout.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StorageError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A device with the same identifier is already registered.
    #[error("{0}")]
    AlreadyExists(String),

    /// Unknown sensor type in a request.
    #[error("invalid type: {0}")]
    InvalidType(String),

    /// A timestamp in a query could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            // Duplicate registration keeps the wire shape clients
            // already rely on: 403 with a bare message field.
            Self::AlreadyExists(msg) => {
                let body = serde_json::json!({ "message": msg });
                (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
            }
            Self::InvalidType(_) | Self::InvalidTimestamp(_) => {
                error_response(StatusCode::BAD_REQUEST, &self.to_string())
            }
            Self::Storage(_) | Self::Internal(_) => {
                error_response(StatusCode::INTERNAL_SERVER_ERROR, &self.to_string())
            }
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = serde_json::json!({
        "error": message,
        "status": status.as_u16(),
    });
    (status, axum::Json(body)).into_response()
}
