//! Registry and API error types.
//!
//! The registry raises typed failures; the API layer maps them onto
//! minimal client-facing reasons and logs the detail server-side. Raw
//! error text never reaches a response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Failures inside the license registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Unknown license key.
    #[error("license not found")]
    NotFound,

    /// Quota exhausted for a new fingerprint.
    #[error("device limit reached")]
    DeviceLimitReached,

    /// Heartbeat for a device that never activated.
    #[error("device not activated")]
    NotActivated,

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A client-facing API failure: status code plus a short reason.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request.
    #[error("{0}")]
    BadRequest(String),

    /// Rejected request with a short, safe reason.
    #[error("{0}")]
    Forbidden(String),

    /// Anything the caller has no business knowing about.
    #[error("internal error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound => Self::Forbidden("invalid license".to_string()),
            RegistryError::DeviceLimitReached => {
                Self::Forbidden("device limit reached".to_string())
            }
            RegistryError::NotActivated => Self::Forbidden("not activated".to_string()),
            RegistryError::Database(e) => {
                tracing::error!("registry failure: {e}");
                Self::Internal
            }
        }
    }
}
