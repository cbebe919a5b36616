//! Error types for the HTTP edge.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or invalid session on a protected route.
    #[error("Unauthorized")]
    Unauthorized,

    /// The upstream API could not be reached.
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ServerError::Config(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = self.to_string();
        match &self {
            ServerError::Unauthorized => {
                tracing::debug!(status = %status, "rejected unauthenticated request");
            }
            _ => {
                tracing::error!(status = %status, error = %message, "request failed");
            }
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
