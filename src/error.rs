//! Error types for the WebSocket handshake, per-connection delivery, and
//! the HTTP surface.
//!
//! Only [`HandshakeError`] and [`GatewayError`] ever reach a caller.
//! [`SendError`] is contained to the connection it happened on: the
//! broadcaster resolves it by tearing that connection down.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 5001,
///     "message": "invalid handshake: pollId must not be empty",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Rejection of a connection request before it is registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    /// `pollId` was present but empty.
    #[error("pollId must not be empty")]
    EmptyPollId,

    /// `pollId` exceeds the maximum identifier length.
    #[error("pollId exceeds {max} characters")]
    PollIdTooLong {
        /// Maximum accepted length.
        max: usize,
    },

    /// `pollId` contains a character outside `[A-Za-z0-9_-]`.
    #[error("pollId contains invalid character {0:?}")]
    InvalidPollIdCharacter(char),

    /// The server is shutting down and no longer accepts connections.
    #[error("server is shutting down")]
    ShuttingDown,
}

/// Delivery failure on a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The connection is closed, its transport failed, or the send timed out.
    #[error("connection is dead")]
    Dead,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                  |
/// |-----------|------------|------------------------------|
/// | 1000–1999 | Validation | 400 Bad Request              |
/// | 5000–5999 | Handshake  | 400 / 503 Service Unavailable|
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// WebSocket handshake was rejected.
    #[error("invalid handshake: {0}")]
    Handshake(#[from] HandshakeError),
}

impl GatewayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Handshake(HandshakeError::ShuttingDown) => 5002,
            Self::Handshake(_) => 5001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Handshake(HandshakeError::ShuttingDown) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Handshake(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
