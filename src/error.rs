//! Hub error types with HTTP status code mapping.
//!
//! [`HubError`] is returned by hub operations and REST handlers alike.
//! Over HTTP each variant maps to a status code and a structured JSON body;
//! over WebSocket the semantic variants are reported to the requester as an
//! `erreur` message, while malformed input is only logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "tutor not connected: alice"
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

/// Hub error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 Internal Server Error    |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Inbound payload is not a known message.
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] serde_json::Error),

    /// Username is empty or whitespace.
    #[error("username must not be empty")]
    InvalidUsername,

    /// A caller asked to be queued for itself.
    #[error("{0} cannot request a call to itself")]
    CallToSelf(String),

    /// No tutor with that username is connected.
    #[error("tutor not connected: {0}")]
    TutorNotFound(String),

    /// The connection has not registered, or its username was taken over.
    #[error("connection is not registered")]
    NotRegistered,

    /// The operation is reserved to tutors.
    #[error("{0} is not a tutor")]
    NotATutor(String),

    /// The student is not waiting in that tutor's queue.
    #[error("{student} is not waiting for {tutor}")]
    CallNotFound {
        /// Tutor whose queue was searched.
        tutor: String,
        /// Student that was expected in it.
        student: String,
    },

    /// Internal server error, e.g. an outbound message failed to serialize.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedMessage(_) => 1001,
            Self::InvalidUsername => 1002,
            Self::CallToSelf(_) => 1003,
            Self::TutorNotFound(_) => 2001,
            Self::NotRegistered => 2002,
            Self::NotATutor(_) => 2003,
            Self::CallNotFound { .. } => 2004,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedMessage(_) | Self::InvalidUsername | Self::CallToSelf(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::TutorNotFound(_) | Self::CallNotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotRegistered | Self::NotATutor(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HubError {
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

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn tutor_not_found_maps_to_404() {
        let err = HubError::TutorNotFound("alice".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), 2001);
        assert_eq!(err.to_string(), "tutor not connected: alice");
    }

    #[test]
    fn malformed_json_converts_from_serde_error() {
        let parse = serde_json::from_str::<serde_json::Value>("{nope");
        let Err(source) = parse else {
            panic!("invalid JSON must fail to parse");
        };
        let err = HubError::from(source);
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 1001);
    }

    #[test]
    fn into_response_keeps_status() {
        let response = HubError::NotRegistered.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
