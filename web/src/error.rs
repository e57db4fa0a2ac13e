//! Error types for web handlers.
//!
//! Bridges domain errors and HTTP responses. Every [`ErrorKind`] maps to
//! exactly one status code; the body is always `{"code", "message"}`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eventpass_core::error::{ErrorKind, EventPassError};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Implements Axum's `IntoResponse`, so handlers return
/// `Result<_, AppError>` and use `?` on domain results.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Attach the underlying error, logged but never returned.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error for malformed input.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "VALIDATION_ERROR".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable code of this error.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::InvalidPayload => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const fn code_for(err: &EventPassError) -> &'static str {
    match err {
        EventPassError::Validation { .. } => "VALIDATION_ERROR",
        EventPassError::InvalidPayload { .. } => "INVALID_PAYLOAD",
        EventPassError::Unauthenticated | EventPassError::InvalidCredentials => "UNAUTHORIZED",
        EventPassError::Forbidden { .. } => "FORBIDDEN",
        EventPassError::NotFound { .. } => "NOT_FOUND",
        EventPassError::AlreadyRegistered => "ALREADY_REGISTERED",
        EventPassError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
        EventPassError::NotRegistered => "NOT_REGISTERED",
        EventPassError::SoldOut { .. } => "SOLD_OUT",
        EventPassError::StaleWrite => "STALE_WRITE",
        EventPassError::Storage(_) => "INTERNAL_SERVER_ERROR",
    }
}

/// Convert a domain error, hiding internal detail.
impl From<EventPassError> for AppError {
    fn from(err: EventPassError) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Internal {
            return Self::internal("An internal error occurred").with_source(err.into());
        }
        Self::new(status_for(kind), err.to_string(), code_for(&err).to_string())
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventpass_core::error::Resource;

    #[test]
    fn test_error_display() {
        let err = AppError::validation("Invalid input");
        assert_eq!(err.to_string(), "[VALIDATION_ERROR] Invalid input");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_each_kind_has_one_status() {
        let cases = [
            (EventPassError::validation("title", "is required"), StatusCode::BAD_REQUEST),
            (EventPassError::invalid_payload("not base64"), StatusCode::BAD_REQUEST),
            (EventPassError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (EventPassError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (EventPassError::forbidden("Not authorized"), StatusCode::FORBIDDEN),
            (EventPassError::not_found(Resource::User, "u1"), StatusCode::NOT_FOUND),
            (EventPassError::AlreadyRegistered, StatusCode::CONFLICT),
            (EventPassError::StaleWrite, StatusCode::CONFLICT),
            (EventPassError::Storage("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err.clone()).status(), status, "{err:?}");
        }
    }

    #[test]
    fn test_domain_messages_pass_through() {
        let err = AppError::from(EventPassError::not_found(Resource::Event, "e1"));
        assert_eq!(err.message(), "Event not found");
        assert_eq!(err.code(), "NOT_FOUND");

        let err = AppError::from(EventPassError::AlreadyCheckedIn);
        assert_eq!(err.message(), "Attendance already marked");
        assert_eq!(err.code(), "ALREADY_CHECKED_IN");
    }

    #[test]
    fn test_storage_detail_is_hidden() {
        let err = AppError::from(EventPassError::Storage("password=hunter2".into()));
        assert_eq!(err.message(), "An internal error occurred");
        assert!(!err.to_string().contains("hunter2"));
    }
}
