//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered to HTTP clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use portal_core::{CoreError, StoreError};
use serde::Serialize;
use tracing::error;
use utoipa::ToSchema;

use crate::config::ConfigError;

/// Structured error body returned by every endpoint on failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. `NOT_ENROLLED` or `INVALID_GRADE`.
    #[schema(example = "NOT_ENROLLED")]
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A rejection or failure coming out of the core components.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error from running the schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request carried no usable caller identity.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Core(CoreError::Store(e))
    }
}

impl ApiError {
    pub fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        let (status, code) = match self {
            ApiError::Core(core) => match core {
                CoreError::NotEnrolled { .. } => (StatusCode::FORBIDDEN, "NOT_ENROLLED"),
                CoreError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                CoreError::InvalidGrade(_) => (StatusCode::BAD_REQUEST, "INVALID_GRADE"),
                CoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                CoreError::AttemptLimitExceeded { .. } => {
                    (StatusCode::CONFLICT, "ATTEMPT_LIMIT_EXCEEDED")
                }
                CoreError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                CoreError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
                CoreError::Store(StoreError::Unexpected(_)) => {
                    (StatusCode::BAD_GATEWAY, "STORE_ERROR")
                }
            },
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let message = match status {
            StatusCode::INTERNAL_SERVER_ERROR => "An internal error occurred".to_string(),
            _ => self.to_string(),
        };
        (status, ErrorBody { code, message })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(err: ApiError) -> (StatusCode, &'static str) {
        let (status, body) = err.status_and_body();
        (status, body.code)
    }

    #[test]
    fn core_rejections_keep_their_identity() {
        assert_eq!(
            code_of(
                CoreError::NotEnrolled {
                    student_id: "s1".to_string(),
                    course_id: 4
                }
                .into()
            ),
            (StatusCode::FORBIDDEN, "NOT_ENROLLED")
        );
        assert_eq!(
            code_of(CoreError::InvalidGrade(101.0).into()),
            (StatusCode::BAD_REQUEST, "INVALID_GRADE")
        );
        assert_eq!(
            code_of(
                CoreError::AttemptLimitExceeded {
                    assignment_id: 1,
                    max_attempts: 2
                }
                .into()
            ),
            (StatusCode::CONFLICT, "ATTEMPT_LIMIT_EXCEEDED")
        );
        assert_eq!(
            code_of(CoreError::Forbidden("nope".to_string()).into()),
            (StatusCode::FORBIDDEN, "FORBIDDEN")
        );
    }

    #[test]
    fn store_failures_map_by_kind() {
        assert_eq!(
            code_of(StoreError::NotFound("Course 9 not found".to_string()).into()),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
        assert_eq!(
            code_of(StoreError::Unexpected("connection reset".to_string()).into()),
            (StatusCode::BAD_GATEWAY, "STORE_ERROR")
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let (status, body) = ApiError::Internal("secret".to_string()).status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("secret"));
    }

    #[test]
    fn rejection_message_is_verbatim() {
        let (_, body) = ApiError::from(CoreError::InvalidGrade(120.0)).status_and_body();
        assert_eq!(body.message, CoreError::InvalidGrade(120.0).to_string());
    }
}
