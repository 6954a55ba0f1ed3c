//! Error types for content-poll.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// How loudly an error should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Expected outcome surfaced to the voter (validation, duplicate vote).
    Info,
    /// Degraded but recoverable (migration step, cache backend).
    Warning,
    /// Unexpected fault.
    Error,
}

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Vote validation ===
    #[error("Invalid option index: {0}")]
    InvalidOption(i64),

    #[error("Invalid poll identifier: {0}")]
    InvalidPollId(String),

    #[error("Post ID is required for vote recording, got {0}")]
    InvalidPostId(i64),

    #[error("Voter token is missing")]
    InvalidToken,

    #[error("You have already voted")]
    DuplicateVote,

    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    // === Server Errors ===
    #[error("Failed to record vote: {0}")]
    StorageWrite(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration step failed: {0}")]
    Migration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::InvalidOption(_)
            | Self::InvalidPollId(_)
            | Self::InvalidPostId(_)
            | Self::InvalidToken
            | Self::DuplicateVote
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,

            // 5xx Server Errors
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::StorageWrite(_)
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Config(_)
            | Self::Cache(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidOption(_) => "invalid_option",
            Self::InvalidPollId(_) => "invalid_poll_id",
            Self::InvalidPostId(_) => "invalid_post_id",
            Self::InvalidToken => "invalid_token",
            Self::DuplicateVote => "duplicate_vote",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::BadRequest(_) => "bad_request",
            Self::StorageWrite(_) => "db_insert_failed",
            Self::Database(_) => "database_error",
            Self::Migration(_) => "migration_failed",
            Self::Config(_) => "config_error",
            Self::Cache(_) => "cache_error",
            Self::Timeout(_) => "timeout",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Returns how this error should be reported.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Migration(_) | Self::Cache(_) => Severity::Warning,
            _ if self.status_code().is_server_error() => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Structured form handed to the transport layer.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.error_code(),
            message: self.to_string(),
            http_status: self.status_code().as_u16(),
            severity: self.severity(),
        }
    }
}

/// Serialized error payload: `{code, message, httpStatus, severity}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// HTTP status the boundary should answer with.
    pub http_status: u16,
    /// Reporting severity.
    pub severity: Severity,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_body();

        if self.is_server_error() {
            tracing::error!(error = %self, code = body.code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = body.code, "Client error occurred");
        }

        (status, Json(body)).into_response()
    }
}

// === From implementations ===

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_error_codes() {
        assert_eq!(AppError::InvalidOption(9).error_code(), "invalid_option");
        assert_eq!(AppError::DuplicateVote.error_code(), "duplicate_vote");
        assert_eq!(
            AppError::StorageWrite("connection reset".to_string()).error_code(),
            "db_insert_failed"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::DuplicateVote.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidPostId(0).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::StorageWrite(String::new()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Timeout("rollup".to_string()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_severity() {
        assert_eq!(AppError::DuplicateVote.severity(), Severity::Info);
        assert_eq!(AppError::InvalidOption(-1).severity(), Severity::Info);
        assert_eq!(AppError::Migration("x".into()).severity(), Severity::Warning);
        assert_eq!(AppError::Config("x".into()).severity(), Severity::Error);
    }

    #[test]
    fn test_error_body_serialization() {
        let body = AppError::DuplicateVote.to_body();
        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(json["code"], "duplicate_vote");
        assert_eq!(json["httpStatus"], 400);
        assert_eq!(json["severity"], "info");
        assert_eq!(json["message"], "You have already voted");
    }
}
