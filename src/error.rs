//! Error types for Shelfmark server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request is well-formed but conflicts with the current state
    /// (no copies left, active borrow exists, wrong lifecycle state)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Human readable description
    pub detail: String,
    /// Underlying error, only present for database integrity failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ErrorResponse) {
        let plain = |status: StatusCode, msg: &str| {
            (
                status,
                ErrorResponse {
                    detail: msg.to_string(),
                    error: None,
                },
            )
        };

        match self {
            AppError::Authentication(msg) => plain(StatusCode::UNAUTHORIZED, msg),
            AppError::Authorization(msg) => plain(StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => plain(StatusCode::NOT_FOUND, msg),
            AppError::Validation(msg) => plain(StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => plain(StatusCode::BAD_REQUEST, msg),
            AppError::BadRequest(msg) => plain(StatusCode::BAD_REQUEST, msg),
            AppError::Database(sqlx::Error::Database(db)) => {
                tracing::error!("Database integrity error: {}", db);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        detail: "Database integrity error".to_string(),
                        error: Some(db.message().to_string()),
                    },
                )
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                plain(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_are_bad_requests() {
        let (status, body) = AppError::Conflict("No copies available".into()).status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.detail, "No copies available");
        assert!(body.error.is_none());
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Authentication("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Authorization("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (AppError::Database(sqlx::Error::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status_and_body().0, expected);
        }
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let (_, body) = AppError::Internal("secret stack trace".into()).status_and_body();
        assert_eq!(body.detail, "Internal server error");
    }

    #[test]
    fn test_body_serializes_detail_only() {
        let (_, body) = AppError::Authorization("Not allowed".into()).status_and_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "detail": "Not allowed" }));
    }
}
