//! Domain error types for the appraisal server.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::fmt;

use crate::services::analysis::AnalysisError;
use crate::services::storage::{FileValidationError, StorageError};

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Durable store unavailable or a query failed
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Uploaded file rejected before processing
    #[error("File validation failed: {0}")]
    FileValidation(#[from] FileValidationError),

    /// Storage backend operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Analysis backend failed
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Unexpected failure outside the store, e.g. an aborted task
    #[error("Internal error: {0}")]
    Internal(String),

    /// Server is at capacity
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code, response_message) = match self {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::Internal(err_str) => {
                tracing::error!("Internal error: {}", err_str);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AppError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", self.to_string())
            }
            AppError::Unauthorized(_) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string())
            }
            AppError::FileValidation(FileValidationError::TooLarge { .. }) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "FILE_VALIDATION_ERROR",
                self.to_string(),
            ),
            AppError::FileValidation(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "FILE_VALIDATION_ERROR",
                self.to_string(),
            ),
            AppError::Storage(_) => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR", self.to_string()),
            AppError::Analysis(_) => {
                (StatusCode::BAD_GATEWAY, "ANALYSIS_ERROR", self.to_string())
            }
            AppError::ServiceUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                self.to_string(),
            ),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: error_code.to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Database(err.to_string())
    }
}
