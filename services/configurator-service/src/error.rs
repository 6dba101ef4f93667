// =============================================================================
// ERROR MODULE
// =============================================================================
// Error types and their HTTP responses.
//
// - ValidationError: questionnaire rejected by the engine (client's fault)
// - AppError: everything a handler can fail with, mapped to a status code
//
// Errors sent to clients never include database internals.
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// =============================================================================
// VALIDATION ERROR
// =============================================================================
/// Input the selection engine refuses to compute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Outdoor plus indoor camera count is zero
    #[error("select at least one camera")]
    NoCameras,
}

// =============================================================================
// APPLICATION ERROR
// =============================================================================
#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // INFRASTRUCTURE ERRORS
    // -------------------------------------------------------------------------
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // BUSINESS LOGIC ERRORS
    // -------------------------------------------------------------------------
    /// Product or configuration not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Questionnaire rejected by the engine
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // -------------------------------------------------------------------------
    // INTERNAL ERRORS
    // -------------------------------------------------------------------------
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status, machine-readable code and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            AppError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                err.to_string(),
            ),

            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
            ),

            AppError::Serialization(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERIALIZATION_ERROR",
                "A stored document could not be read".to_string(),
            ),

            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                msg.clone(),
            ),
        }
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        // Client errors (4xx) are logged at info
        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                error = %self,
                "Request failed"
            );
        } else {
            tracing::info!(
                error_code = error_code,
                message = %message,
                "Request rejected"
            );
        }

        let body = match &self {
            AppError::Validation(ValidationError::NoCameras) => ErrorResponse::with_details(
                error_code,
                message,
                "outdoor_cam_count + indoor_cam_count must be greater than zero",
            ),
            _ => ErrorResponse::new(error_code, message),
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// RESULT TYPE ALIAS
// =============================================================================
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// CONVERSION HELPERS
// =============================================================================

/// Database and document errors keep their own variant when wrapped in
/// `anyhow` context by the db layer.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        let context = err.to_string();
        let err = match err.downcast::<sqlx::Error>() {
            Ok(db) => {
                tracing::debug!(context = %context, "Database error");
                return AppError::Database(db);
            }
            Err(err) => err,
        };
        match err.downcast::<serde_json::Error>() {
            Ok(json) => {
                tracing::debug!(context = %context, "Serialization error");
                AppError::Serialization(json)
            }
            Err(err) => AppError::Internal(err.to_string()),
        }
    }
}
