use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::models::ErrorResponse;

/// AppError
///
/// Every failure a handler can hit. Converted into an HTTP status and a
/// `{"error": "..."}` body at the endpoint boundary; internal details of
/// storage and filesystem failures are logged, never returned.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Rejected upload or malformed form body.
    #[error("{0}")]
    Validation(String),

    /// Uploaded image exceeds the size cap.
    #[error("File too large")]
    PayloadTooLarge,

    /// Missing or wrong admin token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Source address exceeded its request quota.
    #[error("Too many requests, please try again later.")]
    RateLimited,

    /// The record store failed to read or write.
    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    /// The content directory could not be written.
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Storage(_) | AppError::Filesystem(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(err) => {
                tracing::error!(error = %err, "Record store failure");
                "Database error".to_string()
            }
            AppError::Filesystem(err) => {
                tracing::error!(error = %err, "Content directory failure");
                "Failed to store uploaded file".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    /// Body-limit overruns surface as multipart errors carrying a 413 status.
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::Validation(err.body_text())
        }
    }
}
