//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Responses are JSON `{"error": "..."}` bodies;
//! internal error detail never reaches the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::otp::OtpError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// OTP operation failed.
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(_) | Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
                }
                AuthError::EmailNotVerified => (
                    StatusCode::BAD_REQUEST,
                    "Please verify your email first".to_string(),
                ),
                AuthError::UserAlreadyExists => {
                    (StatusCode::BAD_REQUEST, "User already exists".to_string())
                }
                AuthError::PasswordMismatch => (
                    StatusCode::BAD_REQUEST,
                    "Passwords do not match".to_string(),
                ),
                AuthError::WeakPassword(_) => {
                    (StatusCode::BAD_REQUEST, "Password is too weak".to_string())
                }
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email".to_string())
                }
                AuthError::PasswordHash | AuthError::Repository(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Signup failed".to_string(),
                ),
            },
            Self::Otp(err) => match err {
                OtpError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email".to_string())
                }
                OtpError::NotFound => (StatusCode::BAD_REQUEST, "Invalid OTP".to_string()),
                OtpError::CodeMismatch => (StatusCode::BAD_REQUEST, "Incorrect OTP".to_string()),
                OtpError::Expired => (StatusCode::BAD_REQUEST, "OTP has expired".to_string()),
                OtpError::AlreadyUsed => {
                    (StatusCode::BAD_REQUEST, "OTP already used".to_string())
                }
                OtpError::Repository(_) | OtpError::Dispatch(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to send OTP".to_string(),
                ),
            },
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
