use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::session::SessionError;
use crate::auth::store::StoreError;
use crate::auth::validation::FieldViolation;
use crate::auth::{AuthError, AuthFailureReason};
use crate::divider::DivideError;

pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed. Please try again.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    Validation(Vec<FieldViolation>),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Authentication failed: {0:?}")]
    AuthFailure(AuthFailureReason),

    #[error("Already authenticated")]
    AlreadyAuthenticated,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(msg) => AppError::InvalidInput(msg),
            AuthError::DuplicateUsername => AppError::DuplicateUsername,
            AuthError::DuplicateEmail => AppError::DuplicateEmail,
            AuthError::AuthFailure(reason) => AppError::AuthFailure(reason),
            AuthError::Hashing(msg) => AppError::Internal(anyhow::anyhow!(msg)),
            AuthError::Storage(e) => AppError::Storage(e),
        }
    }
}

/// Bodies axum cannot decode (bad JSON syntax, wrong content type, fields of
/// the wrong type) still answer with the JSON error envelope.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}

impl From<DivideError> for AppError {
    fn from(err: DivideError) -> Self {
        match err {
            DivideError::InvalidArgument(msg) => AppError::InvalidArgument(msg.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "One or more fields are invalid".to_string(),
            ),
            AppError::InvalidArgument(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT", msg.clone())
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg.clone()),
            AppError::MalformedBody(detail) => {
                tracing::debug!("Rejected request body: {detail}");
                (
                    StatusCode::BAD_REQUEST,
                    "MALFORMED_BODY",
                    "Request body is not valid JSON for this endpoint".to_string(),
                )
            }
            AppError::DuplicateUsername => (
                StatusCode::CONFLICT,
                "DUPLICATE_USERNAME",
                AuthError::DuplicateUsername.to_string(),
            ),
            AppError::DuplicateEmail => (
                StatusCode::CONFLICT,
                "DUPLICATE_EMAIL",
                AuthError::DuplicateEmail.to_string(),
            ),
            // NotFound and WrongPassword must stay indistinguishable to the caller.
            AppError::AuthFailure(reason) => match reason {
                AuthFailureReason::Deactivated => (
                    StatusCode::FORBIDDEN,
                    "ACCOUNT_DEACTIVATED",
                    reason.user_message().to_string(),
                ),
                AuthFailureReason::NotFound | AuthFailureReason::WrongPassword => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    reason.user_message().to_string(),
                ),
            },
            AppError::AlreadyAuthenticated => (
                StatusCode::CONFLICT,
                "ALREADY_AUTHENTICATED",
                "You are already signed in".to_string(),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::RegistrationFailed(cause) => {
                tracing::error!("Registration error: {cause}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "REGISTRATION_FAILED",
                    REGISTRATION_FAILED_MESSAGE.to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Session(e) => {
                tracing::error!("Session store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SESSION_ERROR",
                    "A session storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = match &self {
            AppError::Validation(fields) => json!({
                "error": {
                    "code": code,
                    "message": message,
                    "fields": fields
                }
            }),
            _ => json!({
                "error": {
                    "code": code,
                    "message": message
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}
