use crate::models::ValidationFailure;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Message returned for every failed sign-in, whatever the cause.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Sign-in failed. The email or password is incorrect.";

#[derive(Debug, Error)]
pub enum AcError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Unknown email or wrong password. Built only through
    /// [`AcError::invalid_credentials`] so both paths stay identical.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationFailure>),

    /// Request body or path could not be extracted.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Insufficient permission: {0}")]
    InsufficientPermission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Owner was removed from the acting user but could neither be granted
    /// to the target nor restored. Requires manual reassignment.
    #[error("Owner transfer left no owner assigned")]
    OwnerTransferIncomplete,

    #[error("Internal server error")]
    Internal,
}

impl AcError {
    /// The one constructor for authentication failures.
    pub fn invalid_credentials() -> Self {
        AcError::InvalidCredentials
    }

    /// Convenience for a single validation failure.
    pub fn validation(failure: ValidationFailure) -> Self {
        AcError::Validation(vec![failure])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AcError::Validation(_) | AcError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AcError::InvalidCredentials | AcError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AcError::InsufficientPermission(_) => StatusCode::FORBIDDEN,
            AcError::NotFound(_) => StatusCode::NOT_FOUND,
            AcError::Conflict(_) => StatusCode::CONFLICT,
            AcError::Database(_)
            | AcError::Crypto(_)
            | AcError::OwnerTransferIncomplete
            | AcError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AcError {
    fn from(rejection: JsonRejection) -> Self {
        AcError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AcError {
    fn from(rejection: PathRejection) -> Self {
        AcError::BadRequest(rejection.body_text())
    }
}

fn summarize(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(|f| f.code())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    failures: Option<Vec<ValidationFailure>>,
}

impl IntoResponse for AcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (code, message, failures) = match self {
            AcError::Database(_) => (
                "DATABASE_ERROR",
                "An internal database error occurred".to_string(),
                None,
            ),
            AcError::Crypto(_) => (
                "CRYPTO_ERROR",
                "An internal cryptographic error occurred".to_string(),
                None,
            ),
            AcError::InvalidCredentials => (
                "INVALID_CREDENTIALS",
                INVALID_CREDENTIALS_MESSAGE.to_string(),
                None,
            ),
            AcError::Validation(failures) => (
                "VALIDATION_FAILED",
                "The request did not pass validation".to_string(),
                Some(failures),
            ),
            AcError::BadRequest(reason) => ("BAD_REQUEST", reason, None),
            AcError::InsufficientPermission(reason) => ("INSUFFICIENT_PERMISSION", reason, None),
            AcError::NotFound(what) => ("NOT_FOUND", what, None),
            AcError::InvalidToken(reason) => ("INVALID_TOKEN", reason, None),
            AcError::Conflict(reason) => ("CONFLICT", reason, None),
            AcError::OwnerTransferIncomplete => (
                "OWNER_TRANSFER_INCOMPLETE",
                "Owner transfer could not be completed".to_string(),
                None,
            ),
            AcError::Internal => (
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                failures,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
