//! Centralized API error handling
//!
//! Every module error is converted into [`ApiError`] at the HTTP boundary,
//! which maps it to a status code and renders `{ "message", "code" }`.
//! Server-side faults are logged with their cause and reach the client only
//! as a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::{AuthError, JwtError};
use crate::deadline::DeadlineExceeded;
use crate::files::FileStoreError;
use crate::reference::ReferenceError;
use crate::requests::RequestError;
use crate::store::{ObjectIdError, StoreError};

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("{0}")]
    Timeout(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("{0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::Timeout(_) => "TIMEOUT",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The message shown to the client
    pub fn public_message(&self) -> String {
        match self {
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        match &self {
            ApiError::InternalError(_) | ApiError::DatabaseError(_) => {
                tracing::error!(error = %self, code = %error_code, "Server error occurred");
            }
            _ => {
                tracing::debug!(error = %self, code = %error_code, "Client error occurred");
            }
        }

        let body = ErrorResponse {
            message: self.public_message(),
            code: error_code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

// Conversions from module errors

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { .. } => ApiError::Conflict("Duplicate record".to_string()),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ObjectIdError> for ApiError {
    fn from(err: ObjectIdError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<DeadlineExceeded> for ApiError {
    fn from(err: DeadlineExceeded) -> Self {
        ApiError::Timeout(err.to_string())
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            JwtError::EncodingFailed(e) => ApiError::InternalError(e),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(msg) => ApiError::ValidationError(msg),
            AuthError::InvalidCredentials | AuthError::TokenRevoked => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthError::Token(e) => e.into(),
            AuthError::UsernameTaken(_) | AuthError::RoleExists(_) => {
                ApiError::Conflict(err.to_string())
            }
            AuthError::ReservedRole(_) | AuthError::Forbidden(_) => {
                ApiError::Forbidden(err.to_string())
            }
            AuthError::RoleNotFound(_) | AuthError::ReferenceNotFound { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            AuthError::UserNotFound | AuthError::ProfileNotFound => {
                ApiError::NotFound(err.to_string())
            }
            AuthError::Password(e) => ApiError::InternalError(e.to_string()),
            AuthError::Store(e) => e.into(),
            AuthError::Timeout(e) => e.into(),
        }
    }
}

impl From<FileStoreError> for ApiError {
    fn from(err: FileStoreError) -> Self {
        match err {
            FileStoreError::EmptyFile(_) => ApiError::BadRequest(err.to_string()),
            FileStoreError::Io(e) => ApiError::InternalError(e.to_string()),
            FileStoreError::Store(e) => e.into(),
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Validation(msg) => ApiError::ValidationError(msg),
            RequestError::InvalidId { .. } => ApiError::BadRequest(err.to_string()),
            RequestError::NotFound
            | RequestError::ReferenceNotFound { .. }
            | RequestError::NoDocuments => ApiError::NotFound(err.to_string()),
            RequestError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            RequestError::Forbidden(msg) => ApiError::Forbidden(msg),
            RequestError::Attachment(e) => e.into(),
            RequestError::Aggregation(e) => {
                ApiError::InternalError(format!("aggregation failed: {}", e))
            }
            RequestError::Store(e) => e.into(),
            RequestError::Timeout(e) => e.into(),
        }
    }
}

impl From<ReferenceError> for ApiError {
    fn from(err: ReferenceError) -> Self {
        match err {
            ReferenceError::Validation(msg) => ApiError::ValidationError(msg),
            ReferenceError::ParentNotFound { .. } => ApiError::NotFound(err.to_string()),
            ReferenceError::Forbidden(msg) => ApiError::Forbidden(msg),
            ReferenceError::Store(e) => e.into(),
            ReferenceError::Timeout(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
