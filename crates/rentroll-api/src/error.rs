//! HTTP error taxonomy.
//!
//! Every failure leaves the service as `{"error": {"code", "message"}}` with
//! a stable code:
//! - `E1xxx`: the request itself is wrong
//! - `E2xxx`: authentication and authorization
//! - `E3xxx`: a dependency is unavailable
//! - `E9999`: anything else

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rentroll_core::CoreError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Result type for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Request conflicts with existing data.
    #[error("{0}")]
    Conflict(String),

    /// Upload is not a readable workbook.
    #[error("{0}")]
    InvalidWorkbook(String),

    /// Upload exceeds the configured size limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated user lacks the required role.
    #[error("{0}")]
    Forbidden(String),

    /// No fee service is configured.
    #[error("Fee recalculation service is not configured")]
    FeeServiceUnavailable,

    /// Fee service call failed.
    #[error("Fee recalculation failed: {0}")]
    FeeService(String),

    /// Unexpected failure; details are logged, not returned.
    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Stable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E1001",
            Self::NotFound(_) => "E1002",
            Self::Conflict(_) => "E1003",
            Self::InvalidWorkbook(_) => "E1004",
            Self::PayloadTooLarge(_) => "E1005",
            Self::Unauthorized(_) => "E2001",
            Self::Forbidden(_) => "E2002",
            Self::FeeServiceUnavailable => "E3001",
            Self::FeeService(_) => "E3002",
            Self::Internal(_) => "E9999",
        }
    }

    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidWorkbook(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::FeeServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::FeeService(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error code and message.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Code from the taxonomy above.
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(detail = %detail, "Request failed with internal error");
        }

        let body = ErrorResponse {
            error: ErrorDetail { code: self.code().to_string(), message: self.to_string() },
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => Self::NotFound(msg),
            CoreError::InvalidInput(msg) => Self::Validation(msg),
            CoreError::InvalidWorkbook(msg) => Self::InvalidWorkbook(format!("Could not read workbook: {msg}")),
            e @ CoreError::ConstraintViolation(_) if e.is_unique_violation() => {
                Self::Conflict("A record with the same key already exists".to_string())
            },
            CoreError::ConstraintViolation(msg) => Self::Validation(msg),
            CoreError::Database(msg) => Self::Internal(msg),
        }
    }
}
