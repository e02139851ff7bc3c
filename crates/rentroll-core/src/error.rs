//! Error types and result handling for core operations.
//!
//! Storage failures are classified so the HTTP layer can map them onto
//! client or server errors without inspecting driver-specific details.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for internal operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uploaded workbook could not be read.
    #[error("Invalid workbook: {0}")]
    InvalidWorkbook(String),
}

impl CoreError {
    /// Returns true when the error came from a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(msg) if msg.starts_with("unique"))
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("requested entity not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(format!("unique constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::ConstraintViolation(format!("foreign key constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::ConstraintViolation(format!("check constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

impl From<calamine::Error> for CoreError {
    fn from(err: calamine::Error) -> Self {
        Self::InvalidWorkbook(err.to_string())
    }
}
