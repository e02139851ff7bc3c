//! HTTP request handlers.
//!
//! Every handler validates its input before touching the database, so bad
//! requests are answered with 400 even when the database is down.
//!
//! - `health`: liveness and readiness probes
//! - `rentals`: rental record CRUD and fee recalculation
//! - `imports`: spreadsheet upload
//! - `reports`: totals and distribution matrices
//! - `aliases`: owner groupings
//! - `catalog`: properties and owners

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query,
    },
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

pub mod aliases;
pub mod catalog;
pub mod health;
pub mod imports;
pub mod reports;
pub mod rentals;

pub use health::{health_check, liveness_check, readiness_check};

/// Success envelope used by the rental and catalog endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always true.
    pub success: bool,
    /// Payload.
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Wraps `data` in a success envelope.
pub fn ok<T: Serialize>(data: T) -> ApiResponse<T> {
    ApiResponse { success: true, data }
}

/// Unwraps query parameters, reporting rejections in the error format.
pub(crate) fn query<T>(query: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    query.map(|Query(q)| q).map_err(|e| ApiError::Validation(e.body_text()))
}

/// Unwraps a JSON body, reporting rejections in the error format.
pub(crate) fn json<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(b)| b).map_err(|e| ApiError::Validation(e.body_text()))
}

/// Unwraps a path parameter, reporting rejections in the error format.
pub(crate) fn path<T>(path: Result<Path<T>, PathRejection>) -> ApiResult<T> {
    path.map(|Path(p)| p).map_err(|e| ApiError::Validation(e.body_text()))
}

/// Checks that an optional value lies in `range`.
pub(crate) fn check_range<T>(name: &str, value: Option<T>, range: std::ops::RangeInclusive<T>) -> ApiResult<()>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    match value {
        Some(v) if !range.contains(&v) => Err(ApiError::Validation(format!(
            "{name} must be between {} and {}, got {v}",
            range.start(),
            range.end()
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_accepts_absent_and_bounds() {
        assert!(check_range("month", None::<i32>, 1..=12).is_ok());
        assert!(check_range("month", Some(12), 1..=12).is_ok());
        let err = check_range("month", Some(13), 1..=12).unwrap_err();
        assert_eq!(err.to_string(), "month must be between 1 and 12, got 13");
    }
}
