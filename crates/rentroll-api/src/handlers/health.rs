//! Health check handlers for service monitoring.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use rentroll_core::{Clock, Storage};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// When the check ran.
    pub timestamp: DateTime<Utc>,
    /// Database check.
    pub database: ComponentHealth,
    /// Service version.
    pub version: String,
}

/// Overall health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Database reachable.
    Healthy,
    /// Database unreachable.
    Unhealthy,
}

/// Result of one component check.
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    /// `up` or `down`.
    pub status: &'static str,
    /// Failure detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Round-trip time in milliseconds.
    pub response_time_ms: u64,
}

/// Runs health checks against a clock so timestamps are testable.
pub struct HealthService {
    clock: Arc<dyn Clock>,
}

impl HealthService {
    /// Creates a service reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Checks the database.
    pub async fn check(&self, storage: &Storage) -> HealthResponse {
        let timestamp = self.clock.now_utc();
        let started = self.clock.now();

        let (status, database_status, message) = match storage.health_check().await {
            Ok(()) => (HealthStatus::Healthy, "up", None),
            Err(e) => {
                error!("Database health check failed: {}", e);
                (HealthStatus::Unhealthy, "down", Some(format!("Database connection failed: {e}")))
            },
        };

        let elapsed = self.clock.now().saturating_duration_since(started);

        HealthResponse {
            status,
            timestamp,
            database: ComponentHealth {
                status: database_status,
                message,
                response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Health endpoint: 200 when the database answers, 503 otherwise.
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Response {
    let response = HealthService::new(state.clock.clone()).check(&state.storage).await;

    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    debug!(status = ?response.status, "Health check completed");

    (status_code, Json(response)).into_response()
}

/// Readiness probe; same checks as [`health_check`].
#[instrument(name = "readiness_check", skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    health_check(State(state)).await
}

/// Liveness probe; never touches the database.
#[instrument(name = "liveness_check", skip(state))]
pub async fn liveness_check(State(state): State<AppState>) -> Response {
    let response = serde_json::json!({
        "status": "alive",
        "timestamp": state.clock.now_utc(),
        "service": "rentroll-api"
    });

    (StatusCode::OK, Json(response)).into_response()
}
