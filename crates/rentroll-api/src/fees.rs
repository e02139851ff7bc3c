//! Client for the external fee recalculation service.
//!
//! The service owns the rules that split each property's administration fee
//! among its owners. This crate only triggers a full recalculation and relays
//! the summary it returns.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ApiError;

/// Summary returned by the fee service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeeRecalculationSummary {
    /// Records whose owner fee changed.
    #[serde(default)]
    pub updated: u64,
    /// Per-record failures reported by the service.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Any further fields the service reports.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// Fee service failures.
#[derive(Debug, Error)]
pub enum FeeError {
    /// No service URL is configured.
    #[error("fee service is not configured")]
    NotConfigured,
    /// The request could not be completed.
    #[error("request failed: {0}")]
    Request(String),
    /// The service answered with an error status.
    #[error("service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

impl From<FeeError> for ApiError {
    fn from(err: FeeError) -> Self {
        match err {
            FeeError::NotConfigured => Self::FeeServiceUnavailable,
            other => Self::FeeService(other.to_string()),
        }
    }
}

/// Recalculates owner administration fees.
#[async_trait]
pub trait FeeCalculator: Send + Sync {
    /// Recalculates every record.
    async fn recalculate_all(&self) -> Result<FeeRecalculationSummary, FeeError>;
}

/// Stand-in used when no fee service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait]
impl FeeCalculator for Unconfigured {
    async fn recalculate_all(&self) -> Result<FeeRecalculationSummary, FeeError> {
        Err(FeeError::NotConfigured)
    }
}

/// Fee service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeeCalculator {
    client: reqwest::Client,
    endpoint: String,
}

const MAX_ERROR_BODY: usize = 512;

impl HttpFeeCalculator {
    /// Creates a client posting to `<base_url>/recalculate`.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Request` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rentroll/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FeeError::Request(e.to_string()))?;

        Ok(Self { client, endpoint: format!("{}/recalculate", base_url.trim_end_matches('/')) })
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FeeCalculator for HttpFeeCalculator {
    async fn recalculate_all(&self) -> Result<FeeRecalculationSummary, FeeError> {
        let response = self
            .client
            .post(&self.endpoint)
            .send()
            .await
            .map_err(|e| FeeError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            warn!(status = status.as_u16(), "Fee service rejected recalculation");
            return Err(FeeError::Status { status: status.as_u16(), body });
        }

        let summary: FeeRecalculationSummary =
            response.json().await.map_err(|e| FeeError::Request(e.to_string()))?;
        info!(updated = summary.updated, errors = summary.errors.len(), "Fees recalculated");

        Ok(summary)
    }
}
