//! Rentroll HTTP API.
//!
//! Wires the core repositories, importer and report builders to an axum
//! router with bearer-token authentication.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{sync::Arc, time::Duration};

use rentroll_core::{Clock, RealClock, Storage};

pub mod config;
pub mod error;
pub mod fees;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use fees::{FeeCalculator, HttpFeeCalculator, Unconfigured};
pub use middleware::auth::{CurrentUser, JwtVerifier, Role, TokenVerifier};
pub use server::{create_router, start_server};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Repositories.
    pub storage: Arc<Storage>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
    /// Bearer-token verifier.
    pub verifier: Arc<dyn TokenVerifier>,
    /// Fee recalculation service.
    pub fees: Arc<dyn FeeCalculator>,
    /// Largest accepted upload in bytes.
    pub max_upload_bytes: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl AppState {
    /// State with the real clock, no fee service and default limits.
    pub fn new(storage: Arc<Storage>, verifier: Arc<dyn TokenVerifier>) -> Self {
        let defaults = Config::default();
        Self {
            storage,
            clock: Arc::new(RealClock::new()),
            verifier,
            fees: Arc::new(Unconfigured),
            max_upload_bytes: defaults.max_upload_bytes,
            request_timeout: defaults.request_timeout(),
        }
    }

    /// State built from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the fee service client cannot be built.
    pub fn from_config(storage: Arc<Storage>, config: &Config) -> anyhow::Result<Self> {
        let fees: Arc<dyn FeeCalculator> = match &config.fee_service_url {
            Some(url) => Arc::new(HttpFeeCalculator::new(url, config.fee_service_timeout())?),
            None => Arc::new(Unconfigured),
        };

        Ok(Self {
            storage,
            clock: Arc::new(RealClock::new()),
            verifier: Arc::new(JwtVerifier::new(&config.jwt_secret)),
            fees,
            max_upload_bytes: config.max_upload_bytes,
            request_timeout: config.request_timeout(),
        })
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the fee calculator.
    #[must_use]
    pub fn with_fee_calculator(mut self, fees: Arc<dyn FeeCalculator>) -> Self {
        self.fees = fees;
        self
    }

    /// Replaces the upload limit.
    #[must_use]
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}
