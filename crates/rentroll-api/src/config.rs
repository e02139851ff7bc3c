//! Service configuration.

use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "rentroll.toml";

const MIN_JWT_SECRET_LEN: usize = 16;

/// Complete service configuration.
///
/// Loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`rentroll.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// # Example
///
/// ```no_run
/// use rentroll_api::Config;
///
/// let config = Config::load().expect("Failed to load configuration");
/// println!("Server will bind to {}:{}", config.host, config.port);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Database
    /// PostgreSQL connection URL.
    ///
    /// Environment variable: `DATABASE_URL`
    #[serde(default = "default_database_url", alias = "DATABASE_URL")]
    pub database_url: String,
    /// Maximum number of database connections in the pool.
    ///
    /// Environment variable: `DATABASE_MAX_CONNECTIONS`
    #[serde(default = "default_max_connections", alias = "DATABASE_MAX_CONNECTIONS")]
    pub database_max_connections: u32,
    /// Minimum number of connections to maintain in the pool.
    ///
    /// Environment variable: `DATABASE_MIN_CONNECTIONS`
    #[serde(default = "default_min_connections", alias = "DATABASE_MIN_CONNECTIONS")]
    pub database_min_connections: u32,
    /// Connection acquire timeout in seconds.
    ///
    /// Environment variable: `DATABASE_CONNECTION_TIMEOUT`
    #[serde(default = "default_acquire_timeout", alias = "DATABASE_CONNECTION_TIMEOUT")]
    pub database_connection_timeout: u64,
    /// Connection idle timeout in seconds.
    ///
    /// Environment variable: `DATABASE_IDLE_TIMEOUT`
    #[serde(default = "default_idle_timeout", alias = "DATABASE_IDLE_TIMEOUT")]
    pub database_idle_timeout: u64,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,
    /// Largest accepted workbook upload in bytes.
    ///
    /// Environment variable: `MAX_UPLOAD_BYTES`
    #[serde(default = "default_max_upload_bytes", alias = "MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // Authentication
    /// HS256 secret used to verify bearer tokens. Never serialized.
    ///
    /// Environment variable: `JWT_SECRET`
    #[serde(default = "default_jwt_secret", alias = "JWT_SECRET", skip_serializing)]
    pub jwt_secret: String,

    // Fee service
    /// Base URL of the fee recalculation service; unset disables it.
    ///
    /// Environment variable: `FEE_SERVICE_URL`
    #[serde(default, alias = "FEE_SERVICE_URL")]
    pub fee_service_url: Option<String>,
    /// Fee service request timeout in seconds.
    ///
    /// Environment variable: `FEE_SERVICE_TIMEOUT_SECONDS`
    #[serde(default = "default_fee_service_timeout", alias = "FEE_SERVICE_TIMEOUT_SECONDS")]
    pub fee_service_timeout_seconds: u64,

    // Logging
    /// Log filter directive.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file and environment.
    ///
    /// # Errors
    ///
    /// Returns error if a source cannot be parsed or validation fails.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Parse server socket address from host and port.
    ///
    /// # Errors
    ///
    /// Returns error if host and port do not form a socket address.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Database URL with the password masked for logging.
    pub fn database_url_masked(&self) -> String {
        if let Some(at_pos) = self.database_url.find('@') {
            if let Some(colon_pos) = self.database_url[..at_pos].rfind(':') {
                let mut masked = self.database_url.clone();
                masked.replace_range(colon_pos + 1..at_pos, "***");
                return masked;
            }
        }
        self.database_url.clone()
    }

    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Fee service timeout as a duration.
    pub fn fee_service_timeout(&self) -> Duration {
        Duration::from_secs(self.fee_service_timeout_seconds)
    }

    /// Returns true when the built-in development secret is in use.
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == default_jwt_secret()
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.database_max_connections == 0 {
            anyhow::bail!("database max_connections must be greater than 0");
        }

        if self.database_min_connections > self.database_max_connections {
            anyhow::bail!("database min_connections cannot exceed max_connections");
        }

        if self.request_timeout == 0 {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        if self.max_upload_bytes == 0 {
            anyhow::bail!("max_upload_bytes must be greater than 0");
        }

        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("jwt_secret must be at least {MIN_JWT_SECRET_LEN} characters");
        }

        if let Some(url) = &self.fee_service_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                anyhow::bail!("fee_service_url must be an http(s) URL");
            }
        }

        if self.fee_service_timeout_seconds == 0 {
            anyhow::bail!("fee_service_timeout_seconds must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            database_max_connections: default_max_connections(),
            database_min_connections: default_min_connections(),
            database_connection_timeout: default_acquire_timeout(),
            database_idle_timeout: default_idle_timeout(),
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            jwt_secret: default_jwt_secret(),
            fee_service_url: None,
            fee_service_timeout_seconds: default_fee_service_timeout(),
            rust_log: default_log_level(),
        }
    }
}

fn default_database_url() -> String {
    "postgresql://localhost/rentroll".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_jwt_secret() -> String {
    "rentroll-development-secret".to_string()
}

fn default_fee_service_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}
