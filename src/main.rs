//! Rentroll rental income service.
//!
//! Loads configuration, connects to PostgreSQL, applies migrations and
//! serves the HTTP API until a shutdown signal arrives.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use rentroll_api::{AppState, Config};
use rentroll_core::Storage;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log);

    info!(
        database_url = %config.database_url_masked(),
        host = %config.host,
        port = config.port,
        max_connections = config.database_max_connections,
        fee_service = config.fee_service_url.as_deref().unwrap_or("disabled"),
        "Configuration loaded"
    );
    if config.uses_default_jwt_secret() {
        warn!("JWT_SECRET is not set; using the development secret");
    }

    let addr = config.parse_server_addr()?;

    let db_pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    sqlx::migrate!("./migrations").run(&db_pool).await.context("Failed to run database migrations")?;
    info!("Database migrations completed");

    let storage = Arc::new(Storage::new(db_pool.clone()));
    let state = AppState::from_config(storage, &config)?;

    rentroll_api::start_server(state, addr).await.context("HTTP server failed")?;

    db_pool.close().await;
    info!("Rentroll shutdown complete");
    Ok(())
}

/// Initializes tracing; `RUST_LOG` in the environment wins over config.
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool, retrying while the server starts.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);
    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .idle_timeout(Duration::from_secs(config.database_idle_timeout))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                warn!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}
