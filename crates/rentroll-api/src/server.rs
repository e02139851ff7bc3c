//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement
//! 4. Authentication and role checks (per route group)
//! 5. Handler execution
//!
//! Route groups:
//! - probes and alias report lookups are public
//! - rentals, reports and the catalog need a valid bearer token
//! - alias management needs an administrator

use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    handlers::{self, aliases, catalog, imports, rentals, reports},
    middleware::auth::{require_admin, require_user},
    AppState,
};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Creates the router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        .route("/api/aliases/reports", get(aliases::alias_reports))
        .route("/api/aliases/{id}/owners/reports", get(aliases::alias_owner_reports));

    let user_routes = Router::new()
        .route("/api/rentals", get(rentals::list_rentals).post(rentals::create_rental))
        .route(
            "/api/rentals/{id}",
            get(rentals::get_rental).put(rentals::update_rental).delete(rentals::delete_rental),
        )
        .route(
            "/api/rentals/import",
            post(imports::import_workbook)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD))),
        )
        .route("/api/rentals/recalculate-fees", post(rentals::recalculate_fees))
        .route("/api/rentals/years", get(reports::available_years))
        .route("/api/rentals/latest-period", get(reports::latest_period))
        .route("/api/rentals/totals/by-property", get(reports::totals_by_property))
        .route("/api/rentals/totals/by-month", get(reports::totals_by_month))
        .route("/api/rentals/distribution", get(reports::distribution))
        .route("/api/rentals/distribution/yearly", get(reports::yearly_distribution))
        .route("/api/properties", get(catalog::list_properties).post(catalog::create_property))
        .route("/api/owners", get(catalog::list_owners).post(catalog::create_owner))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let admin_routes = Router::new()
        .route("/api/aliases", get(aliases::list_aliases).post(aliases::create_alias))
        .route("/api/aliases/owners/available", get(aliases::available_owners))
        .route("/api/aliases/stats", get(aliases::alias_stats))
        .route(
            "/api/aliases/{id}",
            get(aliases::get_alias).put(aliases::update_alias).delete(aliases::delete_alias),
        )
        .route("/api/aliases/{id}/owners", get(aliases::alias_owners))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, state.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Adds an `X-Request-Id` header to every response.
async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Serves requests until CTRL+C or SIGTERM.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for CTRL+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
