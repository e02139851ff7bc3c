//! Property and owner reference data.

use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use rentroll_core::{NewOwner, NewProperty, Owner, Property};
use tracing::{info, instrument};

use super::{json, ok, ApiResponse};
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Lists properties by name.
#[instrument(name = "list_properties", skip(state))]
pub async fn list_properties(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<Property>>> {
    Ok(ok(state.storage.properties.list().await?))
}

/// Registers a property.
#[instrument(name = "create_property", skip(state, body))]
pub async fn create_property(
    State(state): State<AppState>,
    body: Result<Json<NewProperty>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let property = json(body)?;
    if property.name.trim().is_empty() {
        return Err(ApiError::Validation("Property name must not be empty".to_string()));
    }

    let created = state.storage.properties.create(&property).await.map_err(|e| {
        if e.is_unique_violation() {
            ApiError::Conflict(format!("A property named '{}' already exists", property.name.trim()))
        } else {
            e.into()
        }
    })?;

    info!(property_id = %created.id, "Property created");
    Ok((StatusCode::CREATED, ok(created)))
}

/// Lists owners by name.
#[instrument(name = "list_owners", skip(state))]
pub async fn list_owners(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<Owner>>> {
    Ok(ok(state.storage.owners.list().await?))
}

/// Registers an owner.
#[instrument(name = "create_owner", skip(state, body))]
pub async fn create_owner(
    State(state): State<AppState>,
    body: Result<Json<NewOwner>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let owner = json(body)?;
    if owner.name.trim().is_empty() {
        return Err(ApiError::Validation("Owner name must not be empty".to_string()));
    }

    let created = state.storage.owners.create(&owner).await?;

    info!(owner_id = %created.id, "Owner created");
    Ok((StatusCode::CREATED, ok(created)))
}
