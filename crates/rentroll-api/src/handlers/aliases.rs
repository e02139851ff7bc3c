//! Owner grouping aliases.
//!
//! The two `/reports` routes are public so report screens can resolve
//! groupings; everything else requires an administrator.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use rentroll_core::{Alias, AliasId, AliasUpdate, NewAlias, OwnerId, OwnerSummary, Storage};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{check_range, json, path, query};
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Default page size for alias listings.
pub const DEFAULT_LIMIT: i64 = 100;
/// Largest page size for alias listings.
pub const MAX_LIMIT: i64 = 1000;

/// Paging parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListAliasesParams {
    /// Rows to skip.
    pub skip: Option<i64>,
    /// Page size.
    pub limit: Option<i64>,
}

/// Lists every alias for report screens.
#[instrument(name = "alias_reports", skip(state))]
pub async fn alias_reports(State(state): State<AppState>) -> ApiResult<Json<Vec<Alias>>> {
    Ok(Json(state.storage.aliases.list_all().await?))
}

/// Lists the owners of an alias for report screens.
#[instrument(name = "alias_owner_reports", skip(state, id))]
pub async fn alias_owner_reports(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<Vec<OwnerSummary>>> {
    let alias = find_alias(&state.storage, AliasId(path(id)?)).await?;
    Ok(Json(state.storage.owners.find_summaries(&alias.owner_ids).await?))
}

/// Lists every owner that can be grouped.
#[instrument(name = "available_owners", skip(state))]
pub async fn available_owners(State(state): State<AppState>) -> ApiResult<Json<Vec<OwnerSummary>>> {
    Ok(Json(state.storage.owners.list_summaries().await?))
}

/// Alias counters.
#[derive(Debug, Serialize)]
pub struct AliasStats {
    /// Number of aliases.
    pub total_aliases: i64,
    /// Always `aliases`.
    pub endpoint: &'static str,
    /// Always `ok`.
    pub status: &'static str,
}

/// Reports alias counters.
#[instrument(name = "alias_stats", skip(state))]
pub async fn alias_stats(State(state): State<AppState>) -> ApiResult<Json<AliasStats>> {
    let total_aliases = state.storage.aliases.count().await?;
    Ok(Json(AliasStats { total_aliases, endpoint: "aliases", status: "ok" }))
}

/// Lists aliases by id.
#[instrument(name = "list_aliases", skip(state, params))]
pub async fn list_aliases(
    State(state): State<AppState>,
    params: Result<Query<ListAliasesParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Alias>>> {
    let params = query(params)?;
    check_range("skip", params.skip, 0..=i64::MAX)?;
    check_range("limit", params.limit, 1..=MAX_LIMIT)?;

    let aliases = state
        .storage
        .aliases
        .list(params.skip.unwrap_or(0), params.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(Json(aliases))
}

/// Fetches one alias.
#[instrument(name = "get_alias", skip(state, id))]
pub async fn get_alias(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<Alias>> {
    Ok(Json(find_alias(&state.storage, AliasId(path(id)?)).await?))
}

/// Creates an alias.
#[instrument(name = "create_alias", skip(state, body))]
pub async fn create_alias(
    State(state): State<AppState>,
    body: Result<Json<NewAlias>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let mut alias = json(body)?;
    alias.name = required_name(&alias.name)?;

    if state.storage.aliases.find_by_name(&alias.name).await?.is_some() {
        return Err(name_taken(&alias.name));
    }
    ensure_owners_exist(&state.storage, &alias.owner_ids).await?;

    let created = state.storage.aliases.create(&alias).await.map_err(|e| {
        if e.is_unique_violation() {
            name_taken(&alias.name)
        } else {
            e.into()
        }
    })?;

    info!(alias_id = %created.id, owners = created.owner_ids.len(), "Alias created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Updates an alias's name and/or owners.
#[instrument(name = "update_alias", skip(state, id, body))]
pub async fn update_alias(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<AliasUpdate>, JsonRejection>,
) -> ApiResult<Json<Alias>> {
    let id = AliasId(path(id)?);
    let mut update = json(body)?;
    let existing = find_alias(&state.storage, id).await?;

    // a blank name leaves the current one in place
    update.name = update.name.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
    if let Some(name) = &update.name {
        if *name != existing.name && state.storage.aliases.find_by_name(name).await?.is_some() {
            return Err(name_taken(name));
        }
    }

    if let Some(owner_ids) = &update.owner_ids {
        ensure_owners_exist(&state.storage, owner_ids).await?;
    }

    let updated = state
        .storage
        .aliases
        .update(id, &update)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::Conflict("An alias with this name already exists".to_string())
            } else {
                e.into()
            }
        })?
        .ok_or_else(|| not_found(id))?;

    info!(alias_id = %id, "Alias updated");
    Ok(Json(updated))
}

/// Deletion confirmation.
#[derive(Debug, Serialize)]
pub struct AliasDeleted {
    /// `Alias '<name>' deleted`.
    pub message: String,
}

/// Deletes an alias.
#[instrument(name = "delete_alias", skip(state, id))]
pub async fn delete_alias(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<AliasDeleted>> {
    let id = AliasId(path(id)?);
    let name = state.storage.aliases.delete(id).await?.ok_or_else(|| not_found(id))?;

    info!(alias_id = %id, "Alias deleted");
    Ok(Json(AliasDeleted { message: format!("Alias '{name}' deleted") }))
}

/// An alias with its resolved owners.
#[derive(Debug, Serialize)]
pub struct AliasOwners {
    /// The alias.
    pub alias: Alias,
    /// Owners in alias order; deleted owners are left out.
    pub owners: Vec<OwnerSummary>,
}

/// Resolves the owners of an alias.
#[instrument(name = "alias_owners", skip(state, id))]
pub async fn alias_owners(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<Json<AliasOwners>> {
    let alias = find_alias(&state.storage, AliasId(path(id)?)).await?;
    let owners = state.storage.owners.find_summaries(&alias.owner_ids).await?;
    Ok(Json(AliasOwners { alias, owners }))
}

async fn find_alias(storage: &Storage, id: AliasId) -> ApiResult<Alias> {
    storage.aliases.find_by_id(id).await?.ok_or_else(|| not_found(id))
}

async fn ensure_owners_exist(storage: &Storage, owner_ids: &[OwnerId]) -> ApiResult<()> {
    if let Some(missing) = storage.owners.missing(owner_ids).await?.first() {
        return Err(ApiError::Validation(format!("Owner {missing} not found")));
    }
    Ok(())
}

fn required_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Alias name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn name_taken(name: &str) -> ApiError {
    ApiError::Conflict(format!("An alias named '{name}' already exists"))
}

fn not_found(id: AliasId) -> ApiError {
    ApiError::NotFound(format!("Alias {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(required_name("  Family  ").unwrap(), "Family");
        assert!(matches!(required_name("   "), Err(ApiError::Validation(_))));
    }
}
