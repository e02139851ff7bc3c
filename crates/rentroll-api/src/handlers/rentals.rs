//! Rental record CRUD and fee recalculation.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Json, Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
};
use rentroll_core::{
    NewRental, OwnerId, Period, PropertyId, RentalFilter, RentalId, RentalRecord, RentalUpdate,
    SortOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::{check_range, json, ok, path, query, ApiResponse};
use crate::{
    error::{ApiError, ApiResult},
    fees::FeeRecalculationSummary,
    AppState,
};

/// Default page size for rental listings.
pub const DEFAULT_LIMIT: i64 = 2000;
/// Largest page size for rental listings.
pub const MAX_LIMIT: i64 = 10_000;

/// Query parameters of `GET /api/rentals`.
#[derive(Debug, Default, Deserialize)]
pub struct ListRentalsParams {
    /// Rows to skip.
    pub skip: Option<i64>,
    /// Page size.
    pub limit: Option<i64>,
    /// Year filter.
    pub year: Option<i32>,
    /// Month filter.
    pub month: Option<i32>,
    /// Property filter.
    pub property_id: Option<i32>,
    /// Owner filter.
    pub owner_id: Option<i32>,
    /// `asc` or `desc`.
    pub order: Option<String>,
}

impl ListRentalsParams {
    /// Validates the parameters into a repository filter.
    pub fn into_filter(self) -> ApiResult<RentalFilter> {
        check_range("skip", self.skip, 0..=i64::MAX)?;
        check_range("limit", self.limit, 1..=MAX_LIMIT)?;
        check_range("year", self.year, 2000..=2100)?;
        check_range("month", self.month, 1..=12)?;

        let order = match self.order.as_deref() {
            Some(o) => o.parse::<SortOrder>()?,
            None => SortOrder::default(),
        };

        Ok(RentalFilter {
            year: self.year,
            month: self.month,
            property_id: self.property_id.map(PropertyId),
            owner_id: self.owner_id.map(OwnerId),
            order,
            skip: self.skip.unwrap_or(0),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT),
        })
    }
}

/// Lists rental records.
#[instrument(name = "list_rentals", skip(state, params))]
pub async fn list_rentals(
    State(state): State<AppState>,
    params: Result<Query<ListRentalsParams>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<RentalRecord>>> {
    let filter = query(params)?.into_filter()?;
    let records = state.storage.rentals.list(&filter).await?;
    Ok(ok(records))
}

/// Fetches one rental record.
#[instrument(name = "get_rental", skip(state, id))]
pub async fn get_rental(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<ApiResponse<RentalRecord>> {
    let id = RentalId(path(id)?);
    let record = state.storage.rentals.find_record(id).await?.ok_or_else(|| not_found(id))?;
    Ok(ok(record))
}

/// Creates a rental record.
#[instrument(name = "create_rental", skip(state, body))]
pub async fn create_rental(
    State(state): State<AppState>,
    body: Result<Json<NewRental>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let rental = json(body)?;
    Period::new(rental.year, rental.month)?;
    check_amount("net_amount", Some(rental.net_amount))?;
    check_amount("total_admin_fee", Some(rental.total_admin_fee))?;

    if !state.storage.properties.exists(rental.property_id).await? {
        return Err(ApiError::Validation(format!("Property {} not found", rental.property_id)));
    }
    if !state.storage.owners.exists(rental.owner_id).await? {
        return Err(ApiError::Validation(format!("Owner {} not found", rental.owner_id)));
    }

    let created = state.storage.rentals.create(&rental).await.map_err(|e| {
        if e.is_unique_violation() {
            ApiError::Conflict(format!(
                "A rental for property {} and owner {} in {}/{} already exists",
                rental.property_id, rental.owner_id, rental.month, rental.year
            ))
        } else {
            e.into()
        }
    })?;

    info!(rental_id = %created.id, "Rental created");
    let record =
        state.storage.rentals.find_record(created.id).await?.ok_or_else(|| not_found(created.id))?;

    Ok((StatusCode::CREATED, ok(record)))
}

/// Updates a rental record's amounts.
#[instrument(name = "update_rental", skip(state, id, body))]
pub async fn update_rental(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<RentalUpdate>, JsonRejection>,
) -> ApiResult<ApiResponse<RentalRecord>> {
    let id = RentalId(path(id)?);
    let update = json(body)?;
    check_amount("net_amount", update.net_amount)?;
    check_amount("total_admin_fee", update.total_admin_fee)?;
    check_amount("owner_admin_fee", update.owner_admin_fee)?;

    state.storage.rentals.update(id, &update).await?.ok_or_else(|| not_found(id))?;
    info!(rental_id = %id, "Rental updated");

    let record = state.storage.rentals.find_record(id).await?.ok_or_else(|| not_found(id))?;
    Ok(ok(record))
}

/// Deletes a rental record.
#[instrument(name = "delete_rental", skip(state, id))]
pub async fn delete_rental(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> ApiResult<ApiResponse<DeletedResponse>> {
    let id = RentalId(path(id)?);
    if !state.storage.rentals.delete(id).await? {
        return Err(not_found(id));
    }

    info!(rental_id = %id, "Rental deleted");
    Ok(ok(DeletedResponse { message: format!("Rental {id} deleted") }))
}

/// Confirmation of a deletion.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    /// Confirmation text.
    pub message: String,
}

/// Result relayed from the fee service.
#[derive(Debug, Serialize)]
pub struct RecalculationResponse {
    /// Confirmation text.
    pub message: String,
    /// Service summary.
    pub summary: FeeRecalculationSummary,
    /// Failures reported by the service.
    pub errors: Vec<String>,
}

/// Triggers a full owner-fee recalculation.
#[instrument(name = "recalculate_fees", skip(state))]
pub async fn recalculate_fees(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<RecalculationResponse>> {
    let summary = state.fees.recalculate_all().await?;
    let errors = summary.errors.clone();

    Ok(ok(RecalculationResponse {
        message: "Fee recalculation completed".to_string(),
        summary,
        errors,
    }))
}

fn not_found(id: RentalId) -> ApiError {
    ApiError::NotFound(format!("Rental {id} not found"))
}

fn check_amount(name: &str, value: Option<f64>) -> ApiResult<()> {
    match value {
        Some(v) if !v.is_finite() => Err(ApiError::Validation(format!("{name} must be a finite number"))),
        _ => Ok(()),
    }
}
