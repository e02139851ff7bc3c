//! Reporting endpoints: available periods, totals and distribution matrices.
//!
//! Requests missing a year or month are answered for the latest period on
//! file. With no data at all, responses carry a null period and empty lists.

use axum::extract::{rejection::QueryRejection, Query, State};
use rentroll_core::{
    report::{self, MatrixOwner, MatrixProperty, MatrixRow},
    Aggregation, DistributionMatrix, MatrixOrdering, MonthlyTotal, OwnerId, Period, PeriodFilter,
    PropertyTotal,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{check_range, ok, query, ApiResponse};
use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Default number of months in the trend series.
pub const DEFAULT_MONTHS: i64 = 12;
/// Largest number of months in the trend series.
pub const MAX_MONTHS: i64 = 24;

/// Years with data.
#[derive(Debug, Serialize)]
pub struct YearsResponse {
    /// Newest first.
    pub years: Vec<i32>,
    /// Number of years.
    pub total: usize,
}

/// Lists the years that have records.
#[instrument(name = "available_years", skip(state))]
pub async fn available_years(State(state): State<AppState>) -> ApiResult<ApiResponse<YearsResponse>> {
    let years = state.storage.rentals.distinct_years().await?;
    let total = years.len();
    Ok(ok(YearsResponse { years, total }))
}

/// Newest period, both fields null when there is no data.
#[derive(Debug, Serialize)]
pub struct LatestPeriodResponse {
    /// Year.
    pub year: Option<i32>,
    /// Month.
    pub month: Option<i32>,
}

/// Reports the newest period with data.
#[instrument(name = "latest_period", skip(state))]
pub async fn latest_period(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<LatestPeriodResponse>> {
    let latest = state.storage.rentals.latest_period().await?;
    Ok(ok(LatestPeriodResponse { year: latest.map(|p| p.year), month: latest.map(|p| p.month) }))
}

/// Optional year and month.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodParams {
    /// Year.
    pub year: Option<i32>,
    /// Month.
    pub month: Option<i32>,
}

/// Period echoed back in report responses.
#[derive(Debug, Serialize)]
pub struct PeriodInfo {
    /// Year.
    pub year: i32,
    /// Month.
    pub month: i32,
    /// Label such as `March 2024`.
    pub label: String,
}

impl From<Period> for PeriodInfo {
    fn from(period: Period) -> Self {
        Self { year: period.year, month: period.month, label: period.label() }
    }
}

/// Totals per property.
#[derive(Debug, Serialize)]
pub struct PropertyTotalsResponse {
    /// Period reported on.
    pub period: Option<PeriodInfo>,
    /// Largest total first.
    pub totals: Vec<PropertyTotal>,
    /// Number of properties.
    pub total_properties: usize,
}

/// Sums net amounts per property for one period.
#[instrument(name = "totals_by_property", skip(state, params))]
pub async fn totals_by_property(
    State(state): State<AppState>,
    params: Result<Query<PeriodParams>, QueryRejection>,
) -> ApiResult<ApiResponse<PropertyTotalsResponse>> {
    let params = query(params)?;
    check_range("month", params.month, 1..=12)?;

    let latest = match (params.year, params.month) {
        (Some(_), Some(_)) => None,
        _ => state.storage.rentals.latest_period().await?,
    };

    let Some(period) = report::fill_period(params.year, params.month, latest) else {
        return Ok(ok(PropertyTotalsResponse { period: None, totals: Vec::new(), total_properties: 0 }));
    };

    let totals = state.storage.rentals.totals_by_property(period).await?;
    debug!(%period, properties = totals.len(), "Property totals computed");

    Ok(ok(PropertyTotalsResponse {
        period: Some(period.into()),
        total_properties: totals.len(),
        totals,
    }))
}

/// Trend series parameters.
#[derive(Debug, Default, Deserialize)]
pub struct MonthsParams {
    /// Number of months.
    pub months: Option<i64>,
}

/// Monthly trend series.
#[derive(Debug, Serialize)]
pub struct MonthlyTotalsResponse {
    /// Oldest first.
    pub monthly_totals: Vec<MonthlyTotal>,
    /// Number of periods.
    pub total_periods: usize,
}

/// Sums net amounts per month for the newest periods.
#[instrument(name = "totals_by_month", skip(state, params))]
pub async fn totals_by_month(
    State(state): State<AppState>,
    params: Result<Query<MonthsParams>, QueryRejection>,
) -> ApiResult<ApiResponse<MonthlyTotalsResponse>> {
    let params = query(params)?;
    check_range("months", params.months, 1..=MAX_MONTHS)?;

    let rows = state.storage.rentals.totals_by_month(params.months.unwrap_or(DEFAULT_MONTHS)).await?;
    let monthly_totals = MonthlyTotal::chronological(rows);

    Ok(ok(MonthlyTotalsResponse { total_periods: monthly_totals.len(), monthly_totals }))
}

/// Distribution matrix parameters.
#[derive(Debug, Default, Deserialize)]
pub struct DistributionParams {
    /// Year.
    pub year: Option<i32>,
    /// Month.
    pub month: Option<i32>,
    /// Restrict to one owner.
    pub owner_id: Option<i32>,
    /// `month`, `year` or `all`.
    pub aggregation: Option<String>,
}

/// Period covered by a distribution.
#[derive(Debug, Serialize)]
pub struct DistributionPeriod {
    /// Year bound.
    pub year: Option<i32>,
    /// Month bound.
    pub month: Option<i32>,
    /// Requested aggregation.
    pub aggregation: Aggregation,
    /// `M/YYYY`, `Year YYYY` or `All periods`.
    pub description: String,
    /// Records summed.
    pub total_records: i64,
    /// Distinct months summed.
    pub periods_included: i64,
}

/// Owner × property matrix.
#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    /// One row per owner.
    pub matrix: Vec<MatrixRow>,
    /// Owner axis.
    pub owners: Vec<MatrixOwner>,
    /// Property axis.
    pub properties: Vec<MatrixProperty>,
    /// Period covered; null when there is no data.
    pub period: Option<DistributionPeriod>,
    /// Number of owners.
    pub total_owners: usize,
    /// Number of properties.
    pub total_properties: usize,
}

impl DistributionResponse {
    fn new(matrix: DistributionMatrix, period: Option<DistributionPeriod>) -> Self {
        Self {
            total_owners: matrix.owners.len(),
            total_properties: matrix.properties.len(),
            matrix: matrix.rows,
            owners: matrix.owners,
            properties: matrix.properties,
            period,
        }
    }
}

/// Builds the owner × property distribution for a month, a year or all data.
#[instrument(name = "distribution", skip(state, params))]
pub async fn distribution(
    State(state): State<AppState>,
    params: Result<Query<DistributionParams>, QueryRejection>,
) -> ApiResult<ApiResponse<DistributionResponse>> {
    let params = query(params)?;
    check_range("month", params.month, 1..=12)?;
    let aggregation = match params.aggregation.as_deref() {
        Some(a) => a.parse::<Aggregation>()?,
        None => Aggregation::default(),
    };
    let owner_id = params.owner_id.map(OwnerId);

    let needs_latest = match aggregation {
        Aggregation::All => false,
        Aggregation::Year => params.year.is_none(),
        Aggregation::Month => params.year.is_none() || params.month.is_none(),
    };
    let latest = if needs_latest { state.storage.rentals.latest_period().await? } else { None };

    let Some(filter) =
        report::resolve_distribution_filter(aggregation, params.year, params.month, latest)
    else {
        return Ok(ok(DistributionResponse::new(DistributionMatrix::default(), None)));
    };

    let cells = state.storage.rentals.distribution_cells(filter, owner_id).await?;
    let stats = state.storage.rentals.distribution_stats(filter, owner_id).await?;
    let matrix = DistributionMatrix::build(&cells, MatrixOrdering::ById);

    debug!(
        description = %filter.description(),
        owners = matrix.owners.len(),
        properties = matrix.properties.len(),
        "Distribution built"
    );

    let period = DistributionPeriod {
        year: filter.year(),
        month: filter.month(),
        aggregation,
        description: filter.description(),
        total_records: stats.total_records,
        periods_included: stats.periods_included,
    };

    Ok(ok(DistributionResponse::new(matrix, Some(period))))
}

/// Yearly distribution parameters.
#[derive(Debug, Default, Deserialize)]
pub struct YearParams {
    /// Year; required.
    pub year: Option<i32>,
}

/// Owner × property matrix for one year, sorted by name.
#[derive(Debug, Serialize)]
pub struct YearlyDistributionResponse {
    /// Year reported on.
    pub year: i32,
    /// One row per owner.
    pub matrix: Vec<MatrixRow>,
    /// Owner axis.
    pub owners: Vec<MatrixOwner>,
    /// Property axis.
    pub properties: Vec<MatrixProperty>,
    /// Number of owners.
    pub total_owners: usize,
    /// Number of properties.
    pub total_properties: usize,
}

/// Sums a whole year per owner and property.
#[instrument(name = "yearly_distribution", skip(state, params))]
pub async fn yearly_distribution(
    State(state): State<AppState>,
    params: Result<Query<YearParams>, QueryRejection>,
) -> ApiResult<ApiResponse<YearlyDistributionResponse>> {
    let year = query(params)?
        .year
        .ok_or_else(|| ApiError::Validation("year is required".to_string()))?;

    let cells = state.storage.rentals.distribution_cells(PeriodFilter::Year(year), None).await?;
    let matrix = DistributionMatrix::build(&cells, MatrixOrdering::ByName);

    Ok(ok(YearlyDistributionResponse {
        year,
        total_owners: matrix.owners.len(),
        total_properties: matrix.properties.len(),
        matrix: matrix.rows,
        owners: matrix.owners,
        properties: matrix.properties,
    }))
}
