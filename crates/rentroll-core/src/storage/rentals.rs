//! Repository for monthly rental records and the aggregates built on them.
//!
//! A record is unique per (property, owner, year, month). Spreadsheet imports
//! write through [`Repository::upsert_imported`]; everything else is plain
//! CRUD plus the grouped queries behind the reports.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    import::{ImportedAmount, UpsertOutcome},
    models::{NewRental, OwnerId, Period, Rental, RentalFilter, RentalId, RentalRecord, RentalUpdate, SortOrder},
    report::{DistributionCell, PeriodFilter, PropertyTotal},
};

/// Record and period counts behind a distribution matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct DistributionStats {
    /// Records matched.
    pub total_records: i64,
    /// Distinct (year, month) pairs matched.
    pub periods_included: i64,
}

/// Repository for rental record database operations.
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    /// Creates a new repository instance.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Lists records with property and owner names.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self, filter: &RentalFilter) -> Result<Vec<RentalRecord>> {
        let sql = match filter.order {
            SortOrder::Asc => {
                r"
                SELECT r.id, r.property_id, r.owner_id, r.year, r.month, r.net_amount,
                       r.total_admin_fee, r.owner_admin_fee, r.created_at, r.updated_at,
                       p.name AS property_name, o.name AS owner_name
                FROM rentals r
                LEFT JOIN properties p ON p.id = r.property_id
                LEFT JOIN owners o ON o.id = r.owner_id
                WHERE ($1::INTEGER IS NULL OR r.year = $1)
                  AND ($2::INTEGER IS NULL OR r.month = $2)
                  AND ($3::INTEGER IS NULL OR r.property_id = $3)
                  AND ($4::INTEGER IS NULL OR r.owner_id = $4)
                ORDER BY r.year ASC, r.month ASC, r.property_id ASC, r.id ASC
                OFFSET $5
                LIMIT $6
                "
            },
            SortOrder::Desc => {
                r"
                SELECT r.id, r.property_id, r.owner_id, r.year, r.month, r.net_amount,
                       r.total_admin_fee, r.owner_admin_fee, r.created_at, r.updated_at,
                       p.name AS property_name, o.name AS owner_name
                FROM rentals r
                LEFT JOIN properties p ON p.id = r.property_id
                LEFT JOIN owners o ON o.id = r.owner_id
                WHERE ($1::INTEGER IS NULL OR r.year = $1)
                  AND ($2::INTEGER IS NULL OR r.month = $2)
                  AND ($3::INTEGER IS NULL OR r.property_id = $3)
                  AND ($4::INTEGER IS NULL OR r.owner_id = $4)
                ORDER BY r.year DESC, r.month DESC, r.property_id ASC, r.id ASC
                OFFSET $5
                LIMIT $6
                "
            },
        };

        let records = sqlx::query_as::<_, RentalRecord>(sql)
            .bind(filter.year)
            .bind(filter.month)
            .bind(filter.property_id)
            .bind(filter.owner_id)
            .bind(filter.skip)
            .bind(filter.limit)
            .fetch_all(&*self.pool)
            .await?;

        Ok(records)
    }

    /// Finds a record with names by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_record(&self, id: RentalId) -> Result<Option<RentalRecord>> {
        let record = sqlx::query_as::<_, RentalRecord>(
            r"
            SELECT r.id, r.property_id, r.owner_id, r.year, r.month, r.net_amount,
                   r.total_admin_fee, r.owner_admin_fee, r.created_at, r.updated_at,
                   p.name AS property_name, o.name AS owner_name
            FROM rentals r
            LEFT JOIN properties p ON p.id = r.property_id
            LEFT JOIN owners o ON o.id = r.owner_id
            WHERE r.id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(record)
    }

    /// Creates a record.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` when a record for the same
    /// property, owner and period exists, or a referenced row is missing.
    pub async fn create(&self, rental: &NewRental) -> Result<Rental> {
        let created = sqlx::query_as::<_, Rental>(
            r"
            INSERT INTO rentals (property_id, owner_id, year, month, net_amount, total_admin_fee)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, property_id, owner_id, year, month, net_amount, total_admin_fee,
                      owner_admin_fee, created_at, updated_at
            ",
        )
        .bind(rental.property_id)
        .bind(rental.owner_id)
        .bind(rental.year)
        .bind(rental.month)
        .bind(rental.net_amount)
        .bind(rental.total_admin_fee)
        .fetch_one(&*self.pool)
        .await?;

        Ok(created)
    }

    /// Applies a partial update; `None` when the record does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn update(&self, id: RentalId, update: &RentalUpdate) -> Result<Option<Rental>> {
        let updated = sqlx::query_as::<_, Rental>(
            r"
            UPDATE rentals
            SET net_amount = COALESCE($2, net_amount),
                total_admin_fee = COALESCE($3, total_admin_fee),
                owner_admin_fee = COALESCE($4, owner_admin_fee),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, property_id, owner_id, year, month, net_amount, total_admin_fee,
                      owner_admin_fee, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.net_amount)
        .bind(update.total_admin_fee)
        .bind(update.owner_admin_fee)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(updated)
    }

    /// Deletes a record; returns false when it did not exist.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn delete(&self, id: RentalId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rentals WHERE id = $1").bind(id).execute(&*self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts an imported amount or overwrites the existing record's amounts.
    ///
    /// A missing admin fee stores 0 on insert and keeps the stored fee on
    /// update.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn upsert_imported(&self, amount: &ImportedAmount) -> Result<UpsertOutcome> {
        // xmax is zero only for a freshly inserted tuple
        let inserted: bool = sqlx::query_scalar(
            r"
            INSERT INTO rentals (property_id, owner_id, year, month, net_amount, total_admin_fee)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6::DOUBLE PRECISION, 0))
            ON CONFLICT (property_id, owner_id, year, month) DO UPDATE
            SET net_amount = EXCLUDED.net_amount,
                total_admin_fee = COALESCE($6::DOUBLE PRECISION, rentals.total_admin_fee),
                updated_at = NOW()
            RETURNING (xmax = 0)
            ",
        )
        .bind(amount.property_id)
        .bind(amount.owner_id)
        .bind(amount.period.year)
        .bind(amount.period.month)
        .bind(amount.net_amount)
        .bind(amount.total_admin_fee)
        .fetch_one(&*self.pool)
        .await?;

        Ok(if inserted { UpsertOutcome::Created } else { UpsertOutcome::Updated })
    }

    /// Years that have at least one record, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn distinct_years(&self) -> Result<Vec<i32>> {
        let years = sqlx::query_scalar("SELECT DISTINCT year FROM rentals ORDER BY year DESC")
            .fetch_all(&*self.pool)
            .await?;

        Ok(years)
    }

    /// Newest period with data.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn latest_period(&self) -> Result<Option<Period>> {
        let row: Option<(i32, i32)> =
            sqlx::query_as("SELECT year, month FROM rentals ORDER BY year DESC, month DESC LIMIT 1")
                .fetch_optional(&*self.pool)
                .await?;

        Ok(row.map(|(year, month)| Period { year, month }))
    }

    /// Net amount per property for one period, largest first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn totals_by_property(&self, period: Period) -> Result<Vec<PropertyTotal>> {
        let totals = sqlx::query_as::<_, PropertyTotal>(
            r"
            SELECT r.property_id, p.name AS property_name,
                   SUM(r.net_amount) AS total, COUNT(*) AS records
            FROM rentals r
            LEFT JOIN properties p ON p.id = r.property_id
            WHERE r.year = $1 AND r.month = $2
            GROUP BY r.property_id, p.name
            ORDER BY total DESC, r.property_id ASC
            ",
        )
        .bind(period.year)
        .bind(period.month)
        .fetch_all(&*self.pool)
        .await?;

        Ok(totals)
    }

    /// Net amount per period for the newest `months` periods, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn totals_by_month(&self, months: i64) -> Result<Vec<(Period, f64, i64)>> {
        let rows: Vec<(i32, i32, f64, i64)> = sqlx::query_as(
            r"
            SELECT year, month, SUM(net_amount) AS total, COUNT(*) AS records
            FROM rentals
            GROUP BY year, month
            ORDER BY year DESC, month DESC
            LIMIT $1
            ",
        )
        .bind(months)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(year, month, total, records)| (Period { year, month }, total, records))
            .collect())
    }

    /// Net amount per (owner, property) within the period filter.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn distribution_cells(
        &self,
        filter: PeriodFilter,
        owner_id: Option<OwnerId>,
    ) -> Result<Vec<DistributionCell>> {
        let cells = sqlx::query_as::<_, DistributionCell>(
            r"
            SELECT r.owner_id, o.name AS owner_name, r.property_id, p.name AS property_name,
                   SUM(r.net_amount) AS total, COUNT(*) AS records
            FROM rentals r
            LEFT JOIN owners o ON o.id = r.owner_id
            LEFT JOIN properties p ON p.id = r.property_id
            WHERE ($1::INTEGER IS NULL OR r.year = $1)
              AND ($2::INTEGER IS NULL OR r.month = $2)
              AND ($3::INTEGER IS NULL OR r.owner_id = $3)
            GROUP BY r.owner_id, o.name, r.property_id, p.name
            ",
        )
        .bind(filter.year())
        .bind(filter.month())
        .bind(owner_id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(cells)
    }

    /// Record and period counts within the period filter.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn distribution_stats(
        &self,
        filter: PeriodFilter,
        owner_id: Option<OwnerId>,
    ) -> Result<DistributionStats> {
        let stats = sqlx::query_as::<_, DistributionStats>(
            r"
            SELECT COUNT(*) AS total_records,
                   COUNT(DISTINCT year * 100 + month) AS periods_included
            FROM rentals
            WHERE ($1::INTEGER IS NULL OR year = $1)
              AND ($2::INTEGER IS NULL OR month = $2)
              AND ($3::INTEGER IS NULL OR owner_id = $3)
            ",
        )
        .bind(filter.year())
        .bind(filter.month())
        .bind(owner_id)
        .fetch_one(&*self.pool)
        .await?;

        Ok(stats)
    }
}
