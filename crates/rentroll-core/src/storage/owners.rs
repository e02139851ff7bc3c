//! Repository for the owner catalog.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{NewOwner, Owner, OwnerId, OwnerSummary},
};

/// Repository for owner database operations.
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

    /// Registers an owner.
    ///
    /// # Errors
    ///
    /// Returns error if insert fails.
    pub async fn create(&self, owner: &NewOwner) -> Result<Owner> {
        let created = sqlx::query_as::<_, Owner>(
            r"
            INSERT INTO owners (name, surname)
            VALUES ($1, $2)
            RETURNING id, name, surname, created_at
            ",
        )
        .bind(owner.name.trim())
        .bind(&owner.surname)
        .fetch_one(&*self.pool)
        .await?;

        Ok(created)
    }

    /// Finds an owner by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, id: OwnerId) -> Result<Option<Owner>> {
        let owner =
            sqlx::query_as::<_, Owner>("SELECT id, name, surname, created_at FROM owners WHERE id = $1")
                .bind(id)
                .fetch_optional(&*self.pool)
                .await?;

        Ok(owner)
    }

    /// Finds the first owner registered under an exact name.
    ///
    /// Spreadsheet headers carry first names only; when two owners share one
    /// the earliest registered wins.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Owner>> {
        let owner = sqlx::query_as::<_, Owner>(
            "SELECT id, name, surname, created_at FROM owners WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(owner)
    }

    /// Lists all owners ordered by name.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self) -> Result<Vec<Owner>> {
        let owners = sqlx::query_as::<_, Owner>(
            "SELECT id, name, surname, created_at FROM owners ORDER BY name, id",
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(owners)
    }

    /// Lists every owner in the compact form used by alias screens.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list_summaries(&self) -> Result<Vec<OwnerSummary>> {
        let owners = sqlx::query_as::<_, OwnerSummary>(
            "SELECT id, name, surname FROM owners ORDER BY name, id",
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(owners)
    }

    /// Loads the given owners, preserving the order of `ids`.
    ///
    /// Unknown ids are left out.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_summaries(&self, ids: &[OwnerId]) -> Result<Vec<OwnerSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let owners = sqlx::query_as::<_, OwnerSummary>(
            r"
            SELECT o.id, o.name, o.surname
            FROM UNNEST($1::INTEGER[]) WITH ORDINALITY AS wanted(id, position)
            JOIN owners o ON o.id = wanted.id
            ORDER BY wanted.position
            ",
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await?;

        Ok(owners)
    }

    /// Returns the ids in `ids` that match no owner, each once, in the order
    /// they first appear in `ids`.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn missing(&self, ids: &[OwnerId]) -> Result<Vec<OwnerId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let missing = sqlx::query_scalar::<_, OwnerId>(
            r"
            SELECT wanted.id
            FROM UNNEST($1::INTEGER[]) WITH ORDINALITY AS wanted(id, position)
            LEFT JOIN owners o ON o.id = wanted.id
            WHERE o.id IS NULL
            GROUP BY wanted.id
            ORDER BY MIN(wanted.position)
            ",
        )
        .bind(ids)
        .fetch_all(&*self.pool)
        .await?;

        Ok(missing)
    }

    /// Returns true if the owner exists.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn exists(&self, id: OwnerId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM owners WHERE id = $1)")
            .bind(id)
            .fetch_one(&*self.pool)
            .await?;

        Ok(exists)
    }
}
