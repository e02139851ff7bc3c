//! Repository for owner grouping aliases.
//!
//! Owner ids live in an `INTEGER[]` column and keep the order they were
//! supplied in. They are not foreign keys; readers skip ids whose owner is
//! gone.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{Alias, AliasId, AliasUpdate, NewAlias},
};

/// Repository for alias database operations.
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

    /// Creates an alias.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` if the name is taken.
    pub async fn create(&self, alias: &NewAlias) -> Result<Alias> {
        let created = sqlx::query_as::<_, Alias>(
            r"
            INSERT INTO aliases (name, owner_ids)
            VALUES ($1, $2)
            RETURNING id, name, owner_ids, created_at, updated_at
            ",
        )
        .bind(alias.name.trim())
        .bind(&alias.owner_ids)
        .fetch_one(&*self.pool)
        .await?;

        Ok(created)
    }

    /// Finds an alias by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, id: AliasId) -> Result<Option<Alias>> {
        let alias = sqlx::query_as::<_, Alias>(
            "SELECT id, name, owner_ids, created_at, updated_at FROM aliases WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(alias)
    }

    /// Finds an alias by exact name.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Alias>> {
        let alias = sqlx::query_as::<_, Alias>(
            "SELECT id, name, owner_ids, created_at, updated_at FROM aliases WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(alias)
    }

    /// Lists aliases by ID with paging.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self, skip: i64, limit: i64) -> Result<Vec<Alias>> {
        let aliases = sqlx::query_as::<_, Alias>(
            r"
            SELECT id, name, owner_ids, created_at, updated_at
            FROM aliases
            ORDER BY id
            OFFSET $1
            LIMIT $2
            ",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        Ok(aliases)
    }

    /// Lists every alias ordered by name.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list_all(&self) -> Result<Vec<Alias>> {
        let aliases = sqlx::query_as::<_, Alias>(
            "SELECT id, name, owner_ids, created_at, updated_at FROM aliases ORDER BY name, id",
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(aliases)
    }

    /// Applies a partial update; `None` when the alias does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` if the new name is taken.
    pub async fn update(&self, id: AliasId, update: &AliasUpdate) -> Result<Option<Alias>> {
        let updated = sqlx::query_as::<_, Alias>(
            r"
            UPDATE aliases
            SET name = COALESCE($2, name),
                owner_ids = COALESCE($3, owner_ids),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, owner_ids, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(&update.owner_ids)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(updated)
    }

    /// Deletes an alias, returning its name when it existed.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn delete(&self, id: AliasId) -> Result<Option<String>> {
        let name = sqlx::query_scalar("DELETE FROM aliases WHERE id = $1 RETURNING name")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?;

        Ok(name)
    }

    /// Number of aliases.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM aliases").fetch_one(&*self.pool).await?;

        Ok(count)
    }
}
