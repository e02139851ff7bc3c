//! Repository for the property catalog.
//!
//! Property names are matched verbatim against the first column of imported
//! worksheets, so they are unique.

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    error::Result,
    models::{NewProperty, Property, PropertyId},
};

/// Repository for property database operations.
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

    /// Registers a property.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` if the name is taken.
    pub async fn create(&self, property: &NewProperty) -> Result<Property> {
        let created = sqlx::query_as::<_, Property>(
            r"
            INSERT INTO properties (name, address)
            VALUES ($1, $2)
            RETURNING id, name, address, created_at
            ",
        )
        .bind(property.name.trim())
        .bind(&property.address)
        .fetch_one(&*self.pool)
        .await?;

        Ok(created)
    }

    /// Finds a property by ID.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_id(&self, id: PropertyId) -> Result<Option<Property>> {
        let property = sqlx::query_as::<_, Property>(
            "SELECT id, name, address, created_at FROM properties WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(property)
    }

    /// Finds a property by exact name.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Property>> {
        let property = sqlx::query_as::<_, Property>(
            "SELECT id, name, address, created_at FROM properties WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(property)
    }

    /// Lists all properties ordered by name.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn list(&self) -> Result<Vec<Property>> {
        let properties = sqlx::query_as::<_, Property>(
            "SELECT id, name, address, created_at FROM properties ORDER BY name, id",
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(properties)
    }

    /// Returns true if the property exists.
    ///
    /// # Errors
    ///
    /// Returns error if query fails.
    pub async fn exists(&self, id: PropertyId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM properties WHERE id = $1)")
                .bind(id)
                .fetch_one(&*self.pool)
                .await?;

        Ok(exists)
    }
}
