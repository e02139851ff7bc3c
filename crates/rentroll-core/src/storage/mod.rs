//! Database access layer, one repository per table.
//!
//! Repositories translate between the domain models and the Postgres schema
//! in `migrations/`. All SQL lives under this module.

use std::sync::Arc;

use sqlx::PgPool;

pub mod aliases;
pub mod owners;
pub mod properties;
pub mod rentals;

use crate::error::Result;

/// Container for all repository instances.
///
/// Cloning is cheap; every repository shares one connection pool.
#[derive(Clone)]
pub struct Storage {
    /// Property catalog.
    pub properties: Arc<properties::Repository>,

    /// Owner catalog.
    pub owners: Arc<owners::Repository>,

    /// Monthly rental records and report aggregates.
    pub rentals: Arc<rentals::Repository>,

    /// Owner groupings.
    pub aliases: Arc<aliases::Repository>,
}

impl Storage {
    /// Creates a storage instance over the given pool.
    pub fn new(pool: PgPool) -> Self {
        let pool = Arc::new(pool);

        Self {
            properties: Arc::new(properties::Repository::new(pool.clone())),
            owners: Arc::new(owners::Repository::new(pool.clone())),
            rentals: Arc::new(rentals::Repository::new(pool.clone())),
            aliases: Arc::new(aliases::Repository::new(pool)),
        }
    }

    /// Shared connection pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.rentals.pool()
    }

    /// Verifies the database answers a trivial query.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.pool()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn storage_can_be_created_without_connecting() {
        let pool = sqlx::PgPool::connect_lazy("postgresql://localhost/rentroll").unwrap();
        let storage = Storage::new(pool);
        assert!(Arc::ptr_eq(&storage.pool(), &storage.properties.pool()));
    }
}
