//! Test infrastructure for database-backed tests.
//!
//! [`TestEnv`] bundles an isolated database, the repositories over it and a
//! pinned clock. Tests using it need a reachable PostgreSQL server and are
//! marked `#[ignore]` so the default test run stays hermetic.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use rentroll_core::{
    NewOwner, NewProperty, Owner, OwnerId, Property, PropertyId, Rental, Storage,
};
use sqlx::PgPool;

pub mod database;
pub mod fixtures;

pub use database::TestDatabase;
pub use fixtures::RentalBuilder;
pub use rentroll_core::TestClock;

/// Test environment with database isolation.
pub struct TestEnv {
    /// Clock pinned to 15 March 2024 unless moved.
    pub clock: TestClock,
    storage: Arc<Storage>,
    database: TestDatabase,
}

impl TestEnv {
    /// Creates an environment over a fresh database.
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be created.
    pub async fn new() -> Result<Self> {
        let database = TestDatabase::new().await?;
        let storage = Arc::new(Storage::new(database.pool()));

        Ok(Self { clock: TestClock::at_date(2024, 3, 15), storage, database })
    }

    /// Repositories over the test database.
    pub fn storage(&self) -> Arc<Storage> {
        self.storage.clone()
    }

    /// Connection pool of the test database.
    pub fn pool(&self) -> PgPool {
        self.database.pool()
    }

    /// Registers a property.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub async fn create_property(&self, name: &str) -> Result<Property> {
        let property = self
            .storage
            .properties
            .create(&NewProperty { name: name.to_string(), address: None })
            .await?;
        Ok(property)
    }

    /// Registers an owner.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub async fn create_owner(&self, name: &str) -> Result<Owner> {
        let owner =
            self.storage.owners.create(&NewOwner { name: name.to_string(), surname: None }).await?;
        Ok(owner)
    }

    /// Inserts a rental record with the given net amount.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub async fn create_rental(
        &self,
        property_id: PropertyId,
        owner_id: OwnerId,
        year: i32,
        month: i32,
        net_amount: f64,
    ) -> Result<Rental> {
        let rental = RentalBuilder::new(property_id, owner_id, year, month).net(net_amount).build();
        Ok(self.storage.rentals.create(&rental).await?)
    }
}
