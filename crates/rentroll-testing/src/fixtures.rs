//! Builders for rental records used in database tests.

use rentroll_core::{NewRental, OwnerId, PropertyId};

/// Builder for [`NewRental`] with zero amounts by default.
#[derive(Debug, Clone)]
pub struct RentalBuilder {
    rental: NewRental,
}

impl RentalBuilder {
    /// Starts a record for the given property, owner and period.
    pub fn new(property_id: PropertyId, owner_id: OwnerId, year: i32, month: i32) -> Self {
        Self {
            rental: NewRental {
                property_id,
                owner_id,
                year,
                month,
                net_amount: 0.0,
                total_admin_fee: 0.0,
            },
        }
    }

    /// Sets the owner's net amount.
    #[must_use]
    pub fn net(mut self, amount: f64) -> Self {
        self.rental.net_amount = amount;
        self
    }

    /// Sets the property's administration fee.
    #[must_use]
    pub fn admin_fee(mut self, amount: f64) -> Self {
        self.rental.total_admin_fee = amount;
        self
    }

    /// Builds the record input.
    pub fn build(self) -> NewRental {
        self.rental
    }
}
