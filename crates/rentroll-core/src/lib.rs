//! Core domain for the rental income ledger.
//!
//! Provides strongly-typed models, spreadsheet parsing, the import engine,
//! report shaping and the Postgres repositories. The HTTP crate builds on
//! these types and never issues SQL of its own.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod import;
pub mod models;
pub mod report;
pub mod spreadsheet;
pub mod storage;
pub mod time;

pub use error::{CoreError, Result};
pub use import::{ImportReport, ImportStore, Importer, SheetReport};
pub use models::{
    Aggregation, Alias, AliasId, AliasUpdate, NewAlias, NewOwner, NewProperty, NewRental, Owner,
    OwnerId, OwnerSummary, Period, Property, PropertyId, Rental, RentalFilter, RentalId,
    RentalRecord, RentalUpdate, SortOrder,
};
pub use report::{DistributionMatrix, MatrixOrdering, MonthlyTotal, PeriodFilter, PropertyTotal};
pub use storage::Storage;
pub use time::{Clock, RealClock, TestClock};
