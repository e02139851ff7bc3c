//! Spreadsheet import: resolves names and upserts monthly rental records.
//!
//! The importer walks every parsed worksheet, looks up each property and
//! owner by exact name, and inserts or overwrites the record for
//! (property, owner, period). Lookup misses and write failures are collected
//! as messages; they never abort the run.

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::Result,
    models::{OwnerId, Period, PropertyId},
    spreadsheet::{RentSheet, SheetParse},
    storage::Storage,
    time::Clock,
};

/// Number of error messages echoed back in the report.
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Whether an upsert created a record or overwrote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new record was inserted.
    Created,
    /// An existing record's amounts were overwritten.
    Updated,
}

/// Values written for one (property, owner, period) cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportedAmount {
    /// Target property.
    pub property_id: PropertyId,
    /// Target owner.
    pub owner_id: OwnerId,
    /// Reference period.
    pub period: Period,
    /// Owner's net amount.
    pub net_amount: f64,
    /// Property's total administration fee; `None` leaves a stored fee
    /// untouched and writes 0 for a new record.
    pub total_admin_fee: Option<f64>,
}

/// Storage operations required by the importer.
///
/// Production uses [`Storage`]; tests can supply [`mock::MockImportStore`].
pub trait ImportStore: Send + Sync {
    /// Finds a property id by exact name.
    fn find_property_id(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PropertyId>>> + Send + '_>>;

    /// Finds an owner id by exact name.
    fn find_owner_id(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OwnerId>>> + Send + '_>>;

    /// Inserts the record or overwrites its amounts.
    fn upsert_amount(
        &self,
        amount: ImportedAmount,
    ) -> Pin<Box<dyn Future<Output = Result<UpsertOutcome>> + Send + '_>>;
}

impl ImportStore for Storage {
    fn find_property_id(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<PropertyId>>> + Send + '_>> {
        let name = name.to_string();
        Box::pin(async move { Ok(self.properties.find_by_name(&name).await?.map(|p| p.id)) })
    }

    fn find_owner_id(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OwnerId>>> + Send + '_>> {
        let name = name.to_string();
        Box::pin(async move { Ok(self.owners.find_by_name(&name).await?.map(|o| o.id)) })
    }

    fn upsert_amount(
        &self,
        amount: ImportedAmount,
    ) -> Pin<Box<dyn Future<Output = Result<UpsertOutcome>> + Send + '_>> {
        Box::pin(async move { self.rentals.upsert_imported(&amount).await })
    }
}

/// Per-sheet import counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetReport {
    /// Worksheet name.
    pub sheet: String,
    /// Period the sheet was filed under.
    pub period: Option<Period>,
    /// Property rows read.
    pub read: usize,
    /// Records inserted or overwritten.
    pub imported: usize,
    /// Records inserted.
    pub created: usize,
    /// Records overwritten.
    pub updated: usize,
    /// Rows or cells not imported.
    pub skipped: usize,
    /// Summary line.
    pub message: String,
}

/// Result of importing a workbook.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Property rows read across all sheets.
    pub total_read: usize,
    /// Records inserted or overwritten across all sheets.
    pub total_imported: usize,
    /// Rows or cells not imported across all sheets.
    pub total_skipped: usize,
    /// Number of error messages produced.
    pub error_count: usize,
    /// First [`MAX_REPORTED_ERRORS`] error messages.
    pub errors: Vec<String>,
    /// Per-sheet breakdown.
    pub sheets: Vec<SheetReport>,
    /// Summary text.
    pub message: String,
}

/// Applies parsed worksheets to storage.
pub struct Importer<S: ImportStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ImportStore + ?Sized> Importer<S> {
    /// Creates an importer writing through `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Imports every sheet, collecting errors instead of failing.
    pub async fn import(&self, sheets: Vec<SheetParse>) -> ImportReport {
        let mut errors = Vec::new();
        let mut reports = Vec::new();

        for sheet in sheets {
            match sheet {
                SheetParse::Parsed(sheet) => {
                    reports.push(self.import_sheet(sheet, &mut errors).await);
                },
                SheetParse::Rejected { name, reason } => {
                    warn!(sheet = %name, %reason, "Skipping worksheet");
                    errors.push(reason);
                },
            }
        }

        let total_read = reports.iter().map(|r| r.read).sum();
        let total_imported = reports.iter().map(|r| r.imported).sum();
        let total_skipped = reports.iter().map(|r| r.skipped).sum();
        let error_count = errors.len();
        errors.truncate(MAX_REPORTED_ERRORS);

        info!(total_read, total_imported, total_skipped, error_count, "Import finished");

        ImportReport {
            total_read,
            total_imported,
            total_skipped,
            error_count,
            errors,
            sheets: reports,
            message: format!(
                "Import completed. Rows read: {total_read}. Records imported: {total_imported}. \
                 Skipped: {total_skipped}."
            ),
        }
    }

    async fn import_sheet(&self, sheet: RentSheet, errors: &mut Vec<String>) -> SheetReport {
        let period = sheet.period.unwrap_or_else(|| {
            let fallback = self.clock.current_period();
            warn!(
                sheet = %sheet.name,
                cell = %sheet.period_cell,
                %fallback,
                "No reference date in A1, using current month"
            );
            fallback
        });

        let mut report =
            SheetReport { sheet: sheet.name.clone(), period: Some(period), ..SheetReport::default() };

        for row in &sheet.rows {
            report.read += 1;

            let property_id = match self.store.find_property_id(&row.property).await {
                Ok(Some(id)) => id,
                Ok(None) => {
                    errors.push(format!(
                        "Sheet '{}' row {}: property '{}' not found",
                        sheet.name, row.line, row.property
                    ));
                    report.skipped += 1;
                    continue;
                },
                Err(e) => {
                    errors.push(format!(
                        "Sheet '{}' row {}: failed to look up property '{}': {e}",
                        sheet.name, row.line, row.property
                    ));
                    report.skipped += 1;
                    continue;
                },
            };

            for cell in &row.amounts {
                let owner_id = match self.store.find_owner_id(&cell.owner).await {
                    Ok(Some(id)) => id,
                    Ok(None) => {
                        errors.push(format!(
                            "Sheet '{}' row {}: owner '{}' not found",
                            sheet.name, row.line, cell.owner
                        ));
                        report.skipped += 1;
                        continue;
                    },
                    Err(e) => {
                        errors.push(format!(
                            "Sheet '{}' row {}: failed to look up owner '{}': {e}",
                            sheet.name, row.line, cell.owner
                        ));
                        report.skipped += 1;
                        continue;
                    },
                };

                let amount = ImportedAmount {
                    property_id,
                    owner_id,
                    period,
                    net_amount: cell.amount,
                    total_admin_fee: row.admin_fee,
                };

                match self.store.upsert_amount(amount).await {
                    Ok(outcome) => {
                        report.imported += 1;
                        match outcome {
                            UpsertOutcome::Created => report.created += 1,
                            UpsertOutcome::Updated => report.updated += 1,
                        }
                        debug!(%property_id, %owner_id, %period, ?outcome, "Rental upserted");
                    },
                    Err(e) => {
                        errors.push(format!(
                            "Sheet '{}' row {}: failed to save rental for '{}': {e}",
                            sheet.name, row.line, cell.owner
                        ));
                        report.skipped += 1;
                    },
                }
            }
        }

        report.message = format!(
            "Sheet '{}': {} rows read, {} imported, {} skipped",
            report.sheet, report.read, report.imported, report.skipped
        );
        info!(
            sheet = %report.sheet,
            %period,
            read = report.read,
            imported = report.imported,
            skipped = report.skipped,
            "Worksheet imported"
        );

        report
    }
}

/// In-memory [`ImportStore`] for tests.
pub mod mock {
    use std::{
        collections::{HashMap, HashSet},
        sync::Mutex,
    };

    use super::*;
    use crate::error::CoreError;

    type Key = (PropertyId, OwnerId, Period);

    /// Records upserts in memory; names map to ids.
    #[derive(Debug, Default)]
    pub struct MockImportStore {
        properties: HashMap<String, PropertyId>,
        owners: HashMap<String, OwnerId>,
        failing_owners: HashSet<OwnerId>,
        records: Mutex<HashMap<Key, ImportedAmount>>,
    }

    impl MockImportStore {
        /// Creates an empty store.
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a property name.
        #[must_use]
        pub fn with_property(mut self, name: &str, id: i32) -> Self {
            self.properties.insert(name.to_string(), PropertyId(id));
            self
        }

        /// Registers an owner name.
        #[must_use]
        pub fn with_owner(mut self, name: &str, id: i32) -> Self {
            self.owners.insert(name.to_string(), OwnerId(id));
            self
        }

        /// Makes every upsert for this owner fail.
        #[must_use]
        pub fn failing_for_owner(mut self, id: i32) -> Self {
            self.failing_owners.insert(OwnerId(id));
            self
        }

        /// Stored record for the key, if any.
        pub fn record(
            &self,
            property_id: PropertyId,
            owner_id: OwnerId,
            period: Period,
        ) -> Option<ImportedAmount> {
            self.records
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(&(property_id, owner_id, period))
                .copied()
        }

        /// Number of stored records.
        pub fn len(&self) -> usize {
            self.records.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
        }

        /// Returns true when nothing was stored.
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl ImportStore for MockImportStore {
        fn find_property_id(
            &self,
            name: &str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<PropertyId>>> + Send + '_>> {
            let found = self.properties.get(name).copied();
            Box::pin(async move { Ok(found) })
        }

        fn find_owner_id(
            &self,
            name: &str,
        ) -> Pin<Box<dyn Future<Output = Result<Option<OwnerId>>> + Send + '_>> {
            let found = self.owners.get(name).copied();
            Box::pin(async move { Ok(found) })
        }

        fn upsert_amount(
            &self,
            amount: ImportedAmount,
        ) -> Pin<Box<dyn Future<Output = Result<UpsertOutcome>> + Send + '_>> {
            Box::pin(async move {
                if self.failing_owners.contains(&amount.owner_id) {
                    return Err(CoreError::Database("simulated write failure".to_string()));
                }
                let mut records =
                    self.records.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                let key = (amount.property_id, amount.owner_id, amount.period);
                let (outcome, fee) = match records.get(&key) {
                    Some(stored) => {
                        (UpsertOutcome::Updated, amount.total_admin_fee.or(stored.total_admin_fee))
                    },
                    None => (UpsertOutcome::Created, Some(amount.total_admin_fee.unwrap_or(0.0))),
                };
                records.insert(key, ImportedAmount { total_admin_fee: fee, ..amount });
                Ok(outcome)
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{mock::MockImportStore, *};
    use crate::{
        spreadsheet::{OwnerAmount, RentRow},
        time::TestClock,
    };

    fn march() -> Period {
        Period { year: 2024, month: 3 }
    }

    fn row(line: usize, property: &str, amounts: &[(&str, f64)], fee: Option<f64>) -> RentRow {
        RentRow {
            line,
            property: property.to_string(),
            amounts: amounts
                .iter()
                .map(|(owner, amount)| OwnerAmount { owner: (*owner).to_string(), amount: *amount })
                .collect(),
            admin_fee: fee,
        }
    }

    fn parsed(name: &str, period: Option<Period>, rows: Vec<RentRow>) -> SheetParse {
        SheetParse::Parsed(RentSheet {
            name: name.to_string(),
            period,
            period_cell: String::new(),
            owners: vec!["Alice".into(), "Bruno".into()],
            rows,
        })
    }

    fn importer(store: Arc<MockImportStore>) -> Importer<MockImportStore> {
        Importer::new(store, Arc::new(TestClock::at_date(2025, 7, 10)))
    }

    #[tokio::test]
    async fn imports_known_names_and_counts_rows() {
        let store = Arc::new(
            MockImportStore::new()
                .with_property("Main", 1)
                .with_owner("Alice", 10)
                .with_owner("Bruno", 11),
        );

        let report = importer(store.clone())
            .import(vec![parsed("March", Some(march()), vec![row(
                2,
                "Main",
                &[("Alice", 100.0), ("Bruno", 50.0)],
                Some(15.0),
            )])])
            .await;

        assert_eq!(report.total_read, 1);
        assert_eq!(report.total_imported, 2);
        assert_eq!(report.total_skipped, 0);
        assert_eq!(report.error_count, 0);
        assert_eq!(report.sheets[0].created, 2);

        let stored = store.record(PropertyId(1), OwnerId(10), march()).unwrap();
        assert_eq!(stored.net_amount, 100.0);
        assert_eq!(stored.total_admin_fee, Some(15.0));
    }

    #[tokio::test]
    async fn reimport_overwrites_existing_records() {
        let store = Arc::new(MockImportStore::new().with_property("Main", 1).with_owner("Alice", 10));
        let importer = importer(store.clone());

        importer
            .import(vec![parsed("A", Some(march()), vec![row(2, "Main", &[("Alice", 100.0)], Some(5.0))])])
            .await;
        let report = importer
            .import(vec![parsed("A", Some(march()), vec![row(2, "Main", &[("Alice", 130.0)], Some(6.0))])])
            .await;

        assert_eq!(report.sheets[0].updated, 1);
        assert_eq!(store.len(), 1);
        let stored = store.record(PropertyId(1), OwnerId(10), march()).unwrap();
        assert_eq!(stored.net_amount, 130.0);
        assert_eq!(stored.total_admin_fee, Some(6.0));
    }

    #[tokio::test]
    async fn blank_fee_keeps_the_stored_fee() {
        let store = Arc::new(MockImportStore::new().with_property("Main", 1).with_owner("Alice", 10));
        let importer = importer(store.clone());

        importer
            .import(vec![parsed("A", Some(march()), vec![row(2, "Main", &[("Alice", 100.0)], Some(45.0))])])
            .await;
        importer
            .import(vec![parsed("A", Some(march()), vec![row(2, "Main", &[("Alice", 120.0)], None)])])
            .await;

        let stored = store.record(PropertyId(1), OwnerId(10), march()).unwrap();
        assert_eq!(stored.net_amount, 120.0);
        assert_eq!(stored.total_admin_fee, Some(45.0));
    }

    #[tokio::test]
    async fn blank_fee_on_a_new_record_stores_zero() {
        let store = Arc::new(MockImportStore::new().with_property("Main", 1).with_owner("Alice", 10));

        importer(store.clone())
            .import(vec![parsed("A", Some(march()), vec![row(2, "Main", &[("Alice", 100.0)], None)])])
            .await;

        let stored = store.record(PropertyId(1), OwnerId(10), march()).unwrap();
        assert_eq!(stored.total_admin_fee, Some(0.0));
    }

    #[tokio::test]
    async fn unknown_property_skips_row_and_records_error() {
        let store = Arc::new(MockImportStore::new().with_owner("Alice", 10));

        let report = importer(store.clone())
            .import(vec![parsed("March", Some(march()), vec![row(
                4,
                "Ghost",
                &[("Alice", 100.0)],
                Some(0.0),
            )])])
            .await;

        assert_eq!(report.total_read, 1);
        assert_eq!(report.total_skipped, 1);
        assert_eq!(report.errors, vec!["Sheet 'March' row 4: property 'Ghost' not found".to_string()]);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unknown_owner_skips_only_that_cell() {
        let store = Arc::new(MockImportStore::new().with_property("Main", 1).with_owner("Alice", 10));

        let report = importer(store.clone())
            .import(vec![parsed("March", Some(march()), vec![row(
                2,
                "Main",
                &[("Alice", 100.0), ("Zed", 1.0)],
                Some(0.0),
            )])])
            .await;

        assert_eq!(report.total_imported, 1);
        assert_eq!(report.total_skipped, 1);
        assert_eq!(report.error_count, 1);
        assert!(report.errors[0].contains("owner 'Zed' not found"));
    }

    #[tokio::test]
    async fn write_failures_do_not_abort_the_run() {
        let store = Arc::new(
            MockImportStore::new()
                .with_property("Main", 1)
                .with_owner("Alice", 10)
                .with_owner("Bruno", 11)
                .failing_for_owner(10),
        );

        let report = importer(store.clone())
            .import(vec![parsed("March", Some(march()), vec![row(
                2,
                "Main",
                &[("Alice", 100.0), ("Bruno", 50.0)],
                Some(0.0),
            )])])
            .await;

        assert_eq!(report.total_imported, 1);
        assert_eq!(report.total_skipped, 1);
        assert!(report.errors[0].contains("failed to save rental for 'Alice'"));
        assert!(store.record(PropertyId(1), OwnerId(11), march()).is_some());
    }

    #[tokio::test]
    async fn missing_period_falls_back_to_clock_month() {
        let store = Arc::new(MockImportStore::new().with_property("Main", 1).with_owner("Alice", 10));

        let report = importer(store.clone())
            .import(vec![parsed("NoDate", None, vec![row(2, "Main", &[("Alice", 1.0)], Some(0.0))])])
            .await;

        let july = Period { year: 2025, month: 7 };
        assert_eq!(report.sheets[0].period, Some(july));
        assert!(store.record(PropertyId(1), OwnerId(10), july).is_some());
    }

    #[tokio::test]
    async fn rejected_sheets_are_reported_and_errors_truncated() {
        let store = Arc::new(MockImportStore::new());
        let mut sheets: Vec<SheetParse> = (0..12)
            .map(|i| SheetParse::Rejected { name: format!("S{i}"), reason: format!("bad {i}") })
            .collect();
        sheets.push(parsed("Ok", Some(march()), Vec::new()));

        let report = importer(store).import(sheets).await;

        assert_eq!(report.error_count, 12);
        assert_eq!(report.errors.len(), MAX_REPORTED_ERRORS);
        assert_eq!(report.sheets.len(), 1);
        assert_eq!(report.sheets[0].message, "Sheet 'Ok': 0 rows read, 0 imported, 0 skipped");
    }
}
