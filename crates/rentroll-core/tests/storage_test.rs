//! Repository and import tests against a real PostgreSQL database.
//!
//! Run with `cargo test -- --ignored` and `DATABASE_URL` pointing at a
//! server where the user may create databases.

use std::sync::Arc;

use calamine::{Data, Range};
use rentroll_core::{
    import::{ImportedAmount, UpsertOutcome},
    report::PeriodFilter,
    spreadsheet::parse_sheet,
    Clock, Importer, OwnerId, Period, RentalFilter, RentalUpdate, SortOrder,
};
use rentroll_testing::{RentalBuilder, TestEnv};

fn sheet(rows: &[&[Data]]) -> Range<Data> {
    let height = u32::try_from(rows.len()).unwrap();
    let width = u32::try_from(rows.iter().map(|r| r.len()).max().unwrap_or(0)).unwrap();
    let mut range = Range::new((0, 0), (height - 1, width - 1));
    for (r, row) in rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            range.set_value((u32::try_from(r).unwrap(), u32::try_from(c).unwrap()), cell.clone());
        }
    }
    range
}

fn text(s: &str) -> Data {
    Data::String(s.to_string())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn upsert_reports_created_then_updated() {
    let env = TestEnv::new().await.expect("test env setup");
    let property = env.create_property("Harbor View").await.unwrap();
    let owner = env.create_owner("Alice").await.unwrap();
    let storage = env.storage();

    let amount = ImportedAmount {
        property_id: property.id,
        owner_id: owner.id,
        period: Period { year: 2024, month: 3 },
        net_amount: 1000.0,
        total_admin_fee: Some(80.0),
    };

    assert_eq!(storage.rentals.upsert_imported(&amount).await.unwrap(), UpsertOutcome::Created);
    let again = ImportedAmount { net_amount: 1200.0, ..amount };
    assert_eq!(storage.rentals.upsert_imported(&again).await.unwrap(), UpsertOutcome::Updated);

    let without_fee = ImportedAmount { net_amount: 1300.0, total_admin_fee: None, ..amount };
    assert_eq!(storage.rentals.upsert_imported(&without_fee).await.unwrap(), UpsertOutcome::Updated);

    let filter = RentalFilter { limit: 10, ..RentalFilter::default() };
    let records = storage.rentals.list(&filter).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rental.net_amount, 1300.0);
    assert_eq!(records[0].rental.total_admin_fee, 80.0);
    assert_eq!(records[0].property_name.as_deref(), Some("Harbor View"));
    assert_eq!(records[0].owner_name.as_deref(), Some("Alice"));
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn upsert_without_fee_inserts_zero() {
    let env = TestEnv::new().await.expect("test env setup");
    let property = env.create_property("Harbor View").await.unwrap();
    let owner = env.create_owner("Alice").await.unwrap();

    let amount = ImportedAmount {
        property_id: property.id,
        owner_id: owner.id,
        period: Period { year: 2024, month: 4 },
        net_amount: 500.0,
        total_admin_fee: None,
    };
    env.storage().rentals.upsert_imported(&amount).await.unwrap();

    let records =
        env.storage().rentals.list(&RentalFilter { limit: 10, ..RentalFilter::default() }).await.unwrap();
    assert_eq!(records[0].rental.total_admin_fee, 0.0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn duplicate_create_is_a_unique_violation() {
    let env = TestEnv::new().await.expect("test env setup");
    let property = env.create_property("Main St").await.unwrap();
    let owner = env.create_owner("Bruno").await.unwrap();

    env.create_rental(property.id, owner.id, 2024, 1, 500.0).await.unwrap();
    let err = env.create_rental(property.id, owner.id, 2024, 1, 600.0).await.unwrap_err();

    let core = err.downcast::<rentroll_core::CoreError>().unwrap();
    assert!(core.is_unique_violation());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn listing_orders_and_filters() {
    let env = TestEnv::new().await.expect("test env setup");
    // names sort opposite to ids
    let a = env.create_property("Zeta House").await.unwrap();
    let b = env.create_property("Alpha House").await.unwrap();
    let owner = env.create_owner("Carla").await.unwrap();

    env.create_rental(b.id, owner.id, 2023, 12, 10.0).await.unwrap();
    env.create_rental(a.id, owner.id, 2024, 2, 20.0).await.unwrap();
    env.create_rental(b.id, owner.id, 2024, 2, 30.0).await.unwrap();

    let storage = env.storage();
    let desc = storage.rentals.list(&RentalFilter { limit: 100, ..RentalFilter::default() }).await.unwrap();
    let order: Vec<_> = desc.iter().map(|r| (r.rental.year, r.rental.month, r.rental.property_id)).collect();
    assert_eq!(order, vec![(2024, 2, a.id), (2024, 2, b.id), (2023, 12, b.id)]);

    let asc = storage
        .rentals
        .list(&RentalFilter { order: SortOrder::Asc, limit: 100, ..RentalFilter::default() })
        .await
        .unwrap();
    let order: Vec<_> = asc.iter().map(|r| (r.rental.year, r.rental.month, r.rental.property_id)).collect();
    assert_eq!(order, vec![(2023, 12, b.id), (2024, 2, a.id), (2024, 2, b.id)]);

    let only_b = storage
        .rentals
        .list(&RentalFilter { property_id: Some(b.id), year: Some(2024), limit: 100, ..RentalFilter::default() })
        .await
        .unwrap();
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].rental.net_amount, 30.0);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn missing_owners_follow_input_order() {
    let env = TestEnv::new().await.expect("test env setup");
    let known = env.create_owner("Elisa").await.unwrap();

    let missing = env
        .storage()
        .owners
        .missing(&[OwnerId(900), known.id, OwnerId(800), OwnerId(900)])
        .await
        .unwrap();

    assert_eq!(missing, vec![OwnerId(900), OwnerId(800)]);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn update_and_delete() {
    let env = TestEnv::new().await.expect("test env setup");
    let property = env.create_property("Loft").await.unwrap();
    let owner = env.create_owner("Davi").await.unwrap();
    let storage = env.storage();
    let rental = storage
        .rentals
        .create(&RentalBuilder::new(property.id, owner.id, 2024, 5).net(100.0).admin_fee(12.0).build())
        .await
        .unwrap();

    let updated = storage
        .rentals
        .update(rental.id, &RentalUpdate { owner_admin_fee: Some(7.5), ..RentalUpdate::default() })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.net_amount, 100.0);
    assert_eq!(updated.total_admin_fee, 12.0);
    assert_eq!(updated.owner_admin_fee, Some(7.5));

    assert!(storage.rentals.delete(rental.id).await.unwrap());
    assert!(!storage.rentals.delete(rental.id).await.unwrap());
    assert!(storage.rentals.find_record(rental.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn aggregates_cover_periods_and_owners() {
    let env = TestEnv::new().await.expect("test env setup");
    let main = env.create_property("Main").await.unwrap();
    let park = env.create_property("Park").await.unwrap();
    let alice = env.create_owner("Alice").await.unwrap();
    let bruno = env.create_owner("Bruno").await.unwrap();

    env.create_rental(main.id, alice.id, 2024, 1, 100.0).await.unwrap();
    env.create_rental(main.id, bruno.id, 2024, 1, 50.0).await.unwrap();
    env.create_rental(park.id, alice.id, 2024, 2, 70.0).await.unwrap();
    env.create_rental(park.id, alice.id, 2023, 6, 10.0).await.unwrap();
    let storage = env.storage();

    assert_eq!(storage.rentals.distinct_years().await.unwrap(), vec![2024, 2023]);
    assert_eq!(storage.rentals.latest_period().await.unwrap(), Some(Period { year: 2024, month: 2 }));

    let totals = storage.rentals.totals_by_property(Period { year: 2024, month: 1 }).await.unwrap();
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].total, 150.0);
    assert_eq!(totals[0].records, 2);

    let months = storage.rentals.totals_by_month(2).await.unwrap();
    assert_eq!(months[0].0, Period { year: 2024, month: 2 });
    assert_eq!(months.len(), 2);

    let cells = storage.rentals.distribution_cells(PeriodFilter::Year(2024), None).await.unwrap();
    assert_eq!(cells.len(), 3);
    let stats = storage.rentals.distribution_stats(PeriodFilter::Year(2024), None).await.unwrap();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.periods_included, 2);

    let alice_only =
        storage.rentals.distribution_stats(PeriodFilter::All, Some(alice.id)).await.unwrap();
    assert_eq!(alice_only.total_records, 3);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn importer_writes_through_storage() {
    let env = TestEnv::new().await.expect("test env setup");
    let property = env.create_property("Harbor View").await.unwrap();
    let alice = env.create_owner("Alice").await.unwrap();
    env.create_owner("Bruno").await.unwrap();

    let range = sheet(&[
        &[text("2024-03-01"), text("Code"), text("Alice"), text("Bruno"), text("Fee")],
        &[text("Harbor View"), Data::Empty, Data::Float(900.0), Data::Float(0.0), Data::Float(75.0)],
        &[text("Unknown Tower"), Data::Empty, Data::Float(10.0), Data::Float(10.0), Data::Float(1.0)],
    ]);
    let clock: Arc<dyn Clock> = Arc::new(env.clock.clone());
    let importer = Importer::new(env.storage(), clock);

    let report = importer.import(vec![parse_sheet("March", &range)]).await;

    assert_eq!(report.total_read, 2);
    assert_eq!(report.total_imported, 1);
    assert_eq!(report.error_count, 1);
    assert!(report.errors[0].contains("property 'Unknown Tower' not found"));

    let records = env
        .storage()
        .rentals
        .list(&RentalFilter { owner_id: Some(alice.id), limit: 10, ..RentalFilter::default() })
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].rental.property_id, property.id);
    assert_eq!(records[0].rental.total_admin_fee, 75.0);
    assert_eq!(records[0].rental.period(), Period { year: 2024, month: 3 });
}
