//! Property tests for distribution matrices.

use proptest::prelude::*;
use rentroll_core::{
    report::{DistributionCell, DistributionMatrix, MatrixOrdering},
    OwnerId, PropertyId,
};

fn cells() -> impl Strategy<Value = Vec<DistributionCell>> {
    prop::collection::vec((1..6i32, 1..6i32, 0..10_000i32), 0..30).prop_map(|raw| {
        raw.into_iter()
            .map(|(owner, property, cents)| DistributionCell {
                owner_id: OwnerId(owner),
                owner_name: Some(format!("owner-{owner}")),
                property_id: PropertyId(property),
                property_name: Some(format!("property-{property}")),
                total: f64::from(cents) / 100.0,
                records: 1,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

    #[test]
    fn every_row_is_dense_and_sums_to_its_total(cells in cells()) {
        let matrix = DistributionMatrix::build(&cells, MatrixOrdering::ById);

        for row in &matrix.rows {
            prop_assert_eq!(row.values.len(), matrix.properties.len());
            let sum: f64 = row.values.values().sum();
            prop_assert!((sum - row.total).abs() < 1e-6);
        }
    }

    #[test]
    fn grand_total_is_preserved(cells in cells()) {
        let matrix = DistributionMatrix::build(&cells, MatrixOrdering::ByName);

        let input: f64 = cells.iter().map(|c| c.total).sum();
        let output: f64 = matrix.rows.iter().map(|r| r.total).sum();
        prop_assert!((input - output).abs() < 1e-6);
    }

    #[test]
    fn axes_are_sorted_by_id(cells in cells()) {
        let matrix = DistributionMatrix::build(&cells, MatrixOrdering::ById);

        prop_assert!(matrix.owners.windows(2).all(|w| w[0].owner_id < w[1].owner_id));
        prop_assert!(matrix.properties.windows(2).all(|w| w[0].property_id < w[1].property_id));
    }
}
