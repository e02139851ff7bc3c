//! Report shaping: period resolution and owner × property matrices.
//!
//! SQL does the summing; this module decides which periods a request covers
//! and pivots the grouped rows into the matrix the reports render.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::models::{Aggregation, OwnerId, Period, PropertyId};

/// Period restriction applied to a report query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodFilter {
    /// One month.
    Month(Period),
    /// Every month of a year.
    Year(i32),
    /// No restriction.
    All,
}

impl PeriodFilter {
    /// Year bound, if any.
    pub fn year(&self) -> Option<i32> {
        match self {
            Self::Month(p) => Some(p.year),
            Self::Year(y) => Some(*y),
            Self::All => None,
        }
    }

    /// Month bound, if any.
    pub fn month(&self) -> Option<i32> {
        match self {
            Self::Month(p) => Some(p.month),
            Self::Year(_) | Self::All => None,
        }
    }

    /// Short description used in report headers.
    pub fn description(&self) -> String {
        match self {
            Self::Month(p) => p.to_string(),
            Self::Year(y) => format!("Year {y}"),
            Self::All => "All periods".to_string(),
        }
    }
}

/// Completes a partially specified period from the latest one on file.
///
/// Returns `None` when parts are missing and there is no data to borrow
/// them from.
pub fn fill_period(year: Option<i32>, month: Option<i32>, latest: Option<Period>) -> Option<Period> {
    match (year, month) {
        (Some(year), Some(month)) => Some(Period { year, month }),
        _ => latest.map(|latest| Period {
            year: year.unwrap_or(latest.year),
            month: month.unwrap_or(latest.month),
        }),
    }
}

/// Decides which periods a distribution request covers.
///
/// `Year` without a year behaves like `Month`, as does any request whose
/// aggregation is `Month`.
pub fn resolve_distribution_filter(
    aggregation: Aggregation,
    year: Option<i32>,
    month: Option<i32>,
    latest: Option<Period>,
) -> Option<PeriodFilter> {
    match (aggregation, year) {
        (Aggregation::All, _) => Some(PeriodFilter::All),
        (Aggregation::Year, Some(year)) => Some(PeriodFilter::Year(year)),
        _ => fill_period(year, month, latest).map(PeriodFilter::Month),
    }
}

/// Grouped sum for one owner and property.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DistributionCell {
    /// Owner.
    pub owner_id: OwnerId,
    /// Owner name, absent if the owner row is gone.
    pub owner_name: Option<String>,
    /// Property.
    pub property_id: PropertyId,
    /// Property name, absent if the property row is gone.
    pub property_name: Option<String>,
    /// Sum of net amounts.
    pub total: f64,
    /// Number of records summed.
    pub records: i64,
}

/// Axis ordering of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixOrdering {
    /// By identifier; unnamed entries are kept.
    ById,
    /// By name; unnamed entries are dropped.
    ByName,
}

/// Owner axis entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixOwner {
    /// Owner id.
    pub owner_id: OwnerId,
    /// Owner name.
    pub name: Option<String>,
}

/// Property axis entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixProperty {
    /// Property id.
    pub property_id: PropertyId,
    /// Property name.
    pub name: Option<String>,
}

/// One owner's amounts across all properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    /// Owner id.
    pub owner_id: OwnerId,
    /// Owner name.
    pub owner_name: Option<String>,
    /// Sum per property, keyed by property name (or id when unnamed).
    pub values: BTreeMap<String, f64>,
    /// Sum across the row.
    pub total: f64,
}

/// Owner × property distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistributionMatrix {
    /// Owner axis.
    pub owners: Vec<MatrixOwner>,
    /// Property axis.
    pub properties: Vec<MatrixProperty>,
    /// One row per owner, in owner axis order.
    pub rows: Vec<MatrixRow>,
}

impl DistributionMatrix {
    /// Pivots grouped cells into a dense matrix.
    ///
    /// Every row carries every property; absent combinations are 0.
    pub fn build(cells: &[DistributionCell], ordering: MatrixOrdering) -> Self {
        let cells: Vec<&DistributionCell> = match ordering {
            MatrixOrdering::ById => cells.iter().collect(),
            MatrixOrdering::ByName => {
                cells.iter().filter(|c| c.owner_name.is_some() && c.property_name.is_some()).collect()
            },
        };

        let mut owner_names: HashMap<OwnerId, Option<String>> = HashMap::new();
        let mut property_names: HashMap<PropertyId, Option<String>> = HashMap::new();
        let mut sums: HashMap<(OwnerId, PropertyId), f64> = HashMap::new();

        for cell in &cells {
            owner_names.entry(cell.owner_id).or_insert_with(|| cell.owner_name.clone());
            property_names.entry(cell.property_id).or_insert_with(|| cell.property_name.clone());
            *sums.entry((cell.owner_id, cell.property_id)).or_insert(0.0) += cell.total;
        }

        let mut owners: Vec<MatrixOwner> = owner_names
            .into_iter()
            .map(|(owner_id, name)| MatrixOwner { owner_id, name })
            .collect();
        let mut properties: Vec<MatrixProperty> = property_names
            .into_iter()
            .map(|(property_id, name)| MatrixProperty { property_id, name })
            .collect();

        match ordering {
            MatrixOrdering::ById => {
                owners.sort_by_key(|o| o.owner_id);
                properties.sort_by_key(|p| p.property_id);
            },
            MatrixOrdering::ByName => {
                owners.sort_by(|a, b| a.name.cmp(&b.name).then(a.owner_id.cmp(&b.owner_id)));
                properties
                    .sort_by(|a, b| a.name.cmp(&b.name).then(a.property_id.cmp(&b.property_id)));
            },
        }

        let rows = owners
            .iter()
            .map(|owner| {
                let mut values = BTreeMap::new();
                let mut total = 0.0;
                for property in &properties {
                    let value =
                        sums.get(&(owner.owner_id, property.property_id)).copied().unwrap_or(0.0);
                    values.insert(property_key(property), value);
                    total += value;
                }
                MatrixRow { owner_id: owner.owner_id, owner_name: owner.name.clone(), values, total }
            })
            .collect();

        Self { owners, properties, rows }
    }

    /// Returns true when no owner has any amount.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn property_key(property: &MatrixProperty) -> String {
    property.name.clone().unwrap_or_else(|| property.property_id.to_string())
}

/// Sum of one month, for trend charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTotal {
    /// Year.
    pub year: i32,
    /// Month.
    pub month: i32,
    /// Label such as `March 2024`.
    pub label: String,
    /// Sum of net amounts.
    pub total: f64,
    /// Number of records.
    pub records: i64,
}

impl MonthlyTotal {
    /// Converts newest-first grouped rows into a chronological series.
    pub fn chronological(newest_first: Vec<(Period, f64, i64)>) -> Vec<Self> {
        newest_first
            .into_iter()
            .rev()
            .map(|(period, total, records)| Self {
                year: period.year,
                month: period.month,
                label: period.label(),
                total,
                records,
            })
            .collect()
    }
}

/// Sum of one property in a period.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PropertyTotal {
    /// Property id.
    pub property_id: PropertyId,
    /// Property name.
    pub property_name: Option<String>,
    /// Sum of net amounts.
    pub total: f64,
    /// Number of owner records summed.
    pub records: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(owner: i32, owner_name: Option<&str>, property: i32, name: Option<&str>, total: f64) -> DistributionCell {
        DistributionCell {
            owner_id: OwnerId(owner),
            owner_name: owner_name.map(str::to_string),
            property_id: PropertyId(property),
            property_name: name.map(str::to_string),
            total,
            records: 1,
        }
    }

    #[test]
    fn fill_period_prefers_explicit_parts() {
        let latest = Some(Period { year: 2024, month: 5 });
        assert_eq!(fill_period(Some(2023), Some(2), None), Some(Period { year: 2023, month: 2 }));
        assert_eq!(fill_period(Some(2023), None, latest), Some(Period { year: 2023, month: 5 }));
        assert_eq!(fill_period(None, Some(1), latest), Some(Period { year: 2024, month: 1 }));
        assert_eq!(fill_period(None, None, None), None);
    }

    #[test]
    fn distribution_filter_resolution() {
        let latest = Some(Period { year: 2024, month: 5 });
        assert_eq!(
            resolve_distribution_filter(Aggregation::All, Some(2020), Some(1), None),
            Some(PeriodFilter::All)
        );
        assert_eq!(
            resolve_distribution_filter(Aggregation::Year, Some(2023), None, None),
            Some(PeriodFilter::Year(2023))
        );
        assert_eq!(
            resolve_distribution_filter(Aggregation::Year, None, None, latest),
            Some(PeriodFilter::Month(Period { year: 2024, month: 5 }))
        );
        assert_eq!(resolve_distribution_filter(Aggregation::Month, None, None, None), None);
    }

    #[test]
    fn filter_descriptions() {
        assert_eq!(PeriodFilter::Month(Period { year: 2024, month: 3 }).description(), "3/2024");
        assert_eq!(PeriodFilter::Year(2024).description(), "Year 2024");
        assert_eq!(PeriodFilter::All.description(), "All periods");
    }

    #[test]
    fn matrix_by_id_fills_gaps_with_zero() {
        let cells = vec![
            cell(2, Some("Bruno"), 1, Some("Main"), 50.0),
            cell(1, Some("Alice"), 1, Some("Main"), 100.0),
            cell(1, Some("Alice"), 3, None, 25.0),
        ];

        let matrix = DistributionMatrix::build(&cells, MatrixOrdering::ById);

        assert_eq!(matrix.owners.iter().map(|o| o.owner_id.0).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(matrix.properties.iter().map(|p| p.property_id.0).collect::<Vec<_>>(), vec![1, 3]);

        let alice = &matrix.rows[0];
        assert_eq!(alice.values["Main"], 100.0);
        assert_eq!(alice.values["3"], 25.0);
        assert_eq!(alice.total, 125.0);

        let bruno = &matrix.rows[1];
        assert_eq!(bruno.values["3"], 0.0);
        assert_eq!(bruno.total, 50.0);
    }

    #[test]
    fn matrix_by_name_sorts_and_drops_unnamed() {
        let cells = vec![
            cell(1, Some("Zoe"), 1, Some("Harbor"), 10.0),
            cell(2, Some("Alice"), 2, Some("Avenue"), 20.0),
            cell(3, None, 2, Some("Avenue"), 99.0),
        ];

        let matrix = DistributionMatrix::build(&cells, MatrixOrdering::ByName);

        let names: Vec<_> = matrix.owners.iter().map(|o| o.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["Alice", "Zoe"]);
        let properties: Vec<_> = matrix.properties.iter().map(|p| p.name.clone().unwrap()).collect();
        assert_eq!(properties, vec!["Avenue", "Harbor"]);
        assert_eq!(matrix.rows[0].values["Harbor"], 0.0);
        assert_eq!(matrix.rows[1].values["Harbor"], 10.0);
    }

    #[test]
    fn empty_cells_give_empty_matrix() {
        let matrix = DistributionMatrix::build(&[], MatrixOrdering::ById);
        assert!(matrix.is_empty());
        assert!(matrix.properties.is_empty());
    }

    #[test]
    fn monthly_totals_are_reversed_into_chronological_order() {
        let rows = vec![
            (Period { year: 2024, month: 2 }, 300.0, 3),
            (Period { year: 2024, month: 1 }, 200.0, 2),
            (Period { year: 2023, month: 12 }, 100.0, 1),
        ];

        let series = MonthlyTotal::chronological(rows);

        assert_eq!(series[0].label, "December 2023");
        assert_eq!(series[2].label, "February 2024");
        assert_eq!(series[2].records, 3);
    }
}
