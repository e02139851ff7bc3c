//! Core domain models and strongly-typed identifiers.
//!
//! Defines properties, owners, monthly rental records, grouping aliases and
//! the reference period they are filed under. Identifiers are newtypes over
//! the database serial keys so a property id can never be passed where an
//! owner id is expected.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Strongly-typed property identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct PropertyId(pub i32);

/// Strongly-typed owner identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct OwnerId(pub i32);

/// Strongly-typed rental record identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct RentalId(pub i32);

/// Strongly-typed alias identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct AliasId(pub i32);

macro_rules! id_display {
    ($($ty:ty),+) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i32> for $ty {
                fn from(id: i32) -> Self {
                    Self(id)
                }
            }
        )+
    };
}

id_display!(PropertyId, OwnerId, RentalId, AliasId);

/// Reference month a rental record belongs to.
///
/// Ordering is chronological: year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year.
    pub year: i32,
    /// Calendar month, 1 through 12.
    pub month: i32,
}

impl Period {
    /// Creates a period, rejecting months outside 1..=12.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` for an out-of-range month.
    pub fn new(year: i32, month: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(CoreError::InvalidInput(format!("month must be between 1 and 12, got {month}")));
        }
        Ok(Self { year, month })
    }

    /// Period containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        // chrono months are always 1..=12
        Self { year: date.year(), month: i32::try_from(date.month()).unwrap_or(1) }
    }

    /// Human-readable label such as `March 2024`.
    ///
    /// Falls back to `month/year` when the month is out of range, which can
    /// only happen for rows written outside this service.
    pub fn label(&self) -> String {
        match month_name(self.month) {
            Some(name) => format!("{name} {}", self.year),
            None => format!("{}/{}", self.month, self.year),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

fn month_name(month: i32) -> Option<&'static str> {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    usize::try_from(month).ok().and_then(|m| m.checked_sub(1)).and_then(|i| NAMES.get(i).copied())
}

/// How the distribution matrix folds periods together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// A single month; missing parts default to the latest period on file.
    #[default]
    Month,
    /// Every month of one year.
    Year,
    /// Every record regardless of period.
    All,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
            Self::All => write!(f, "all"),
        }
    }
}

impl FromStr for Aggregation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "all" => Ok(Self::All),
            other => Err(CoreError::InvalidInput(format!(
                "aggregation must be one of month, year, all; got '{other}'"
            ))),
        }
    }
}

/// Listing order for rental records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest period first.
    Asc,
    /// Newest period first.
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else {
            Ok(Self::Desc)
        }
    }
}

/// A rented property.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Property {
    /// Unique identifier.
    pub id: PropertyId,
    /// Name used in spreadsheets; unique.
    pub name: String,
    /// Optional street address.
    pub address: Option<String>,
    /// When the property was registered.
    pub created_at: DateTime<Utc>,
}

/// Input for registering a property.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProperty {
    /// Property name.
    pub name: String,
    /// Optional street address.
    #[serde(default)]
    pub address: Option<String>,
}

/// A person entitled to a share of rental income.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Owner {
    /// Unique identifier.
    pub id: OwnerId,
    /// First name; matched against spreadsheet column headers.
    pub name: String,
    /// Optional surname.
    pub surname: Option<String>,
    /// When the owner was registered.
    pub created_at: DateTime<Utc>,
}

/// Compact owner view used by alias responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OwnerSummary {
    /// Owner identifier.
    pub id: OwnerId,
    /// First name.
    pub name: String,
    /// Surname, if known.
    pub surname: Option<String>,
}

/// Input for registering an owner.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOwner {
    /// First name.
    pub name: String,
    /// Optional surname.
    #[serde(default)]
    pub surname: Option<String>,
}

/// Monthly rental record for one owner of one property.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rental {
    /// Unique identifier.
    pub id: RentalId,
    /// Rented property.
    pub property_id: PropertyId,
    /// Owner receiving the income.
    pub owner_id: OwnerId,
    /// Reference year.
    pub year: i32,
    /// Reference month.
    pub month: i32,
    /// Net amount paid to the owner.
    pub net_amount: f64,
    /// Administration fee charged on the whole property.
    pub total_admin_fee: f64,
    /// Owner's share of the administration fee, maintained by the fee
    /// service.
    pub owner_admin_fee: Option<f64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Rental {
    /// Period this record is filed under.
    pub fn period(&self) -> Period {
        Period { year: self.year, month: self.month }
    }
}

/// Rental record joined with property and owner names.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RentalRecord {
    /// The stored record.
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub rental: Rental,
    /// Property name, absent if the property row vanished.
    pub property_name: Option<String>,
    /// Owner name, absent if the owner row vanished.
    pub owner_name: Option<String>,
}

/// Input for creating a rental record by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRental {
    /// Rented property.
    pub property_id: PropertyId,
    /// Owner receiving the income.
    pub owner_id: OwnerId,
    /// Reference year.
    pub year: i32,
    /// Reference month.
    pub month: i32,
    /// Net amount paid to the owner.
    #[serde(default)]
    pub net_amount: f64,
    /// Administration fee of the property.
    #[serde(default)]
    pub total_admin_fee: f64,
}

/// Partial update of a rental record's amounts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RentalUpdate {
    /// New net amount.
    pub net_amount: Option<f64>,
    /// New total administration fee.
    pub total_admin_fee: Option<f64>,
    /// New owner administration fee.
    pub owner_admin_fee: Option<f64>,
}

impl RentalUpdate {
    /// Returns true when no field would change.
    pub fn is_empty(&self) -> bool {
        self.net_amount.is_none() && self.total_admin_fee.is_none() && self.owner_admin_fee.is_none()
    }
}

/// Filters and paging for rental listings.
#[derive(Debug, Clone, Default)]
pub struct RentalFilter {
    /// Only this year.
    pub year: Option<i32>,
    /// Only this month.
    pub month: Option<i32>,
    /// Only this property.
    pub property_id: Option<PropertyId>,
    /// Only this owner.
    pub owner_id: Option<OwnerId>,
    /// Period ordering.
    pub order: SortOrder,
    /// Rows to skip.
    pub skip: i64,
    /// Maximum rows returned.
    pub limit: i64,
}

/// Named group of owners used by reports.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alias {
    /// Unique identifier.
    pub id: AliasId,
    /// Unique label.
    pub name: String,
    /// Grouped owners, in the order the administrator supplied them.
    pub owner_ids: Vec<OwnerId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an alias.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAlias {
    /// Unique label.
    pub name: String,
    /// Owners to group.
    #[serde(default)]
    pub owner_ids: Vec<OwnerId>,
}

/// Partial update of an alias.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasUpdate {
    /// New label.
    pub name: Option<String>,
    /// Replacement owner list.
    pub owner_ids: Option<Vec<OwnerId>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_rejects_invalid_month() {
        assert!(Period::new(2024, 0).is_err());
        assert!(Period::new(2024, 13).is_err());
        assert_eq!(Period::new(2024, 12).unwrap(), Period { year: 2024, month: 12 });
    }

    #[test]
    fn period_orders_chronologically() {
        let mut periods =
            vec![Period { year: 2024, month: 1 }, Period { year: 2023, month: 12 }, Period {
                year: 2024,
                month: 0,
            }];
        periods.sort();
        assert_eq!(periods[0], Period { year: 2023, month: 12 });
        assert_eq!(periods[2], Period { year: 2024, month: 1 });
    }

    #[test]
    fn period_label_uses_month_name() {
        assert_eq!(Period { year: 2024, month: 3 }.label(), "March 2024");
        assert_eq!(Period { year: 2024, month: 14 }.label(), "14/2024");
        assert_eq!(Period { year: 2024, month: 3 }.to_string(), "3/2024");
    }

    #[test]
    fn aggregation_parses_case_insensitively() {
        assert_eq!("YEAR".parse::<Aggregation>().unwrap(), Aggregation::Year);
        assert_eq!("all".parse::<Aggregation>().unwrap(), Aggregation::All);
        assert!("quarter".parse::<Aggregation>().is_err());
    }

    #[test]
    fn sort_order_defaults_to_desc() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("anything".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }

    #[test]
    fn ids_serialize_as_plain_integers() {
        let json = serde_json::to_string(&OwnerId(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn empty_rental_update_detected() {
        assert!(RentalUpdate::default().is_empty());
        assert!(!RentalUpdate { net_amount: Some(1.0), ..RentalUpdate::default() }.is_empty());
    }
}
