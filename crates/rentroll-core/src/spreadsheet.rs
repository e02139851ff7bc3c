//! Parsing of matrix-shaped rent worksheets.
//!
//! Each worksheet lays out one reference month:
//!
//! ```text
//!        A            B        C .. (last - 1)      last
//! 1   <period>     (ignored)   owner names ...     admin fee
//! 2   property     (ignored)   net amounts ...     total fee
//! ```
//!
//! Parsing is pure; looking names up and writing records is done by
//! [`crate::import`].

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::{error::Result, models::Period};

/// Minimum number of columns: property, ignored, one owner, admin fee.
pub const MIN_COLUMNS: usize = 4;

const SUPPORTED_EXTENSIONS: [&str; 2] = [".xlsx", ".xls"];

/// Returns true for file names the importer accepts.
pub fn is_supported_file_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Net amount owed to one owner, as read from a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerAmount {
    /// Owner name taken from the column header.
    pub owner: String,
    /// Non-zero net amount.
    pub amount: f64,
}

/// One property line of a worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RentRow {
    /// 1-based row number as shown by spreadsheet applications.
    pub line: usize,
    /// Property name from column A.
    pub property: String,
    /// Non-empty, non-zero owner cells in column order.
    pub amounts: Vec<OwnerAmount>,
    /// Total administration fee from the last column, `None` when the cell
    /// is empty or not a number.
    pub admin_fee: Option<f64>,
}

/// A worksheet that passed structural validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RentSheet {
    /// Worksheet name.
    pub name: String,
    /// Period read from A1, `None` when the cell held no usable date.
    pub period: Option<Period>,
    /// Raw A1 content, kept for logging.
    pub period_cell: String,
    /// Owner names from the header row.
    pub owners: Vec<String>,
    /// Property lines, blank rows excluded.
    pub rows: Vec<RentRow>,
}

/// Outcome of parsing one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetParse {
    /// Structurally valid sheet.
    Parsed(RentSheet),
    /// Sheet that cannot be imported at all.
    Rejected {
        /// Worksheet name.
        name: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// Opens an `.xlsx`/`.xls` workbook from memory and parses every sheet.
///
/// # Errors
///
/// Returns `CoreError::InvalidWorkbook` if the bytes are not a readable
/// workbook. Per-sheet problems are reported as [`SheetParse::Rejected`].
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<SheetParse>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        match workbook.worksheet_range(&name) {
            Ok(range) => sheets.push(parse_sheet(&name, &range)),
            Err(e) => sheets.push(SheetParse::Rejected {
                reason: format!("Sheet '{name}': could not be read: {e}"),
                name,
            }),
        }
    }

    Ok(sheets)
}

/// Parses a single worksheet range.
///
/// Cell positions are absolute, so a sheet whose A1 is empty still keeps
/// its owner columns in place.
pub fn parse_sheet(name: &str, range: &Range<Data>) -> SheetParse {
    let Some((last_row, last_col)) = range.end() else {
        return too_few_columns(name);
    };

    let columns = last_col as usize + 1;
    if columns < MIN_COLUMNS {
        return too_few_columns(name);
    }

    let cell = |row: u32, col: u32| range.get_value((row, col)).unwrap_or(&Data::Empty);

    let period_data = cell(0, 0);
    let period = period_from_cell(period_data);
    let period_cell = cell_text(period_data);

    let owners: Vec<String> = (2..last_col).map(|col| cell_text(cell(0, col))).collect();

    let mut rows = Vec::new();
    for row in 1..=last_row {
        if (0..=last_col).all(|col| is_blank(cell(row, col))) {
            continue;
        }

        let amounts = owners
            .iter()
            .zip(2..last_col)
            .filter_map(|(owner, col)| {
                cell_amount(cell(row, col))
                    .filter(|amount| *amount != 0.0)
                    .map(|amount| OwnerAmount { owner: owner.clone(), amount })
            })
            .collect();

        rows.push(RentRow {
            line: row as usize + 1,
            property: cell_text(cell(row, 0)),
            amounts,
            admin_fee: cell_amount(cell(row, last_col)),
        });
    }

    debug!(sheet = name, owners = owners.len(), rows = rows.len(), ?period, "Parsed worksheet");

    SheetParse::Parsed(RentSheet { name: name.to_string(), period, period_cell, owners, rows })
}

fn too_few_columns(name: &str) -> SheetParse {
    SheetParse::Rejected {
        name: name.to_string(),
        reason: format!(
            "Sheet '{name}': must have at least {MIN_COLUMNS} columns: property, ignored, at \
             least one owner and administration fee"
        ),
    }
}

fn is_blank(data: &Data) -> bool {
    match data {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text content of a cell, trimmed.
fn cell_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.is_finite() => format!("{f:.0}"),
        other => other.to_string().trim().to_string(),
    }
}

/// Numeric content of a cell; `None` for empty, NaN or non-numeric cells.
fn cell_amount(data: &Data) -> Option<f64> {
    let value = match data {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Reference period from the A1 cell.
pub fn period_from_cell(data: &Data) -> Option<Period> {
    match data {
        Data::DateTime(dt) => dt.as_datetime().map(|dt| Period::from_date(dt.date())),
        Data::DateTimeIso(s) | Data::String(s) => parse_period_text(s),
        _ => None,
    }
}

/// Parses the textual date formats seen in A1 cells.
pub fn parse_period_text(text: &str) -> Option<Period> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Period::from_date(dt.date_naive()));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
    {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Period::from_date(dt.date()));
        }
    }

    for format in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(Period::from_date(date));
        }
    }

    // Month-only forms
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d") {
        return Some(Period::from_date(date));
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("01/{text}"), "%d/%m/%Y") {
        return Some(Period::from_date(date));
    }

    None
}
