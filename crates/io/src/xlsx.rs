// Workbook loading (xls, xlsx, xlsm, xlsb)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use rollcall_core::{Cell, Table};

use crate::error::IoError;

/// Load the first worksheet of a workbook. The first row is the header
/// row; every following row becomes a data row (fully empty rows are
/// dropped by the table).
pub fn load(path: &Path) -> Result<Table, IoError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IoError::Workbook(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| IoError::Workbook("workbook contains no sheets".into()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IoError::Workbook(format!("cannot read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => Vec::new(),
    };

    let mut table = Table::new(headers);
    for row in rows {
        table.push_row(row.iter().map(data_to_cell).collect());
    }
    Ok(table)
}

fn header_text(data: &Data) -> String {
    match data {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn data_to_cell(data: &Data) -> Option<Cell> {
    match data {
        Data::Empty => None,
        Data::String(s) => Cell::from_raw(s),
        Data::Float(n) => {
            if n.is_nan() {
                None
            } else {
                Some(Cell::Number(*n))
            }
        }
        Data::Int(n) => Some(Cell::Number(*n as f64)),
        Data::Bool(b) => Some(Cell::Bool(*b)),
        // Error cells carry no recoverable value
        Data::Error(_) => None,
        Data::DateTime(dt) => serial_to_date(dt.as_f64()).map(Cell::Date),
        Data::DateTimeIso(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(Cell::Date)
            .or_else(|| Cell::from_raw(s)),
        Data::DurationIso(s) => Cell::from_raw(s),
    }
}

/// Excel 1900-system serial to date. Day 0 maps to 1899-12-30 so the
/// system's phantom 1900-02-29 cancels out for modern dates.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let days = serial.floor();
    if days <= 0.0 || days > 2_958_465.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|epoch| epoch.checked_add_days(chrono::Days::new(days as u64)))
}
