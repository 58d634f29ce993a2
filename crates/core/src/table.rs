use chrono::NaiveDate;

use crate::error::CoreError;

/// One normalized input cell. Loaders produce typed cells where the source
/// carries types (workbooks); delimited text yields `Text` only.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    /// Normalize a raw text field: trim whitespace, collapse empty and
    /// NaN-like sentinels to absence.
    pub fn from_raw(raw: &str) -> Option<Cell> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return None;
        }
        Some(Cell::Text(trimmed.to_string()))
    }

    /// Text rendering used when a typed cell lands in a text-mapped field
    /// (integral numbers drop the fractional point, dates render ISO).
    pub fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// An in-memory tabular snapshot: one header row plus data rows, all the
/// same width. Rows empty across every column are dropped on insert.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<Cell>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Table {
        Table { headers, rows: Vec::new() }
    }

    /// Append a row, dropping it when every cell is absent.
    pub fn push_row(&mut self, mut row: Vec<Option<Cell>>) {
        if row.iter().all(Option::is_none) {
            return;
        }
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Result<usize, CoreError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CoreError::MissingColumn { column: name.to_string() })
    }

    /// Parse delimited text with a header row. Short rows are padded.
    pub fn from_csv_str(content: &str, delimiter: u8) -> Result<Table, CoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| CoreError::Csv(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut table = Table::new(headers);
        for record in reader.records() {
            let record = record.map_err(|e| CoreError::Csv(e.to_string()))?;
            let row: Vec<Option<Cell>> = (0..table.headers.len())
                .map(|i| record.get(i).and_then(Cell::from_raw))
                .collect();
            table.push_row(row);
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
