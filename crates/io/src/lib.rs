//! `rollcall-io` — registry export loading.
//!
//! Turns delimited-text and workbook files into the core's `Table`.
//! Anything else is a fatal configuration error.

pub mod csv;
pub mod error;
pub mod xlsx;

use std::path::Path;

use rollcall_core::Table;

pub use error::IoError;

/// Load a registry export, dispatching on the file extension.
pub fn load_table(path: &Path) -> Result<Table, IoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "tsv" | "txt" => csv::load(path),
        "xls" | "xlsx" | "xlsm" | "xlsb" => xlsx::load(path),
        _ => Err(IoError::UnrecognizedFormat {
            path: path.display().to_string(),
        }),
    }
}
