//! Delimited exports consumed by the mailing-list and print collaborators.

use std::path::Path;

use rollcall_core::{HouseholdRow, ProjectionSchema, Record};

use crate::exit_codes::EXIT_RUNTIME;
use crate::CliError;

fn runtime_err(path: &Path, detail: impl std::fmt::Display) -> CliError {
    CliError {
        code: EXIT_RUNTIME,
        message: format!("cannot write '{}': {detail}", path.display()),
        hint: None,
    }
}

fn open_writer(path: &Path, delimiter: u8) -> Result<csv::Writer<std::fs::File>, CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| runtime_err(path, e))?;
        }
    }
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| runtime_err(path, e))
}

fn flag(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

/// Household export: one row per mail-keyed household, gender and category
/// flags as 1/0 columns in schema order.
pub fn write_household_rows(
    path: &Path,
    rows: &[HouseholdRow],
    schema: &ProjectionSchema,
    delimiter: u8,
) -> Result<(), CliError> {
    let mut writer = open_writer(path, delimiter)?;

    let mut header: Vec<&str> = vec!["first_names", "last_names", "email", "male", "female"];
    header.extend(schema.categories.iter().map(|c| c.label.as_str()));
    writer
        .write_record(&header)
        .map_err(|e| runtime_err(path, e))?;

    for row in rows {
        let mut record: Vec<String> = vec![
            row.first_names.clone(),
            row.last_names.clone(),
            row.email.clone().unwrap_or_default(),
            flag(row.male),
            flag(row.female),
        ];
        record.extend(row.categories.iter().map(|&b| flag(b)));
        writer
            .write_record(&record)
            .map_err(|e| runtime_err(path, e))?;
    }
    writer.flush().map_err(|e| runtime_err(path, e))
}

/// Per-person address export (used for the no-email list).
pub fn write_address_rows(
    path: &Path,
    records: &[Record],
    delimiter: u8,
) -> Result<(), CliError> {
    let mut writer = open_writer(path, delimiter)?;

    writer
        .write_record([
            "first_name",
            "last_name",
            "street",
            "plz",
            "city",
            "birthday",
            "category",
            "gender",
            "date_added",
        ])
        .map_err(|e| runtime_err(path, e))?;

    for record in records {
        let date = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%d.%m.%Y").to_string()).unwrap_or_default()
        };
        writer
            .write_record([
                record.first_name.clone().unwrap_or_default(),
                record.last_name.clone().unwrap_or_default(),
                record.street.clone().unwrap_or_default(),
                record.plz.clone().unwrap_or_default(),
                record.city.clone().unwrap_or_default(),
                date(record.birthday),
                record.category.clone().unwrap_or_default(),
                record.gender.map(|g| g.to_string()).unwrap_or_default(),
                date(record.date_added),
            ])
            .map_err(|e| runtime_err(path, e))?;
    }
    writer.flush().map_err(|e| runtime_err(path, e))
}
