use std::fmt;

use crate::field::Field;

#[derive(Debug)]
pub enum CoreError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (non-scalar backfill field, empty schema, etc.).
    ConfigValidation(String),
    /// CSV parse error.
    Csv(String),
    /// A mapped source column does not exist in the input header row.
    MissingColumn { column: String },
    /// Date cell that fits neither the configured nor the ISO format.
    DateParse { row: usize, column: String, value: String },
    /// Member-number cell that is not a non-negative integer.
    NumberParse { row: usize, column: String, value: String },
    /// A record with a different resolved email was pushed into a keyed household.
    HouseholdKeyMismatch { key: Option<String>, found: Option<String> },
    /// More than one no-email household where exactly one is expected.
    DuplicateNoEmailHousehold { count: usize },
    /// Age requested for a record without a birthday.
    MissingBirthday { member: String },
    /// Typed write with a value of the wrong shape for the field.
    ValueType { field: Field },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::MissingColumn { column } => {
                write!(f, "mapped column '{column}' missing from input header")
            }
            Self::DateParse { row, column, value } => {
                write!(f, "row {row}, column '{column}': cannot parse date '{value}'")
            }
            Self::NumberParse { row, column, value } => {
                write!(f, "row {row}, column '{column}': cannot parse member number '{value}'")
            }
            Self::HouseholdKeyMismatch { key, found } => write!(
                f,
                "household keyed '{}' cannot take a member with email '{}'",
                key.as_deref().unwrap_or("<none>"),
                found.as_deref().unwrap_or("<none>"),
            ),
            Self::DuplicateNoEmailHousehold { count } => {
                write!(f, "{count} no-email households, expected exactly one")
            }
            Self::MissingBirthday { member } => {
                write!(f, "age requested for '{member}' who has no birthday")
            }
            Self::ValueType { field } => {
                write!(f, "value has the wrong type for field '{field}'")
            }
        }
    }
}

impl std::error::Error for CoreError {}
