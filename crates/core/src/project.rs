//! Category projection: one boolean vector per household for the
//! category-breakdown export. Pure read-side computation, the household
//! is never mutated.

use serde::Serialize;

use crate::config::ProjectionSchema;
use crate::field::{Field, Value};
use crate::household::{Household, HouseholdIndex};
use crate::record::Gender;

/// One export row per household: name strings, gender flags, and one flag
/// per schema category (in schema order).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseholdRow {
    pub email: Option<String>,
    pub first_names: String,
    pub last_names: String,
    pub male: bool,
    pub female: bool,
    pub categories: Vec<bool>,
}

/// Project a single household against the schema: a category flag is set
/// iff some member carries the source category the column translates;
/// gender flags likewise. Distinct first and last names are joined with
/// " & " (identical names collapse to one).
pub fn project(household: &Household, schema: &ProjectionSchema) -> HouseholdRow {
    let categories = household.property_list(Field::Category);
    let genders = household.property_list(Field::Gender);

    let has_category = |source: &str| {
        categories
            .iter()
            .any(|v| matches!(v, Some(Value::Text(t)) if t == source))
    };
    let has_gender = |gender: Gender| {
        genders
            .iter()
            .any(|v| matches!(v, Some(Value::Gender(g)) if *g == gender))
    };

    HouseholdRow {
        email: household.email().map(str::to_string),
        first_names: joined_names(household, Field::FirstName),
        last_names: joined_names(household, Field::LastName),
        male: has_gender(Gender::Male),
        female: has_gender(Gender::Female),
        categories: schema
            .categories
            .iter()
            .map(|c| has_category(&c.source))
            .collect(),
    }
}

/// One row per household with an email key, in household order. The
/// no-email household feeds the separate address export instead.
pub fn project_index(index: &HouseholdIndex, schema: &ProjectionSchema) -> Vec<HouseholdRow> {
    index
        .households()
        .iter()
        .filter(|h| h.email().is_some())
        .map(|h| project(h, schema))
        .collect()
}

fn joined_names(household: &Household, field: Field) -> String {
    let names: Vec<String> = household
        .property_list(field)
        .into_iter()
        .filter_map(|v| match v {
            Some(Value::Text(t)) => Some(t),
            _ => None,
        })
        .collect();
    names.join(" & ")
}
