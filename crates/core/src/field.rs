use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::record::Gender;

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// Every attribute the engine can read, compare, clear or backfill by name.
///
/// Config files and reconciliation passes address attributes through this
/// enum, so an unknown attribute name is rejected at deserialization time
/// and every access site is checked exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    MemberNumber,
    FirstName,
    LastName,
    Street,
    Plz,
    City,
    Gender,
    Birthday,
    /// Derived read view: first entry of the candidate list. Writing it
    /// replaces the whole list.
    Email,
    /// The full ordered candidate list.
    Emails,
    Category,
    DateAdded,
    PhonePrivate,
    PhoneMobile,
    GroupsMember,
    GroupsCoach,
    Tags,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::MemberNumber,
        Field::FirstName,
        Field::LastName,
        Field::Street,
        Field::Plz,
        Field::City,
        Field::Gender,
        Field::Birthday,
        Field::Email,
        Field::Emails,
        Field::Category,
        Field::DateAdded,
        Field::PhonePrivate,
        Field::PhoneMobile,
        Field::GroupsMember,
        Field::GroupsCoach,
        Field::Tags,
    ];

    /// List- or set-valued fields, where clearing a value removes matching
    /// elements rather than the whole container.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Field::Emails | Field::GroupsMember | Field::GroupsCoach | Field::Tags
        )
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MemberNumber => "member_number",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Street => "street",
            Self::Plz => "plz",
            Self::City => "city",
            Self::Gender => "gender",
            Self::Birthday => "birthday",
            Self::Email => "email",
            Self::Emails => "emails",
            Self::Category => "category",
            Self::DateAdded => "date_added",
            Self::PhonePrivate => "phone_private",
            Self::PhoneMobile => "phone_mobile",
            Self::GroupsMember => "groups_member",
            Self::GroupsCoach => "groups_coach",
            Self::Tags => "tags",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A field value detached from its record. `Ord` so distinct-value
/// projections sort deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Text(String),
    Int(i64),
    Date(NaiveDate),
    Gender(Gender),
    List(Vec<String>),
    Tags(BTreeSet<String>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Value {
        Value::Text(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Comparators
// ---------------------------------------------------------------------------

/// Comparators accepted by roster lookups: equality plus ordering for
/// date-range and threshold queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    /// Ordering comparisons between differently-typed values are false.
    pub fn compare(self, left: &Value, right: &Value) -> bool {
        match self {
            Cmp::Eq => left == right,
            Cmp::Ne => left != right,
            _ => {
                if std::mem::discriminant(left) != std::mem::discriminant(right) {
                    return false;
                }
                match self {
                    Cmp::Lt => left < right,
                    Cmp::Le => left <= right,
                    Cmp::Gt => left > right,
                    Cmp::Ge => left >= right,
                    Cmp::Eq | Cmp::Ne => unreachable!(),
                }
            }
        }
    }
}
