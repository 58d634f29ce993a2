use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::CoreError;
use crate::field::{Field, Value};

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Collapse the free-form labels carried by registry exports to the
    /// three values the engine distinguishes.
    pub fn parse(raw: &str) -> Option<Gender> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.to_lowercase().as_str() {
            "m" | "male" | "männlich" | "maennlich" => Some(Gender::Male),
            "w" | "f" | "female" | "weiblich" => Some(Gender::Female),
            _ => Some(Gender::Other),
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One registry entry. Absence is always `None` (text is trimmed and
/// empty/NaN-like sentinels collapsed at load time), and derived values
/// (`email`, age) are recomputed on demand rather than cached.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    pub member_number: Option<u32>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street: Option<String>,
    pub plz: Option<String>,
    pub city: Option<String>,
    pub gender: Option<Gender>,
    pub birthday: Option<NaiveDate>,
    /// Ordered candidate email addresses. The resolved contact address is
    /// the first entry.
    pub emails: Vec<String>,
    pub category: Option<String>,
    pub date_added: Option<NaiveDate>,
    pub phone_private: Option<String>,
    pub phone_mobile: Option<String>,
    pub groups_member: Vec<String>,
    pub groups_coach: Vec<String>,
    /// Post-load annotations, never read from source data.
    pub tags: BTreeSet<String>,
}

impl Record {
    /// Resolved contact address: first non-empty candidate.
    pub fn email(&self) -> Option<&str> {
        self.emails.iter().find(|e| !e.is_empty()).map(String::as_str)
    }

    /// Replace the whole candidate list with a singleton, or clear it.
    /// Alternate candidate addresses previously known are dropped.
    pub fn set_email(&mut self, email: Option<String>) {
        match email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(e) => self.emails = vec![e.to_string()],
            None => self.emails.clear(),
        }
    }

    /// Whole years elapsed between birthday and `on`: the year difference,
    /// minus one if `on`'s (month, day) precedes the birthday's.
    pub fn age_at(&self, on: NaiveDate) -> Result<i32, CoreError> {
        let birthday = self.birthday.ok_or_else(|| CoreError::MissingBirthday {
            member: self.display_name(),
        })?;
        let mut age = on.year() - birthday.year();
        if (on.month(), on.day()) < (birthday.month(), birthday.day()) {
            age -= 1;
        }
        Ok(age)
    }

    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => "<unnamed>".to_string(),
        }
    }

    pub fn get(&self, field: Field) -> Option<Value> {
        match field {
            Field::MemberNumber => self.member_number.map(|n| Value::Int(i64::from(n))),
            Field::FirstName => self.first_name.clone().map(Value::Text),
            Field::LastName => self.last_name.clone().map(Value::Text),
            Field::Street => self.street.clone().map(Value::Text),
            Field::Plz => self.plz.clone().map(Value::Text),
            Field::City => self.city.clone().map(Value::Text),
            Field::Gender => self.gender.map(Value::Gender),
            Field::Birthday => self.birthday.map(Value::Date),
            Field::Email => self.email().map(Value::text),
            Field::Emails => non_empty(&self.emails).map(Value::List),
            Field::Category => self.category.clone().map(Value::Text),
            Field::DateAdded => self.date_added.map(Value::Date),
            Field::PhonePrivate => self.phone_private.clone().map(Value::Text),
            Field::PhoneMobile => self.phone_mobile.clone().map(Value::Text),
            Field::GroupsMember => non_empty(&self.groups_member).map(Value::List),
            Field::GroupsCoach => non_empty(&self.groups_coach).map(Value::List),
            Field::Tags => {
                if self.tags.is_empty() {
                    None
                } else {
                    Some(Value::Tags(self.tags.clone()))
                }
            }
        }
    }

    /// Typed write. A value of the wrong shape for the field is a
    /// precondition violation, not a coercion.
    pub fn set(&mut self, field: Field, value: Option<Value>) -> Result<(), CoreError> {
        let Some(value) = value else {
            self.clear(field);
            return Ok(());
        };
        let mismatch = || CoreError::ValueType { field };
        match (field, value) {
            (Field::MemberNumber, Value::Int(n)) => {
                self.member_number = Some(u32::try_from(n).map_err(|_| mismatch())?);
            }
            (Field::FirstName, Value::Text(s)) => self.first_name = Some(s),
            (Field::LastName, Value::Text(s)) => self.last_name = Some(s),
            (Field::Street, Value::Text(s)) => self.street = Some(s),
            (Field::Plz, Value::Text(s)) => self.plz = Some(s),
            (Field::City, Value::Text(s)) => self.city = Some(s),
            (Field::Gender, Value::Gender(g)) => self.gender = Some(g),
            (Field::Birthday, Value::Date(d)) => self.birthday = Some(d),
            (Field::Email, Value::Text(s)) => self.set_email(Some(s)),
            (Field::Emails, Value::List(list)) => self.emails = list,
            (Field::Category, Value::Text(s)) => self.category = Some(s),
            (Field::DateAdded, Value::Date(d)) => self.date_added = Some(d),
            (Field::PhonePrivate, Value::Text(s)) => self.phone_private = Some(s),
            (Field::PhoneMobile, Value::Text(s)) => self.phone_mobile = Some(s),
            (Field::GroupsMember, Value::List(list)) => self.groups_member = list,
            (Field::GroupsCoach, Value::List(list)) => self.groups_coach = list,
            (Field::Tags, Value::Tags(tags)) => self.tags = tags,
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    /// Clear an attribute to absence. Clearing `Email` clears the whole
    /// candidate list, per the setter semantics.
    pub fn clear(&mut self, field: Field) {
        match field {
            Field::MemberNumber => self.member_number = None,
            Field::FirstName => self.first_name = None,
            Field::LastName => self.last_name = None,
            Field::Street => self.street = None,
            Field::Plz => self.plz = None,
            Field::City => self.city = None,
            Field::Gender => self.gender = None,
            Field::Birthday => self.birthday = None,
            Field::Email | Field::Emails => self.emails.clear(),
            Field::Category => self.category = None,
            Field::DateAdded => self.date_added = None,
            Field::PhonePrivate => self.phone_private = None,
            Field::PhoneMobile => self.phone_mobile = None,
            Field::GroupsMember => self.groups_member.clear(),
            Field::GroupsCoach => self.groups_coach.clear(),
            Field::Tags => self.tags.clear(),
        }
    }

    /// Remove one element from a list-valued field. Returns whether
    /// anything was removed.
    pub(crate) fn remove_list_value(&mut self, field: Field, needle: &str) -> bool {
        match field {
            Field::Emails => {
                let before = self.emails.len();
                self.emails.retain(|e| e != needle);
                self.emails.len() != before
            }
            Field::GroupsMember => {
                let before = self.groups_member.len();
                self.groups_member.retain(|g| g != needle);
                self.groups_member.len() != before
            }
            Field::GroupsCoach => {
                let before = self.groups_coach.len();
                self.groups_coach.retain(|g| g != needle);
                self.groups_coach.len() != before
            }
            Field::Tags => self.tags.remove(needle),
            _ => false,
        }
    }
}

fn non_empty(list: &[String]) -> Option<Vec<String>> {
    if list.is_empty() {
        None
    } else {
        Some(list.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_whole_years_rule() {
        let record = Record {
            birthday: Some(date(1996, 8, 22)),
            ..Record::default()
        };
        assert_eq!(record.age_at(date(2023, 8, 21)).unwrap(), 26);
        assert_eq!(record.age_at(date(2023, 8, 22)).unwrap(), 27);
    }

    #[test]
    fn age_without_birthday_is_an_error() {
        let record = Record::default();
        assert!(matches!(
            record.age_at(date(2023, 1, 1)),
            Err(CoreError::MissingBirthday { .. })
        ));
    }

    #[test]
    fn email_is_first_candidate() {
        let record = Record {
            emails: vec!["ann@x.com".into(), "ann@backup.org".into()],
            ..Record::default()
        };
        assert_eq!(record.email(), Some("ann@x.com"));
    }

    #[test]
    fn setting_email_drops_alternate_candidates() {
        let mut record = Record {
            emails: vec!["ann@x.com".into(), "ann@backup.org".into()],
            ..Record::default()
        };
        record.set_email(Some("new@x.com".into()));
        assert_eq!(record.emails, vec!["new@x.com".to_string()]);
        record.set_email(None);
        assert_eq!(record.email(), None);
        assert!(record.emails.is_empty());
    }

    #[test]
    fn get_after_set_round_trips_every_field() {
        let samples: Vec<(Field, Value)> = vec![
            (Field::MemberNumber, Value::Int(1042)),
            (Field::FirstName, Value::text("Ann")),
            (Field::LastName, Value::text("Lee")),
            (Field::Street, Value::text("Hauptstrasse 1")),
            (Field::Plz, Value::text("5436")),
            (Field::City, Value::text("Würenlos")),
            (Field::Gender, Value::Gender(Gender::Female)),
            (Field::Birthday, Value::Date(date(1996, 8, 22))),
            (Field::Email, Value::text("ann@x.com")),
            (Field::Emails, Value::List(vec!["a@x.com".into(), "b@x.com".into()])),
            (Field::Category, Value::text("Aktive Turnerin")),
            (Field::DateAdded, Value::Date(date(2015, 1, 1))),
            (Field::PhonePrivate, Value::text("056 000 00 00")),
            (Field::PhoneMobile, Value::text("079 000 00 00")),
            (Field::GroupsMember, Value::List(vec!["Volleyball".into()])),
            (Field::GroupsCoach, Value::List(vec!["Jugi".into()])),
            (
                Field::Tags,
                Value::Tags(["base-member".to_string()].into_iter().collect()),
            ),
        ];
        for (field, value) in samples {
            let mut record = Record::default();
            record.set(field, Some(value.clone())).unwrap();
            assert_eq!(record.get(field), Some(value), "round trip for {field}");
        }
    }

    #[test]
    fn set_rejects_mismatched_value_type() {
        let mut record = Record::default();
        let err = record.set(Field::Birthday, Some(Value::text("not a date")));
        assert!(matches!(err, Err(CoreError::ValueType { field: Field::Birthday })));
    }

    #[test]
    fn gender_parse_collapses_source_labels() {
        assert_eq!(Gender::parse("Männlich"), Some(Gender::Male));
        assert_eq!(Gender::parse("Weiblich"), Some(Gender::Female));
        assert_eq!(Gender::parse("divers"), Some(Gender::Other));
        assert_eq!(Gender::parse("  "), None);
    }
}
