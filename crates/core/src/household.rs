use std::collections::HashMap;

use serde::Serialize;

use crate::error::CoreError;
use crate::field::{Field, Value};
use crate::record::Record;
use crate::roster::Roster;

/// Records sharing one resolved email, or the single no-email group.
/// Always non-empty. Members are cloned snapshots: mutating the source
/// roster after grouping never moves anyone between households — regroup
/// instead.
#[derive(Debug, Clone, Serialize)]
pub struct Household {
    email: Option<String>,
    members: Vec<Record>,
}

impl Household {
    fn new(record: Record) -> Household {
        Household {
            email: record.email().map(str::to_string),
            members: vec![record],
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn members(&self) -> &[Record] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Appending a member whose resolved email differs from the household
    /// key is a caller bug, surfaced immediately and never repaired by
    /// reassignment.
    pub fn push(&mut self, record: Record) -> Result<(), CoreError> {
        let found = record.email().map(str::to_string);
        if found != self.email {
            return Err(CoreError::HouseholdKeyMismatch {
                key: self.email.clone(),
                found,
            });
        }
        self.members.push(record);
        Ok(())
    }

    /// Distinct, sorted values of the attribute across all members.
    /// Absence participates and sorts first, so "some member has no
    /// value" stays visible to lookups.
    pub fn property_list(&self, field: Field) -> Vec<Option<Value>> {
        let mut values: Vec<Option<Value>> =
            self.members.iter().map(|m| m.get(field)).collect();
        values.sort();
        values.dedup();
        values
    }
}

/// Partition of a roster into email-keyed households, preserving
/// first-seen order of distinct keys. Recomputed in full whenever the
/// underlying roster changes.
#[derive(Debug, Default)]
pub struct HouseholdIndex {
    households: Vec<Household>,
    by_key: HashMap<Option<String>, usize>,
}

impl HouseholdIndex {
    pub fn group(roster: &Roster) -> Result<HouseholdIndex, CoreError> {
        let mut index = HouseholdIndex::default();
        for record in roster.iter() {
            index.insert(record.clone())?;
        }
        Ok(index)
    }

    fn insert(&mut self, record: Record) -> Result<(), CoreError> {
        let key = record.email().map(str::to_string);
        match self.by_key.get(&key) {
            Some(&i) => self.households[i].push(record),
            None => {
                self.by_key.insert(key, self.households.len());
                self.households.push(Household::new(record));
                Ok(())
            }
        }
    }

    pub fn households(&self) -> &[Household] {
        &self.households
    }

    pub fn len(&self) -> usize {
        self.households.len()
    }

    pub fn is_empty(&self) -> bool {
        self.households.is_empty()
    }

    /// Households whose distinct-value projection for the attribute
    /// contains the search value.
    pub fn lookup(&self, field: Field, value: Option<&Value>) -> Vec<&Household> {
        self.households
            .iter()
            .filter(|h| h.property_list(field).iter().any(|v| v.as_ref() == value))
            .collect()
    }

    /// The single household of records without a resolved email, if any.
    /// More than one indicates a severe grouping bug.
    pub fn no_email_household(&self) -> Result<Option<&Household>, CoreError> {
        let found: Vec<&Household> = self
            .households
            .iter()
            .filter(|h| h.email.is_none())
            .collect();
        if found.len() > 1 {
            return Err(CoreError::DuplicateNoEmailHousehold { count: found.len() });
        }
        Ok(found.first().copied())
    }

    /// All members in household order. Grouping must lose or duplicate
    /// nothing, so this is the roster's records modulo order.
    pub fn flatten(&self) -> Vec<&Record> {
        self.households
            .iter()
            .flat_map(|h| h.members.iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(first: &str, email: Option<&str>, category: &str) -> Record {
        Record {
            first_name: Some(first.to_string()),
            emails: email.map(|e| vec![e.to_string()]).unwrap_or_default(),
            category: Some(category.to_string()),
            ..Record::default()
        }
    }

    fn five_person_roster() -> Roster {
        Roster::from_records(vec![
            person("Ann", Some("a@x.com"), "Aktive Turnerin"),
            person("Ben", Some("a@x.com"), "Aktive Turner"),
            person("Cleo", Some("b@x.com"), "Mädchen"),
            person("Dan", None, "Passivmitglied"),
            person("Eva", Some("a@x.com"), "Kitu"),
        ])
    }

    #[test]
    fn grouping_by_resolved_email() {
        let index = HouseholdIndex::group(&five_person_roster()).unwrap();
        assert_eq!(index.len(), 3);
        let mut sizes: Vec<usize> = index.households().iter().map(Household::len).collect();
        sizes.sort();
        assert_eq!(sizes, vec![1, 1, 3]);
        // first-seen order of distinct keys
        assert_eq!(index.households()[0].email(), Some("a@x.com"));
        assert_eq!(index.households()[1].email(), Some("b@x.com"));
        assert_eq!(index.households()[2].email(), None);
    }

    #[test]
    fn single_no_email_household() {
        let index = HouseholdIndex::group(&five_person_roster()).unwrap();
        let no_email = index.no_email_household().unwrap().unwrap();
        assert_eq!(no_email.len(), 1);
        assert_eq!(no_email.members()[0].first_name.as_deref(), Some("Dan"));
    }

    #[test]
    fn push_rejects_foreign_email() {
        let index = HouseholdIndex::group(&five_person_roster()).unwrap();
        let mut household = index.households()[0].clone();
        let err = household.push(person("Zoe", Some("z@x.com"), "Kitu"));
        assert!(matches!(err, Err(CoreError::HouseholdKeyMismatch { .. })));
        let err = household.push(person("Zoe", None, "Kitu"));
        assert!(matches!(err, Err(CoreError::HouseholdKeyMismatch { .. })));
    }

    #[test]
    fn flatten_round_trips_the_roster() {
        let roster = five_person_roster();
        let index = HouseholdIndex::group(&roster).unwrap();
        let mut flattened: Vec<String> = index
            .flatten()
            .iter()
            .filter_map(|r| r.first_name.clone())
            .collect();
        let mut original: Vec<String> = roster
            .iter()
            .filter_map(|r| r.first_name.clone())
            .collect();
        flattened.sort();
        original.sort();
        assert_eq!(flattened, original);
        assert_eq!(index.flatten().len(), roster.len());
    }

    #[test]
    fn property_list_is_distinct_and_sorted() {
        let index = HouseholdIndex::group(&five_person_roster()).unwrap();
        let categories = index.households()[0].property_list(Field::Category);
        assert_eq!(
            categories,
            vec![
                Some(Value::text("Aktive Turner")),
                Some(Value::text("Aktive Turnerin")),
                Some(Value::text("Kitu")),
            ]
        );
    }

    #[test]
    fn absence_sorts_first_in_property_list() {
        let roster = Roster::from_records(vec![
            Record {
                emails: vec!["a@x.com".into()],
                category: Some("Kitu".into()),
                ..Record::default()
            },
            Record {
                emails: vec!["a@x.com".into()],
                ..Record::default()
            },
        ]);
        let index = HouseholdIndex::group(&roster).unwrap();
        let categories = index.households()[0].property_list(Field::Category);
        assert_eq!(categories, vec![None, Some(Value::text("Kitu"))]);
    }

    #[test]
    fn lookup_by_contained_value() {
        let index = HouseholdIndex::group(&five_person_roster()).unwrap();
        let with_kitu = index.lookup(Field::Category, Some(&Value::text("Kitu")));
        assert_eq!(with_kitu.len(), 1);
        assert_eq!(with_kitu[0].email(), Some("a@x.com"));
        // the no-email household is found through the absence marker
        let no_mail = index.lookup(Field::Email, None);
        assert_eq!(no_mail.len(), 1);
        assert_eq!(no_mail[0].email(), None);
    }
}
