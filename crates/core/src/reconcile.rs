//! Cross-snapshot merge passes: backfill attributes that disappeared
//! between two registry exports, then suppress values from a removal list.

use tracing::{debug, info};

use crate::error::CoreError;
use crate::field::{Field, Value};
use crate::record::Record;
use crate::roster::Roster;

/// Fields compared by a backfill match. The derived `Email` view is left
/// out (the candidate list itself is compared), as are the backfilled
/// field and the exclusion set. Excluding `email` implies `emails` and
/// vice versa, since either spelling appears in config files.
fn match_fields(target: Field, exclusions: &[Field]) -> Vec<Field> {
    let emails_excluded = |f: Field| f == Field::Email || f == Field::Emails;
    let skip_emails =
        emails_excluded(target) || exclusions.iter().copied().any(emails_excluded);
    Field::ALL
        .iter()
        .copied()
        .filter(|&f| f != Field::Email)
        .filter(|&f| f != target && !exclusions.contains(&f))
        .filter(|&f| !(skip_emails && f == Field::Emails))
        .collect()
}

/// True when every non-absent attribute of the reference equals the
/// target's (reference-side absence is "don't care").
fn matches_reference(target: &Record, reference: &Record, fields: &[Field]) -> bool {
    fields.iter().all(|&field| match reference.get(field) {
        None => true,
        Some(want) => target.get(field) == Some(want),
    })
}

/// Copy the attribute from reference records into targets that are missing
/// it and agree with the reference on everything else. Strict exact-match
/// join: partial matches never trigger, and a target filled earlier in the
/// pass is no longer eligible (its attribute is no longer absent).
///
/// Two distinct people who share every compared attribute are
/// indistinguishable here and will be merged; the pass recovers contact
/// data for otherwise-identical individuals and accepts that
/// approximation.
pub fn backfill(
    roster: &mut Roster,
    field: Field,
    reference: &Roster,
    exclusions: &[Field],
) -> Result<usize, CoreError> {
    let fields = match_fields(field, exclusions);
    let mut filled = 0;
    for reference_record in reference.iter() {
        let Some(value) = reference_record.get(field) else {
            continue;
        };
        for target in roster.records_mut() {
            if target.get(field).is_some() {
                continue;
            }
            if !matches_reference(target, reference_record, &fields) {
                continue;
            }
            target.set(field, Some(value.clone()))?;
            filled += 1;
            debug!(member = %target.display_name(), field = %field, "backfilled from reference snapshot");
        }
    }
    Ok(filled)
}

/// Clear the attribute from every target whose value matches one carried
/// by the removal roster. Runs after backfill in the documented pipeline
/// order, so freshly recovered values are still suppressed. Reference-side
/// absent values are skipped.
pub fn suppress(roster: &mut Roster, field: Field, removal: &Roster) -> usize {
    let mut suppressed = 0;
    for removal_record in removal.iter() {
        // A list-valued removal column suppresses each element separately.
        let values: Vec<Value> = match removal_record.get(field) {
            None => continue,
            Some(Value::List(list)) => list.into_iter().map(Value::Text).collect(),
            Some(value) => vec![value],
        };
        for value in values {
            let cleared = roster.clear_where_equal(field, &value);
            if cleared > 0 {
                info!(field = %field, value = ?value, records = cleared, "suppressed value from removal list");
            }
            suppressed += cleared;
        }
    }
    suppressed
}

/// Indices of records currently missing the attribute. Taken before a
/// backfill pass to detect contacts the registry lost between snapshots.
pub fn missing_indices(roster: &Roster, field: Field) -> Vec<usize> {
    roster
        .iter()
        .enumerate()
        .filter(|(_, r)| r.get(field).is_none())
        .map(|(i, _)| i)
        .collect()
}

/// Records at `indices` that now carry the attribute: these recovered a
/// value from the backup that the current export had lost.
pub fn recovered<'a>(roster: &'a Roster, field: Field, indices: &[usize]) -> Vec<&'a Record> {
    indices
        .iter()
        .filter_map(|&i| roster.records().get(i))
        .filter(|r| r.get(field).is_some())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(first: &str, last: &str, email: Option<&str>, category: &str) -> Record {
        Record {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            emails: email.map(|e| vec![e.to_string()]).unwrap_or_default(),
            category: Some(category.to_string()),
            ..Record::default()
        }
    }

    #[test]
    fn backfill_fills_when_everything_else_matches() {
        let mut roster =
            Roster::from_records(vec![person("Ann", "Lee", None, "Aktive Turnerin")]);
        let reference = Roster::from_records(vec![person(
            "Ann",
            "Lee",
            Some("ann@x.com"),
            "Aktive Turnerin",
        )]);
        let filled = backfill(&mut roster, Field::Email, &reference, &[]).unwrap();
        assert_eq!(filled, 1);
        assert_eq!(roster.records()[0].email(), Some("ann@x.com"));
    }

    #[test]
    fn backfill_skips_on_any_mismatch() {
        let mut roster =
            Roster::from_records(vec![person("Ann", "Lee", None, "Aktive Turnerin")]);
        let reference = Roster::from_records(vec![person(
            "Ann",
            "Lee",
            Some("ann@x.com"),
            "Passivmitglied",
        )]);
        let filled = backfill(&mut roster, Field::Email, &reference, &[]).unwrap();
        assert_eq!(filled, 0);
        assert_eq!(roster.records()[0].email(), None);
    }

    #[test]
    fn backfill_ignores_mismatches_on_excluded_fields() {
        let mut roster =
            Roster::from_records(vec![person("Ann", "Lee", None, "Aktive Turnerin")]);
        let reference = Roster::from_records(vec![person(
            "Ann",
            "Lee",
            Some("ann@x.com"),
            "Passivmitglied",
        )]);
        let filled =
            backfill(&mut roster, Field::Email, &reference, &[Field::Category]).unwrap();
        assert_eq!(filled, 1);
        assert_eq!(roster.records()[0].email(), Some("ann@x.com"));
    }

    #[test]
    fn backfill_treats_reference_absence_as_dont_care() {
        let mut roster =
            Roster::from_records(vec![person("Ann", "Lee", None, "Aktive Turnerin")]);
        let mut reference_record = person("Ann", "Lee", Some("ann@x.com"), "x");
        reference_record.category = None;
        let reference = Roster::from_records(vec![reference_record]);
        let filled = backfill(&mut roster, Field::Email, &reference, &[]).unwrap();
        assert_eq!(filled, 1);
    }

    #[test]
    fn backfill_is_idempotent() {
        let mut roster =
            Roster::from_records(vec![person("Ann", "Lee", None, "Aktive Turnerin")]);
        let reference = Roster::from_records(vec![person(
            "Ann",
            "Lee",
            Some("ann@x.com"),
            "Aktive Turnerin",
        )]);
        assert_eq!(backfill(&mut roster, Field::Email, &reference, &[]).unwrap(), 1);
        // second pass finds nothing absent
        assert_eq!(backfill(&mut roster, Field::Email, &reference, &[]).unwrap(), 0);
        assert_eq!(roster.records()[0].email(), Some("ann@x.com"));
    }

    #[test]
    fn filled_target_is_ineligible_for_later_references() {
        let mut roster =
            Roster::from_records(vec![person("Ann", "Lee", None, "Aktive Turnerin")]);
        let reference = Roster::from_records(vec![
            person("Ann", "Lee", Some("first@x.com"), "Aktive Turnerin"),
            person("Ann", "Lee", Some("second@x.com"), "Aktive Turnerin"),
        ]);
        let filled = backfill(&mut roster, Field::Email, &reference, &[]).unwrap();
        assert_eq!(filled, 1);
        assert_eq!(roster.records()[0].email(), Some("first@x.com"));
    }

    #[test]
    fn backfill_merges_indistinguishable_people() {
        // Known accepted approximation: two real people sharing every
        // compared attribute both receive the reference's email.
        let mut roster = Roster::from_records(vec![
            person("Ann", "Lee", None, "Aktive Turnerin"),
            person("Ann", "Lee", None, "Aktive Turnerin"),
        ]);
        let reference = Roster::from_records(vec![person(
            "Ann",
            "Lee",
            Some("ann@x.com"),
            "Aktive Turnerin",
        )]);
        let filled = backfill(&mut roster, Field::Email, &reference, &[]).unwrap();
        assert_eq!(filled, 2);
    }

    #[test]
    fn suppress_clears_matching_values() {
        let mut roster = Roster::from_records(vec![
            person("Ann", "Lee", Some("ann@x.com"), "Aktive Turnerin"),
            person("Ben", "Lee", Some("ann@x.com"), "Aktive Turner"),
            person("Cleo", "Ray", Some("cleo@x.com"), "Mädchen"),
        ]);
        let removal = Roster::from_records(vec![Record {
            emails: vec!["ann@x.com".into()],
            ..Record::default()
        }]);
        let suppressed = suppress(&mut roster, Field::Email, &removal);
        assert_eq!(suppressed, 2);
        assert_eq!(roster.records()[0].email(), None);
        assert_eq!(roster.records()[1].email(), None);
        assert_eq!(roster.records()[2].email(), Some("cleo@x.com"));
    }

    #[test]
    fn suppress_on_the_candidate_list_removes_elements() {
        let mut roster = Roster::from_records(vec![Record {
            emails: vec!["ann@x.com".into(), "ann@backup.org".into()],
            ..Record::default()
        }]);
        let removal = Roster::from_records(vec![Record {
            emails: vec!["ann@backup.org".into()],
            ..Record::default()
        }]);
        let suppressed = suppress(&mut roster, Field::Emails, &removal);
        assert_eq!(suppressed, 1);
        assert_eq!(roster.records()[0].emails, vec!["ann@x.com".to_string()]);
    }

    #[test]
    fn suppress_after_backfill_clears_recovered_values() {
        let mut roster =
            Roster::from_records(vec![person("Ann", "Lee", None, "Aktive Turnerin")]);
        let reference = Roster::from_records(vec![person(
            "Ann",
            "Lee",
            Some("ann@x.com"),
            "Aktive Turnerin",
        )]);
        backfill(&mut roster, Field::Email, &reference, &[]).unwrap();
        let removal = Roster::from_records(vec![Record {
            emails: vec!["ann@x.com".into()],
            ..Record::default()
        }]);
        let suppressed = suppress(&mut roster, Field::Email, &removal);
        assert_eq!(suppressed, 1);
        assert_eq!(roster.records()[0].email(), None);
    }

    #[test]
    fn recovered_reports_targets_that_gained_the_attribute() {
        let mut roster = Roster::from_records(vec![
            person("Ann", "Lee", None, "Aktive Turnerin"),
            person("Ben", "Ray", None, "Aktive Turner"),
        ]);
        let missing = missing_indices(&roster, Field::Email);
        assert_eq!(missing, vec![0, 1]);
        let reference = Roster::from_records(vec![person(
            "Ann",
            "Lee",
            Some("ann@x.com"),
            "Aktive Turnerin",
        )]);
        backfill(&mut roster, Field::Email, &reference, &[]).unwrap();
        let lost = recovered(&roster, Field::Email, &missing);
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].first_name.as_deref(), Some("Ann"));
    }

    #[test]
    fn excluding_email_implies_the_candidate_list() {
        // target and reference differ in their candidate lists; with
        // email excluded the category backfill must still fire
        let mut target = person("Ann", "Lee", Some("old@x.com"), "x");
        target.category = None;
        let mut roster = Roster::from_records(vec![target]);
        let reference = person("Ann", "Lee", Some("new@x.com"), "Aktive Turnerin");
        let filled = backfill(
            &mut roster,
            Field::Category,
            &Roster::from_records(vec![reference]),
            &[Field::Email],
        )
        .unwrap();
        assert_eq!(filled, 1);
        assert_eq!(roster.records()[0].category.as_deref(), Some("Aktive Turnerin"));
    }
}
