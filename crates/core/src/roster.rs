use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::warn;

use crate::config::{FieldMap, GroupMap};
use crate::error::CoreError;
use crate::field::{Cmp, Field, Value};
use crate::record::{Gender, Record};
use crate::table::{Cell, Table};

/// Ordered collection of records. Insertion order is preserved for stable
/// iteration during export; it carries no other meaning.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    records: Vec<Record>,
}

impl Roster {
    pub fn new() -> Roster {
        Roster::default()
    }

    pub fn from_records(records: Vec<Record>) -> Roster {
        Roster { records }
    }

    /// Map a tabular snapshot to records, one per row. Fully empty rows
    /// were already dropped by the table; a mapped column missing from the
    /// header row fails the whole load.
    pub fn from_table(table: &Table, map: &FieldMap) -> Result<Roster, CoreError> {
        let col = |name: &Option<String>| -> Result<Option<usize>, CoreError> {
            name.as_ref().map(|n| table.column_index(n)).transpose()
        };

        let member_number = col(&map.member_number)?;
        let first_name = col(&map.first_name)?;
        let last_name = col(&map.last_name)?;
        let street = col(&map.street)?;
        let plz = col(&map.plz)?;
        let city = col(&map.city)?;
        let gender = col(&map.gender)?;
        let birthday = col(&map.birthday)?;
        let category = col(&map.category)?;
        let date_added = col(&map.date_added)?;
        let phone_private = col(&map.phone_private)?;
        let phone_mobile = col(&map.phone_mobile)?;
        let email_cols = map
            .emails
            .iter()
            .map(|n| table.column_index(n))
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(table.len());
        for (row_idx, row) in table.rows.iter().enumerate() {
            let cell = |idx: Option<usize>| -> Option<Cell> {
                idx.and_then(|i| row.get(i)).and_then(|c| c.clone())
            };
            let text = |idx: Option<usize>| -> Option<String> {
                cell(idx)
                    .map(|c| c.as_text())
                    .filter(|s| !s.is_empty())
            };

            let mut record = Record {
                member_number: parse_member_number(cell(member_number).as_ref(), row_idx, map)?,
                first_name: text(first_name),
                last_name: text(last_name),
                street: text(street),
                plz: text(plz),
                city: text(city),
                gender: text(gender).as_deref().and_then(Gender::parse),
                birthday: parse_date(cell(birthday).as_ref(), &map.date_format, row_idx, &map.birthday)?,
                category: text(category),
                date_added: parse_date(cell(date_added).as_ref(), &map.date_format, row_idx, &map.date_added)?,
                phone_private: text(phone_private),
                phone_mobile: text(phone_mobile),
                ..Record::default()
            };
            for &ci in &email_cols {
                if let Some(email) = row.get(ci).and_then(Option::as_ref).map(Cell::as_text) {
                    let email = email.trim().to_string();
                    if !email.is_empty() {
                        record.emails.push(email);
                    }
                }
            }
            records.push(record);
        }
        Ok(Roster { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Linear scan for records whose attribute compares true against the
    /// search value. Records missing the attribute are excluded unless the
    /// search value is itself absence.
    pub fn lookup(&self, field: Field, value: Option<&Value>, cmp: Cmp) -> Vec<&Record> {
        self.records
            .iter()
            .filter(|record| match (record.get(field), value) {
                (Some(have), Some(want)) => cmp.compare(&have, want),
                (None, None) => cmp == Cmp::Eq,
                (Some(_), None) => cmp == Cmp::Ne,
                (None, Some(_)) => false,
            })
            .collect()
    }

    /// Append records; union the given tags into each added record's tag
    /// set (existing tags are kept).
    pub fn add(&mut self, records: Vec<Record>, tags: Option<&BTreeSet<String>>) {
        for mut record in records {
            if let Some(tags) = tags {
                record.tags.extend(tags.iter().cloned());
            }
            self.records.push(record);
        }
    }

    /// Union one tag into every current record's tag set.
    pub fn annotate_all(&mut self, tag: &str) {
        for record in &mut self.records {
            record.tags.insert(tag.to_string());
        }
    }

    /// Clear the attribute to absence on every record where it equals the
    /// value. On list-valued fields only matching elements are removed,
    /// not the container. Returns the number of records changed.
    pub fn clear_where_equal(&mut self, field: Field, value: &Value) -> usize {
        let mut cleared = 0;
        if field.is_list() {
            let Some(needle) = value.as_text() else {
                return 0;
            };
            for record in &mut self.records {
                if record.remove_list_value(field, needle) {
                    cleared += 1;
                }
            }
        } else {
            for record in &mut self.records {
                if record.get(field).as_ref() == Some(value) {
                    record.clear(field);
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Join a group-roster export onto members by member number. Rows that
    /// reference nobody in this roster are logged and skipped; duplicate
    /// group names per record are not added twice. Returns the number of
    /// memberships applied.
    pub fn apply_groups(&mut self, table: &Table, map: &GroupMap) -> Result<usize, CoreError> {
        let number_idx = table.column_index(&map.member_number)?;
        let group_idx = table.column_index(&map.group)?;
        let role_idx = table.column_index(&map.role)?;

        let mut applied = 0;
        for (row_idx, row) in table.rows.iter().enumerate() {
            let number = match parse_group_number(row.get(number_idx).and_then(Option::as_ref)) {
                Some(n) => n,
                None => {
                    warn!(row = row_idx, "group row without member number, skipped");
                    continue;
                }
            };
            let Some(group) = row
                .get(group_idx)
                .and_then(Option::as_ref)
                .map(Cell::as_text)
                .filter(|g| !g.is_empty())
            else {
                warn!(row = row_idx, "group row without group name, skipped");
                continue;
            };
            let role = row
                .get(role_idx)
                .and_then(Option::as_ref)
                .map(Cell::as_text)
                .unwrap_or_default();

            let Some(record) = self
                .records
                .iter_mut()
                .find(|r| r.member_number == Some(number))
            else {
                warn!(member_number = number, group = %group, "group row references unknown member, skipped");
                continue;
            };

            let list = if role == map.coach_label {
                &mut record.groups_coach
            } else if role == map.member_label {
                &mut record.groups_member
            } else {
                warn!(row = row_idx, role = %role, "unknown group role, skipped");
                continue;
            };
            if !list.contains(&group) {
                list.push(group);
                applied += 1;
            }
        }
        Ok(applied)
    }
}

fn parse_member_number(
    cell: Option<&Cell>,
    row: usize,
    map: &FieldMap,
) -> Result<Option<u32>, CoreError> {
    let column = || map.member_number.clone().unwrap_or_default();
    match cell {
        None => Ok(None),
        Some(Cell::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => Ok(Some(*n as u32)),
        Some(Cell::Text(s)) => s.trim().parse().map(Some).map_err(|_| CoreError::NumberParse {
            row,
            column: column(),
            value: s.clone(),
        }),
        Some(other) => Err(CoreError::NumberParse {
            row,
            column: column(),
            value: other.as_text(),
        }),
    }
}

fn parse_group_number(cell: Option<&Cell>) -> Option<u32> {
    match cell {
        Some(Cell::Number(n)) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u32),
        Some(Cell::Text(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_date(
    cell: Option<&Cell>,
    format: &str,
    row: usize,
    column: &Option<String>,
) -> Result<Option<NaiveDate>, CoreError> {
    match cell {
        None => Ok(None),
        Some(Cell::Date(d)) => Ok(Some(*d)),
        Some(Cell::Text(s)) => NaiveDate::parse_from_str(s, format)
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .map(Some)
            .map_err(|_| CoreError::DateParse {
                row,
                column: column.clone().unwrap_or_default(),
                value: s.clone(),
            }),
        Some(other) => Err(CoreError::DateParse {
            row,
            column: column.clone().unwrap_or_default(),
            value: other.as_text(),
        }),
    }
}
