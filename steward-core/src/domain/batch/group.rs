// steward-core/src/domain/batch/group.rs

use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub type Record = Map<String, Value>;

const PERSON_ID: &str = "person_id";

/// Rows of one domain and the matching person rows, for a single person_id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoGroup {
    pub persons: Vec<Record>,
    pub rows: Vec<Record>,
}

/// Normalized `person_id` (numbers and numeric strings collapse to the same key).
pub fn person_key(record: &Record) -> Option<String> {
    match record.get(PERSON_ID)? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Groups domain rows with person rows by `person_id`. Records without a
/// usable key are returned separately.
pub fn co_group_by_person(
    persons: &[Record],
    rows: Vec<Record>,
) -> (BTreeMap<String, CoGroup>, Vec<Record>) {
    let mut groups: BTreeMap<String, CoGroup> = BTreeMap::new();
    let mut unkeyed = Vec::new();

    for person in persons {
        if let Some(key) = person_key(person) {
            groups.entry(key).or_default().persons.push(person.clone());
        }
    }

    for row in rows {
        match person_key(&row) {
            Some(key) => groups.entry(key).or_default().rows.push(row),
            None => unkeyed.push(row),
        }
    }

    (groups, unkeyed)
}
