// steward-core/src/domain/batch/negative_ages.rs

use chrono::NaiveDate;
use serde_json::Value;

use super::group::{CoGroup, Record};
use crate::domain::error::DomainError;

/// Drops domain rows dated before the participant's birth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropNegativeAges {
    domain: String,
    date_field: &'static str,
}

impl DropNegativeAges {
    pub fn for_domain(domain: &str) -> Result<Self, DomainError> {
        let date_field = date_field_for(domain)
            .ok_or_else(|| DomainError::UnknownTable(domain.to_string()))?;
        Ok(Self {
            domain: domain.to_string(),
            date_field,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Rows of the group that survive. A group with no person is dropped
    /// entirely. Rows whose age cannot be computed are kept.
    pub fn apply(&self, group: CoGroup) -> Vec<Record> {
        let Some(person) = group.persons.first() else {
            return Vec::new();
        };
        let Some(birth) = birth_date(person) else {
            return group.rows;
        };

        group
            .rows
            .into_iter()
            .filter(|row| match parse_date(row.get(self.date_field)) {
                Some(event) => event >= birth,
                None => true,
            })
            .collect()
    }
}

fn date_field_for(domain: &str) -> Option<&'static str> {
    let field = match domain {
        "condition_occurrence" => "condition_start_date",
        "measurement" => "measurement_date",
        "observation" => "observation_date",
        "drug_exposure" => "drug_exposure_start_date",
        "procedure_occurrence" => "procedure_date",
        "visit_occurrence" => "visit_start_date",
        "device_exposure" => "device_exposure_start_date",
        "specimen" => "specimen_date",
        "death" => "death_date",
        "note" => "note_date",
        "observation_period" => "observation_period_start_date",
        _ => return None,
    };
    Some(field)
}

fn birth_date(person: &Record) -> Option<NaiveDate> {
    if let Some(date) = parse_date(person.get("birth_datetime")) {
        return Some(date);
    }

    let year = as_i64(person.get("year_of_birth")?)?;
    let month = person.get("month_of_birth").and_then(as_i64).unwrap_or(1);
    let day = person.get("day_of_birth").and_then(as_i64).unwrap_or(1);
    NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )
}

/// Accepts dates and timestamps; only the `YYYY-MM-DD` prefix matters.
fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    let text = value?.as_str()?;
    let prefix = text.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
