// steward-core/src/application/batch.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::domain::batch::{DropNegativeAges, Record, co_group_by_person};
use crate::domain::cdm::PERSON;
use crate::domain::error::DomainError;
use crate::error::StewardError;
use crate::infrastructure::fs::{discover_domain_files, read_ndjson, write_ndjson};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSummary {
    pub read: usize,
    pub written: usize,
}

/// Per-domain counts plus the files written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub domains: BTreeMap<String, DomainSummary>,
    pub outputs: Vec<PathBuf>,
}

/// Reads `<domain>.json` files from `input_dir`, drops rows dated before the
/// participant's birth and rows without a participant, and writes
/// `<domain>.txt` into `output_dir`. `person` passes through unchanged.
/// An empty `domains` list processes every file found.
#[instrument(skip(domains))]
pub fn run_batch_pipeline(
    input_dir: &Path,
    output_dir: &Path,
    domains: &[String],
) -> Result<BatchReport, StewardError> {
    let files = discover_domain_files(input_dir)?;
    let person_path = files.get(PERSON).ok_or_else(|| {
        DomainError::InvalidValue(format!("{} has no {}.json", input_dir.display(), PERSON))
    })?;
    let persons = read_ndjson(person_path)?;
    std::fs::create_dir_all(output_dir)?;

    let selected: Vec<&String> = if domains.is_empty() {
        files.keys().filter(|d| d.as_str() != PERSON).collect()
    } else {
        domains.iter().filter(|d| d.as_str() != PERSON).collect()
    };

    // Filters are resolved up front so an unknown domain fails before any output.
    let filters = selected
        .iter()
        .map(|domain| DropNegativeAges::for_domain(domain))
        .collect::<Result<Vec<_>, _>>()?;

    let mut report = BatchReport::default();
    let person_out = output_dir.join(format!("{}.txt", PERSON));
    write_ndjson(&person_out, &persons)?;
    report.domains.insert(
        PERSON.to_string(),
        DomainSummary {
            read: persons.len(),
            written: persons.len(),
        },
    );
    report.outputs.push(person_out);

    for filter in filters {
        let domain = filter.domain();
        let path = files.get(domain).ok_or_else(|| {
            DomainError::InvalidValue(format!("{} has no {}.json", input_dir.display(), domain))
        })?;
        let rows = read_ndjson(path)?;
        let read = rows.len();

        let (groups, unkeyed) = co_group_by_person(&persons, rows);
        if !unkeyed.is_empty() {
            warn!(domain, dropped = unkeyed.len(), "Rows without person_id dropped");
        }
        let kept: Vec<Record> = groups
            .into_values()
            .flat_map(|group| filter.apply(group))
            .collect();

        let out = output_dir.join(format!("{}.txt", domain));
        write_ndjson(&out, &kept)?;
        info!(domain, read, written = kept.len(), "Domain filtered");

        report.domains.insert(
            domain.to_string(),
            DomainSummary {
                read,
                written: kept.len(),
            },
        );
        report.outputs.push(out);
    }

    Ok(report)
}
