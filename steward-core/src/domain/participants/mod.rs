// steward-core/src/domain/participants/mod.rs
//
// Per-participant row counts across the datasets of a curation cycle.

use std::fmt;
use std::str::FromStr;

use crate::domain::cdm::catalog::domain_table_id;
use crate::domain::cdm::{EXT_SUFFIX, MAPPING_PREFIX, PERSON};
use crate::domain::error::DomainError;
use crate::domain::sql::{
    Condition, Expr, IdentifierKind, Literal, Relation, SelectItem, SelectQuery, TableRef,
    ValueSet, validate_identifier,
};

pub const UNION_ALL: &str = "\nUNION ALL\n";
pub const UNIONED_EHR_PREFIX: &str = "unioned_ehr_";
const PERSON_ID: &str = "person_id";
const EHR_COUNT: &str = "ehr_count";

/// Where the participant ids come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PidSource {
    List(Vec<i64>),
    Table(TableRef),
}

impl PidSource {
    pub fn from_ids(ids: Vec<i64>) -> Result<Self, DomainError> {
        if ids.is_empty() {
            return Err(DomainError::InvalidValue(
                "pid list must contain at least one person_id".to_string(),
            ));
        }
        Ok(Self::List(ids))
    }

    /// `IN` operand for `person_id`.
    pub fn value_set(&self) -> ValueSet {
        match self {
            Self::List(ids) => ValueSet::Literals(ids.iter().map(|id| Literal::Int(*id)).collect()),
            Self::Table(table) => ValueSet::Subquery(Box::new(
                SelectQuery::from(Relation::Table(table.clone()), None)
                    .select(SelectItem::Expr(Expr::bare(PERSON_ID), None)),
            )),
        }
    }

    pub fn pid_sql_expr(&self) -> String {
        self.value_set().to_string()
    }
}

impl FromStr for PidSource {
    type Err = DomainError;

    /// Parses a `project.dataset.table` pid table reference.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [project, dataset, table] = parts.as_slice() else {
            return Err(DomainError::InvalidValue(format!(
                "pid table must be 'project.dataset.table', got '{}'",
                s
            )));
        };

        validate_identifier(IdentifierKind::Project, project)?;
        validate_identifier(IdentifierKind::Dataset, dataset)?;
        validate_identifier(IdentifierKind::Table, table)?;

        Ok(Self::Table(TableRef::new(project, dataset, table)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetType {
    UnionedEhr,
    Ehr,
    Combined,
    Deid,
    Other,
}

impl DatasetType {
    pub fn from_dataset_id(dataset_id: &str) -> Self {
        let id = dataset_id.to_lowercase();
        if id.starts_with("unioned_ehr") {
            Self::UnionedEhr
        } else if id.starts_with("combined") && id.contains("deid") {
            Self::Deid
        } else if id.starts_with("combined") {
            Self::Combined
        } else if id.starts_with("ehr") {
            Self::Ehr
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnionedEhr => "unioned_ehr",
            Self::Ehr => "ehr",
            Self::Combined => "combined",
            Self::Deid => "deid",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// CDM table a mapping (`_mapping_x`) or extension (`x_ext`) table belongs to.
pub fn cdm_table_for(table: &str) -> &str {
    let table = table.strip_prefix(MAPPING_PREFIX).unwrap_or(table);
    table.strip_suffix(EXT_SUFFIX).unwrap_or(table)
}

/// CDM table behind a site (`<hpo>_x`) or unioned (`unioned_ehr_x`) EHR table.
pub fn ehr_cdm_table<'a>(table: &'a str, hpo_id: &str) -> &'a str {
    table
        .strip_prefix(UNIONED_EHR_PREFIX)
        .or_else(|| table.strip_prefix(hpo_id).and_then(|t| t.strip_prefix('_')))
        .unwrap_or(table)
}

/// Companion table recording where the rows of a CDM table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// `_mapping_<table>` with `src_hpo_id` (combined datasets).
    Mapping,
    /// `<table>_ext` with `src_id` (deid datasets).
    Ext,
}

impl Provenance {
    pub fn table_for(&self, table: &str) -> String {
        match self {
            Self::Mapping => format!("{}{}", MAPPING_PREFIX, table),
            Self::Ext => format!("{}{}", table, EXT_SUFFIX),
        }
    }

    /// Companion rows that were submitted by an EHR site.
    fn ehr_rows(&self, alias: &str) -> Condition {
        match self {
            Self::Mapping => Condition::NotEq(Expr::col(alias, "src_hpo_id"), Expr::string("rdr")),
            Self::Ext => Condition::Like(Expr::col(alias, "src_id"), "EHR%".into()),
        }
    }
}

/// Tables to look up in a dataset of `dataset_type` before counting.
pub fn row_count_candidates(
    dataset_type: DatasetType,
    person_tables: &[String],
    hpo_id: Option<&str>,
) -> Result<Vec<String>, DomainError> {
    let with_companions = |provenance: Provenance| {
        person_tables
            .iter()
            .cloned()
            .chain(person_tables.iter().map(|t| provenance.table_for(t)))
            .collect::<Vec<_>>()
    };

    Ok(match dataset_type {
        DatasetType::Combined => with_companions(Provenance::Mapping),
        DatasetType::Deid => with_companions(Provenance::Ext),
        DatasetType::Ehr => {
            let hpo_id = require_hpo_id(hpo_id)?;
            person_tables
                .iter()
                .map(|t| format!("{}_{}", hpo_id, t))
                .chain(person_tables.iter().map(|t| format!("{}{}", UNIONED_EHR_PREFIX, t)))
                .collect()
        }
        DatasetType::UnionedEhr | DatasetType::Other => person_tables.to_vec(),
    })
}

/// Count query for the existing tables of a dataset, shaped by its type.
pub fn row_count_query(
    project: &str,
    dataset: &str,
    dataset_type: DatasetType,
    pid_source: &PidSource,
    existing: &[String],
    hpo_id: Option<&str>,
) -> Result<String, DomainError> {
    match dataset_type {
        DatasetType::Combined => {
            combined_deid_row_count_query(project, dataset, pid_source, Provenance::Mapping, existing)
        }
        DatasetType::Deid => {
            combined_deid_row_count_query(project, dataset, pid_source, Provenance::Ext, existing)
        }
        DatasetType::Ehr => {
            ehr_row_count_query(project, dataset, pid_source, require_hpo_id(hpo_id)?, existing)
        }
        DatasetType::UnionedEhr | DatasetType::Other => {
            dataset_row_count_query(project, dataset, pid_source, existing)
        }
    }
}

/// One `COUNT(*)` per table restricted to the pid source, glued with UNION ALL.
pub fn dataset_row_count_query(
    project: &str,
    dataset: &str,
    pid_source: &PidSource,
    tables: &[String],
) -> Result<String, DomainError> {
    if tables.is_empty() {
        return Err(no_tables(project, dataset));
    }

    let queries = tables
        .iter()
        .map(|table| count_query(project, dataset, table, pid_source).to_string())
        .collect::<Vec<_>>();

    Ok(queries.join(UNION_ALL))
}

/// EHR-submitted rows only. Tables with a provenance companion are joined to
/// it; `person` is never EHR-submitted and reports 0.
pub fn combined_deid_row_count_query(
    project: &str,
    dataset: &str,
    pid_source: &PidSource,
    provenance: Provenance,
    existing: &[String],
) -> Result<String, DomainError> {
    let cdm_tables: Vec<&String> = existing
        .iter()
        .filter(|t| cdm_table_for(t) == t.as_str())
        .collect();
    if cdm_tables.is_empty() {
        return Err(no_tables(project, dataset));
    }

    let queries = cdm_tables
        .into_iter()
        .map(|table| {
            let companion = provenance.table_for(table);
            let query = if existing.contains(&companion) {
                let id = domain_table_id(table);
                SelectQuery::from(Relation::Table(TableRef::new(project, dataset, table)), Some("t"))
                    .inner_join(
                        Relation::Table(TableRef::new(project, dataset, &companion)),
                        "m",
                        Condition::Eq(Expr::col("t", &id), Expr::col("m", &id)),
                    )
                    .select(table_label(table))
                    .select(SelectItem::Expr(Expr::CountStar, Some(EHR_COUNT.into())))
                    .filter(Condition::And(vec![
                        Condition::InSet(Expr::col("t", PERSON_ID), pid_source.value_set()),
                        provenance.ehr_rows("m"),
                    ]))
            } else if table == PERSON {
                SelectQuery::from(Relation::Table(TableRef::new(project, dataset, table)), None)
                    .select(table_label(table))
                    .select(SelectItem::Expr(
                        Expr::Literal(Literal::Int(0)),
                        Some(EHR_COUNT.into()),
                    ))
                    .limit(1)
            } else {
                count_query(project, dataset, table, pid_source)
            };
            query.to_string()
        })
        .collect::<Vec<_>>();

    Ok(queries.join(UNION_ALL))
}

/// Counts in the site (`<hpo>_x`) and unioned (`unioned_ehr_x`) tables of an
/// EHR dataset.
pub fn ehr_row_count_query(
    project: &str,
    dataset: &str,
    pid_source: &PidSource,
    hpo_id: &str,
    existing: &[String],
) -> Result<String, DomainError> {
    let site_prefix = format!("{}_", hpo_id);
    let tables: Vec<String> = existing
        .iter()
        .filter(|t| t.starts_with(&site_prefix) || t.starts_with(UNIONED_EHR_PREFIX))
        .cloned()
        .collect();

    dataset_row_count_query(project, dataset, pid_source, &tables)
}

fn count_query(project: &str, dataset: &str, table: &str, pid_source: &PidSource) -> SelectQuery {
    SelectQuery::from(Relation::Table(TableRef::new(project, dataset, table)), None)
        .select(table_label(table))
        .select(SelectItem::Expr(Expr::CountStar, Some(EHR_COUNT.into())))
        .filter(Condition::InSet(Expr::bare(PERSON_ID), pid_source.value_set()))
}

fn table_label(table: &str) -> SelectItem {
    SelectItem::Expr(Expr::string(table), Some("table_id".into()))
}

fn require_hpo_id(hpo_id: Option<&str>) -> Result<&str, DomainError> {
    let hpo_id = hpo_id.ok_or_else(|| {
        DomainError::InvalidValue("EHR datasets need an hpo id to count site tables".to_string())
    })?;
    validate_identifier(IdentifierKind::Table, hpo_id)?;
    Ok(hpo_id)
}

fn no_tables(project: &str, dataset: &str) -> DomainError {
    DomainError::InvalidValue(format!(
        "no person_id tables to count in {}.{}",
        project, dataset
    ))
}
