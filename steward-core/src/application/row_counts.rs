// steward-core/src/application/row_counts.rs

use tracing::{info, instrument};

use crate::application::engine::run_query;
use crate::application::resolver::get_tables_in_dataset;
use crate::domain::cdm::CdmCatalog;
use crate::domain::participants::{
    DatasetType, PidSource, cdm_table_for, ehr_cdm_table, row_count_candidates, row_count_query,
};
use crate::domain::sql::{IdentifierKind, validate_identifier};
use crate::error::StewardError;
use crate::ports::engine::{EngineError, QueryEngine, QueryRequest, Row};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowCount {
    pub dataset_id: String,
    pub dataset_type: DatasetType,
    pub table: String,
    /// CDM table `table` maps onto.
    pub cdm_table: String,
    pub count: i64,
}

/// Catalog tables carrying a `person_id`, in catalog order.
pub fn person_tables(catalog: &CdmCatalog) -> Vec<String> {
    catalog
        .table_names()
        .filter(|t| catalog.has_person_id(t))
        .map(str::to_string)
        .collect()
}

/// Rows held by the given participants in every person table of `dataset_id`.
/// The dataset id decides the query shape: combined and deid datasets count
/// EHR-submitted rows only, EHR datasets count the `hpo_id` site tables.
#[instrument(skip(engine, catalog, pid_source))]
pub async fn participant_row_counts(
    engine: &dyn QueryEngine,
    catalog: &CdmCatalog,
    project_id: &str,
    dataset_id: &str,
    pid_source: &PidSource,
    hpo_id: Option<&str>,
) -> Result<Vec<TableRowCount>, StewardError> {
    validate_identifier(IdentifierKind::Project, project_id)?;
    validate_identifier(IdentifierKind::Dataset, dataset_id)?;

    let dataset_type = DatasetType::from_dataset_id(dataset_id);
    let candidates = row_count_candidates(dataset_type, &person_tables(catalog), hpo_id)?;
    let tables = get_tables_in_dataset(engine, project_id, dataset_id, &candidates).await?;
    if tables.is_empty() {
        info!("No person tables found");
        return Ok(Vec::new());
    }

    let sql = row_count_query(project_id, dataset_id, dataset_type, pid_source, &tables, hpo_id)?;
    let outcome = run_query(engine, &QueryRequest::new(sql)).await?;

    outcome
        .rows
        .iter()
        .map(|row| {
            let table = text_cell(row, "table_id")?;
            Ok(TableRowCount {
                dataset_id: dataset_id.to_string(),
                dataset_type,
                cdm_table: match (dataset_type, hpo_id) {
                    (DatasetType::Ehr, Some(hpo_id)) => ehr_cdm_table(&table, hpo_id),
                    _ => cdm_table_for(&table),
                }
                .to_string(),
                table,
                count: int_cell(row, "ehr_count")?,
            })
        })
        .collect()
}

fn text_cell(row: &Row, column: &str) -> Result<String, StewardError> {
    row.get(column)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| missing(column))
}

// The REST API returns INT64 cells as strings.
fn int_cell(row: &Row, column: &str) -> Result<i64, StewardError> {
    let value = row.get(column).ok_or_else(|| missing(column))?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| missing(column))
}

fn missing(column: &str) -> StewardError {
    EngineError::MalformedResponse(format!("count row without a usable '{}'", column)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::{MockEngine, table_id_rows};
    use serde_json::json;

    fn catalog() -> CdmCatalog {
        CdmCatalog::new()
            .with_table("person", vec!["person_id", "gender_concept_id"])
            .with_table("observation", vec!["observation_id", "person_id"])
            .with_table("concept", vec!["concept_id", "concept_name"])
    }

    fn count_row(table: &str, count: &str) -> Row {
        let mut row = Row::new();
        row.insert("table_id".into(), json!(table));
        row.insert("ehr_count".into(), json!(count));
        row
    }

    #[tokio::test]
    async fn test_counts_existing_person_tables() {
        let engine = MockEngine::new()
            .respond_rows(table_id_rows(&["person"]))
            .respond_rows(vec![count_row("person", "2")]);
        let pids = PidSource::from_ids(vec![1, 2]).unwrap();

        let counts = participant_row_counts(&engine, &catalog(), "p", "unioned_ehr_1", &pids, None)
            .await
            .unwrap();

        assert_eq!(
            counts,
            vec![TableRowCount {
                dataset_id: "unioned_ehr_1".into(),
                dataset_type: DatasetType::UnionedEhr,
                table: "person".into(),
                cdm_table: "person".into(),
                count: 2,
            }]
        );
        let queries = engine.queries();
        assert!(queries[0].contains("WHERE table_id IN ('observation', 'person')"));
        assert!(queries[1].contains("WHERE person_id IN (1, 2)"));
    }

    #[tokio::test]
    async fn test_combined_dataset_counts_ehr_rows_only() {
        let engine = MockEngine::new()
            .respond_rows(table_id_rows(&["observation", "person", "_mapping_observation"]))
            .respond_rows(vec![count_row("observation", "5"), count_row("person", "0")]);
        let pids = PidSource::from_ids(vec![1]).unwrap();

        let counts = participant_row_counts(&engine, &catalog(), "p", "combined_1", &pids, None)
            .await
            .unwrap();

        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].dataset_type, DatasetType::Combined);
        let queries = engine.queries();
        assert!(queries[0].contains("'_mapping_observation'"));
        assert!(queries[1].contains("JOIN `p.combined_1._mapping_observation` AS m"));
        assert!(queries[1].contains("0 AS ehr_count"));
    }

    #[tokio::test]
    async fn test_ehr_dataset_counts_site_tables() {
        let engine = MockEngine::new()
            .respond_rows(table_id_rows(&["nyc_person", "unioned_ehr_observation"]))
            .respond_rows(vec![
                count_row("nyc_person", "1"),
                count_row("unioned_ehr_observation", "3"),
            ]);
        let pids = PidSource::from_ids(vec![1]).unwrap();

        let counts = participant_row_counts(&engine, &catalog(), "p", "ehr_1", &pids, Some("nyc"))
            .await
            .unwrap();

        let cdm: Vec<&str> = counts.iter().map(|c| c.cdm_table.as_str()).collect();
        assert_eq!(cdm, vec!["person", "observation"]);
        assert!(engine.queries()[1].contains("FROM `p.ehr_1.nyc_person`"));
    }

    #[tokio::test]
    async fn test_ehr_dataset_without_hpo_id_fails_before_querying() {
        let engine = MockEngine::new();
        let pids = PidSource::from_ids(vec![1]).unwrap();

        let err = participant_row_counts(&engine, &catalog(), "p", "ehr_1", &pids, None).await;
        assert!(err.is_err());
        assert!(engine.queries().is_empty());
    }

    #[tokio::test]
    async fn test_no_tables_no_count_query() {
        let engine = MockEngine::new().respond_rows(vec![]);
        let pids = PidSource::from_ids(vec![1]).unwrap();

        let counts = participant_row_counts(&engine, &catalog(), "p", "other_1", &pids, None)
            .await
            .unwrap();
        assert!(counts.is_empty());
        assert_eq!(engine.queries().len(), 1);
    }

    #[test]
    fn test_person_tables() {
        assert_eq!(person_tables(&catalog()), vec!["observation", "person"]);
    }
}
