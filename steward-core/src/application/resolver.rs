// steward-core/src/application/resolver.rs

use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::application::engine::run_query;
use crate::domain::suppression::tables_in_dataset_query;
use crate::ports::engine::{EngineError, QueryEngine, QueryRequest};

/// Subset of `candidates` that exists in `project.dataset`, in candidate
/// order and without duplicates. One `__TABLES__` query, no retry; an empty
/// candidate list never reaches the engine.
#[instrument(skip(engine, candidates), fields(candidates = candidates.len()))]
pub async fn get_tables_in_dataset(
    engine: &dyn QueryEngine,
    project_id: &str,
    dataset_id: &str,
    candidates: &[String],
) -> Result<Vec<String>, EngineError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let query = tables_in_dataset_query(project_id, dataset_id, candidates);
    let outcome = run_query(engine, &QueryRequest::new(query.to_string())).await?;

    let found: HashSet<&str> = outcome
        .rows
        .iter()
        .filter_map(|row| row.get("table_id").and_then(|v| v.as_str()))
        .collect();

    let mut seen = HashSet::new();
    let existing: Vec<String> = candidates
        .iter()
        .filter(|t| found.contains(t.as_str()) && seen.insert(t.as_str()))
        .cloned()
        .collect();

    debug!(existing = ?existing, "Resolved tables in {}.{}", project_id, dataset_id);
    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mock::{MockEngine, table_id_rows};

    fn names(tables: &[&str]) -> Vec<String> {
        tables.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_returns_existing_subset_in_candidate_order() {
        let engine = MockEngine::new().respond_rows(table_id_rows(&["observation", "person"]));

        let existing = get_tables_in_dataset(
            &engine,
            "p",
            "d",
            &names(&["person", "measurement", "observation", "person"]),
        )
        .await
        .unwrap();

        assert_eq!(existing, names(&["person", "observation"]));
        assert_eq!(
            engine.queries(),
            vec![
                "SELECT\n  table_id\nFROM `p.d.__TABLES__`\nWHERE table_id IN ('person', 'measurement', 'observation', 'person')"
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_rows_are_ignored() {
        let engine = MockEngine::new().respond_rows(table_id_rows(&["note", "death"]));

        let existing = get_tables_in_dataset(&engine, "p", "d", &names(&["death"]))
            .await
            .unwrap();
        assert_eq!(existing, names(&["death"]));
    }

    #[tokio::test]
    async fn test_empty_candidates_skip_the_engine() {
        let engine = MockEngine::new();
        let existing = get_tables_in_dataset(&engine, "p", "d", &[]).await.unwrap();

        assert!(existing.is_empty());
        assert!(engine.queries().is_empty());
    }

    #[tokio::test]
    async fn test_engine_errors_propagate() {
        let engine = MockEngine::new().respond(Err(EngineError::Timeout {
            job_id: "mock_job_1".into(),
            detail: "deadline".into(),
        }));

        let err = get_tables_in_dataset(&engine, "p", "d", &names(&["person"]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
    }
}
