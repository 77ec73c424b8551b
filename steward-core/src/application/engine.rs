// steward-core/src/application/engine.rs

use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::ports::engine::{EngineError, QueryEngine, QueryRequest, Row};

/// Rows of a finished job together with the job that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub job_id: String,
    pub rows: Vec<Row>,
}

/// Submits a query, waits for the job and turns embedded job errors into
/// `JobFailed`. Failures are logged with the job id and returned unchanged;
/// nothing is retried.
#[instrument(
    skip(engine, request),
    fields(engine = engine.engine_name(), query.len = request.sql.len())
)]
pub async fn run_query(
    engine: &dyn QueryEngine,
    request: &QueryRequest,
) -> Result<QueryOutcome, EngineError> {
    let start = Instant::now();
    debug!("Executing query: {}", request.sql);

    let job = match engine.submit(request).await {
        Ok(job) => job,
        Err(e) => {
            error!("Query submission failed: {}", e);
            return Err(e);
        }
    };
    let job_id = job.job_id().to_string();

    let result = job.result().await.and_then(|r| r.into_rows(&job_id));
    let duration = start.elapsed();

    match result {
        Ok(rows) => {
            debug!(job_id = %job_id, rows = rows.len(), "Query finished in {:.2?}", duration);
            Ok(QueryOutcome { job_id, rows })
        }
        Err(e) => {
            error!(job_id = %job_id, "Query failed after {:.2?}: {}", duration, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::engine::{JobErrorDetail, QueryResult};
    use crate::ports::mock::{MockEngine, table_id_rows};

    #[tokio::test]
    async fn test_run_query_returns_rows_and_job_id() {
        let engine = MockEngine::new().respond_rows(table_id_rows(&["person"]));

        let outcome = run_query(&engine, &QueryRequest::new("SELECT 1")).await.unwrap();
        assert_eq!(outcome.job_id, "mock_job_1");
        assert_eq!(outcome.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_embedded_errors_become_job_failed() {
        let engine = MockEngine::new().respond(Ok(QueryResult {
            rows: vec![],
            errors: vec![JobErrorDetail {
                reason: Some("notFound".into()),
                location: None,
                message: "Not found: Table p:d.x".into(),
            }],
        }));

        let err = run_query(&engine, &QueryRequest::new("SELECT 1")).await.unwrap_err();
        assert!(matches!(err, EngineError::JobFailed { ref job_id, .. } if job_id == "mock_job_1"));
    }

    #[tokio::test]
    async fn test_transport_errors_are_returned_unchanged() {
        let engine = MockEngine::new().respond(Err(EngineError::Transport("reset".into())));

        let err = run_query(&engine, &QueryRequest::new("SELECT 1")).await.unwrap_err();
        assert_eq!(err, EngineError::Transport("reset".into()));
        assert_eq!(engine.queries().len(), 1);
    }
}
