// steward-core/src/ports/mock.rs
//
// In-memory query engine used by unit tests. Records every request and
// replays canned responses in submission order.

#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::engine::{EngineError, QueryEngine, QueryJob, QueryRequest, QueryResult, Row};

#[derive(Clone, Default)]
pub struct MockEngine {
    pub submitted: Arc<Mutex<Vec<QueryRequest>>>,
    responses: Arc<Mutex<VecDeque<Result<QueryResult, EngineError>>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the outcome of the next submitted job.
    pub fn respond(self, response: Result<QueryResult, EngineError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn respond_rows(self, rows: Vec<Row>) -> Self {
        self.respond(Ok(QueryResult::from_rows(rows)))
    }

    pub fn queries(&self) -> Vec<String> {
        self.submitted
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.sql.clone())
            .collect()
    }
}

pub fn table_id_rows(names: &[&str]) -> Vec<Row> {
    names
        .iter()
        .map(|name| {
            let mut row = Row::new();
            row.insert("table_id".to_string(), serde_json::json!(name));
            row
        })
        .collect()
}

struct MockJob {
    job_id: String,
    outcome: Result<QueryResult, EngineError>,
}

#[async_trait]
impl QueryJob for MockJob {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    async fn result(&self) -> Result<QueryResult, EngineError> {
        self.outcome.clone()
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    async fn submit(&self, request: &QueryRequest) -> Result<Box<dyn QueryJob>, EngineError> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request.clone());
        let job_id = format!("mock_job_{}", submitted.len());

        let outcome = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::default()));

        Ok(Box::new(MockJob { job_id, outcome }))
    }

    fn engine_name(&self) -> &str {
        "mock"
    }
}
