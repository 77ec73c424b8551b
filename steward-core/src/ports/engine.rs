// steward-core/src/ports/engine.rs

// What the rules need from a warehouse, without knowing which warehouse it is.
// A query is submitted, the returned job is awaited, and the job may still
// report embedded errors after completing.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::domain::query_spec::WriteDisposition;

/// One result row, keyed by column name.
pub type Row = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTable {
    pub project: String,
    pub dataset: String,
    pub table: String,
    pub disposition: WriteDisposition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub sql: String,
    pub destination: Option<DestinationTable>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            destination: None,
        }
    }

    pub fn with_destination(mut self, destination: DestinationTable) -> Self {
        self.destination = Some(destination);
        self
    }
}

/// Structured error entry attached to a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct JobErrorDetail {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for JobErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.reason, &self.location) {
            (Some(reason), Some(location)) => {
                write!(f, "[{}] {} (at {})", reason, self.message, location)
            }
            (Some(reason), None) => write!(f, "[{}] {}", reason, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EngineError {
    #[error("Transport failure talking to the query engine: {0}")]
    #[diagnostic(
        code(steward::engine::transport),
        help("The warehouse could not be reached. Retry the run once connectivity is restored.")
    )]
    Transport(String),

    #[error("Job '{job_id}' timed out: {detail}")]
    #[diagnostic(code(steward::engine::timeout))]
    Timeout { job_id: String, detail: String },

    #[error("Malformed response from the query engine: {0}")]
    #[diagnostic(code(steward::engine::malformed_response))]
    MalformedResponse(String),

    #[error("Job '{job_id}' reported errors: {}", format_details(.errors))]
    #[diagnostic(code(steward::engine::job_failed))]
    JobFailed {
        job_id: String,
        errors: Vec<JobErrorDetail>,
    },
}

fn format_details(errors: &[JobErrorDetail]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Output of a completed job. `errors` is checked after completion as an
/// additional failure signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub errors: Vec<JobErrorDetail>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            errors: Vec::new(),
        }
    }

    /// Rows of a clean job, or `JobFailed` when the job carried errors.
    pub fn into_rows(self, job_id: &str) -> Result<Vec<Row>, EngineError> {
        if self.errors.is_empty() {
            Ok(self.rows)
        } else {
            Err(EngineError::JobFailed {
                job_id: job_id.to_string(),
                errors: self.errors,
            })
        }
    }
}

#[async_trait]
pub trait QueryJob: Send + Sync {
    fn job_id(&self) -> &str;

    /// Blocks until the job finishes.
    async fn result(&self) -> Result<QueryResult, EngineError>;
}

#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn submit(&self, request: &QueryRequest) -> Result<Box<dyn QueryJob>, EngineError>;

    fn engine_name(&self) -> &str;
}
