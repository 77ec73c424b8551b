// steward-core/src/infrastructure/adapters/bigquery.rs

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::infrastructure::config::BigQuerySettings;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::engine::{
    EngineError, JobErrorDetail, QueryEngine, QueryJob, QueryRequest, QueryResult, Row,
};

pub const ACCESS_TOKEN_VAR: &str = "BIGQUERY_ACCESS_TOKEN";

/// Query engine backed by the BigQuery v2 REST API.
pub struct BigQueryEngine {
    client: Client,
    project_id: String,
    token: String,
    settings: BigQuerySettings,
}

impl BigQueryEngine {
    pub fn new(
        project_id: &str,
        token: &str,
        settings: BigQuerySettings,
    ) -> Result<Self, InfrastructureError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            project_id: project_id.to_string(),
            token: token.to_string(),
            settings,
        })
    }

    /// Reads the OAuth access token from `BIGQUERY_ACCESS_TOKEN`.
    pub fn from_env(
        project_id: &str,
        settings: BigQuerySettings,
    ) -> Result<Self, InfrastructureError> {
        let token = std::env::var(ACCESS_TOKEN_VAR)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                InfrastructureError::ConfigError(format!("{} is not set", ACCESS_TOKEN_VAR))
            })?;
        Self::new(project_id, &token, settings)
    }

    fn jobs_url(&self) -> String {
        format!(
            "{}/projects/{}/jobs",
            self.settings.api_base_url.trim_end_matches('/'),
            self.project_id
        )
    }
}

#[async_trait]
impl QueryEngine for BigQueryEngine {
    #[instrument(skip(self, request), fields(sql.len = request.sql.len()))]
    async fn submit(&self, request: &QueryRequest) -> Result<Box<dyn QueryJob>, EngineError> {
        let body = job_configuration(request, self.settings.location.as_deref());

        let response = self
            .client
            .post(self.jobs_url())
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("<unsubmitted>", e))?;
        let job = read_json(response).await?;

        let job_id = job["jobReference"]["jobId"]
            .as_str()
            .ok_or_else(|| EngineError::MalformedResponse("missing jobReference.jobId".into()))?
            .to_string();
        let location = job["jobReference"]["location"]
            .as_str()
            .map(str::to_string)
            .or_else(|| self.settings.location.clone());
        debug!(job_id = %job_id, "BigQuery job submitted");

        Ok(Box::new(BigQueryJob {
            client: self.client.clone(),
            base_url: self.settings.api_base_url.trim_end_matches('/').to_string(),
            project_id: self.project_id.clone(),
            token: self.token.clone(),
            job_id,
            location,
            timeout: Duration::from_secs(self.settings.timeout_secs),
            poll_interval: Duration::from_millis(self.settings.poll_interval_ms),
            fetch_rows: request.destination.is_none(),
        }))
    }

    fn engine_name(&self) -> &str {
        "bigquery"
    }
}

pub struct BigQueryJob {
    client: Client,
    base_url: String,
    project_id: String,
    token: String,
    job_id: String,
    location: Option<String>,
    timeout: Duration,
    poll_interval: Duration,
    /// Jobs writing to a destination table return no rows: paging them would
    /// download the whole destination.
    fetch_rows: bool,
}

impl BigQueryJob {
    async fn get(&self, path: &str, page_token: Option<&str>) -> Result<Value, EngineError> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(location) = &self.location {
            query.push(("location", location.as_str()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .client
            .get(format!(
                "{}/projects/{}/{}/{}",
                self.base_url, self.project_id, path, self.job_id
            ))
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(&self.job_id, e))?;
        read_json(response).await
    }

    /// Polls `jobs.get` until the job is DONE. Returns the job's embedded errors.
    async fn wait_until_done(&self) -> Result<Vec<JobErrorDetail>, EngineError> {
        let started = Instant::now();
        loop {
            let job = self.get("jobs", None).await?;
            if job["status"]["state"].as_str() == Some("DONE") {
                return job_errors(&job);
            }
            if started.elapsed() >= self.timeout {
                return Err(EngineError::Timeout {
                    job_id: self.job_id.clone(),
                    detail: format!("not DONE after {:?}", self.timeout),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl QueryJob for BigQueryJob {
    fn job_id(&self) -> &str {
        &self.job_id
    }

    #[instrument(skip(self), fields(job_id = %self.job_id))]
    async fn result(&self) -> Result<QueryResult, EngineError> {
        let errors = self.wait_until_done().await?;
        if !errors.is_empty() {
            warn!(count = errors.len(), "BigQuery job finished with errors");
            return Ok(QueryResult {
                rows: Vec::new(),
                errors,
            });
        }
        if !self.fetch_rows {
            debug!("Destination job, result rows not fetched");
            return Ok(QueryResult::from_rows(Vec::new()));
        }

        let mut rows = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.get("queries", page_token.as_deref()).await?;
            rows.extend(decode_rows(&page)?);
            match page["pageToken"].as_str() {
                Some(token) => page_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(QueryResult::from_rows(rows))
    }
}

/// `jobs.insert` payload for a standard SQL query job.
pub fn job_configuration(request: &QueryRequest, location: Option<&str>) -> Value {
    let mut query = json!({
        "query": request.sql,
        "useLegacySql": false,
    });

    if let Some(destination) = &request.destination {
        query["destinationTable"] = json!({
            "projectId": destination.project,
            "datasetId": destination.dataset,
            "tableId": destination.table,
        });
        query["writeDisposition"] = json!(destination.disposition.as_str());
    }

    let mut body = json!({ "configuration": { "query": query } });
    if let Some(location) = location {
        body["jobReference"] = json!({ "location": location });
    }
    body
}

/// Zips `schema.fields[].name` with the `f[].v` cells of every row. A response
/// without `rows` (DDL, DML, empty result) decodes to no rows.
pub fn decode_rows(body: &Value) -> Result<Vec<Row>, EngineError> {
    let Some(raw_rows) = body["rows"].as_array() else {
        return Ok(Vec::new());
    };

    let names = body["schema"]["fields"]
        .as_array()
        .ok_or_else(|| EngineError::MalformedResponse("rows without schema".into()))?
        .iter()
        .map(|field| {
            field["name"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| EngineError::MalformedResponse("schema field without name".into()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    raw_rows
        .iter()
        .map(|raw| {
            let cells = raw["f"]
                .as_array()
                .ok_or_else(|| EngineError::MalformedResponse("row without cells".into()))?;
            if cells.len() != names.len() {
                return Err(EngineError::MalformedResponse(format!(
                    "row has {} cells, schema has {} fields",
                    cells.len(),
                    names.len()
                )));
            }
            Ok(names
                .iter()
                .cloned()
                .zip(cells.iter().map(|cell| cell["v"].clone()))
                .collect::<Row>())
        })
        .collect()
}

fn job_errors(job: &Value) -> Result<Vec<JobErrorDetail>, EngineError> {
    let mut errors: Vec<JobErrorDetail> = match job["status"].get("errors") {
        Some(raw) => serde_json::from_value(raw.clone())
            .map_err(|e| EngineError::MalformedResponse(e.to_string()))?,
        None => Vec::new(),
    };

    // errorResult is the fatal error; it is usually repeated in `errors`.
    if let Some(raw) = job["status"].get("errorResult") {
        let fatal: JobErrorDetail = serde_json::from_value(raw.clone())
            .map_err(|e| EngineError::MalformedResponse(e.to_string()))?;
        if !errors.contains(&fatal) {
            errors.insert(0, fatal);
        }
    }
    Ok(errors)
}

async fn read_json(response: reqwest::Response) -> Result<Value, EngineError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| EngineError::Transport(e.to_string()))?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or(body);
        return Err(EngineError::Transport(format!("HTTP {}: {}", status, message)));
    }

    serde_json::from_str(&body).map_err(|e| EngineError::MalformedResponse(e.to_string()))
}

fn transport_error(job_id: &str, err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        EngineError::Timeout {
            job_id: job_id.to_string(),
            detail: err.to_string(),
        }
    } else {
        EngineError::Transport(err.to_string())
    }
}
