// steward-core/src/application/clean_engine.rs

use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::application::engine::run_query;
use crate::application::rules::CleaningRule;
use crate::domain::query_spec::QuerySpec;
use crate::domain::sql::QueryLinter;
use crate::error::StewardError;
use crate::ports::engine::{DestinationTable, QueryEngine, QueryRequest};
use crate::ports::notifier::Notifier;

/// A query spec tagged with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuery {
    pub rule: String,
    pub spec: QuerySpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleReport {
    pub rule: String,
    pub issue_numbers: Vec<String>,
    pub job_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub rules: Vec<RuleReport>,
}

impl CleanReport {
    pub fn total_queries(&self) -> usize {
        self.rules.iter().map(|r| r.job_ids.len()).sum()
    }

    /// Short human-readable summary, suitable for a chat notification.
    pub fn summary(&self, project_id: &str, dataset_id: &str) -> String {
        let mut out = format!(
            "Cleaning of `{}.{}` finished: {} rule(s), {} queries executed",
            project_id,
            dataset_id,
            self.rules.len(),
            self.total_queries()
        );
        for rule in &self.rules {
            out.push_str(&format!(
                "\n• {} [{}]: {}",
                rule.rule,
                rule.issue_numbers.join(", "),
                rule.job_ids.len()
            ));
        }
        out
    }
}

/// Chat message reporting an aborted cleaning run.
pub fn failure_message(project_id: &str, dataset_id: &str, err: &StewardError) -> String {
    format!("Cleaning of `{}.{}` failed: {}", project_id, dataset_id, err)
}

pub fn to_request(spec: &QuerySpec, project_id: &str) -> QueryRequest {
    let request = QueryRequest::new(spec.query.clone());
    match &spec.destination {
        Some(d) => request.with_destination(DestinationTable {
            project: project_id.to_string(),
            dataset: d.dataset.clone(),
            table: d.table.clone(),
            disposition: d.disposition,
        }),
        None => request,
    }
}

/// Plans every rule without executing anything. With an engine, each rule
/// is set up first (table resolution, lookup tables); without one, the
/// plan covers every table that survived construction.
#[instrument(skip_all, fields(rules = rules.len(), dry_run = engine.is_none()))]
pub async fn get_query_list(
    rules: &mut [Box<dyn CleaningRule>],
    engine: Option<&dyn QueryEngine>,
) -> Result<Vec<PlannedQuery>, StewardError> {
    let mut planned = Vec::new();
    for rule in rules.iter_mut() {
        if let Some(engine) = engine {
            rule.setup_rule(engine).await?;
        }
        for spec in rule.get_query_specs() {
            // Scripts (IF ... END IF) are outside the parser's grammar.
            if spec.destination.is_some()
                && let Err(e) = QueryLinter::check(&spec.query)
            {
                warn!(rule = rule.name(), "Generated query does not lint: {}", e);
            }
            planned.push(PlannedQuery {
                rule: rule.name().to_string(),
                spec,
            });
        }
    }
    Ok(planned)
}

/// Sets up, plans and runs each rule in order. Specs run sequentially; the
/// first failure aborts the run.
#[instrument(skip(engine, rules), fields(rules = rules.len()))]
pub async fn clean_dataset(
    engine: &dyn QueryEngine,
    project_id: &str,
    rules: &mut [Box<dyn CleaningRule>],
) -> Result<CleanReport, StewardError> {
    let start = Instant::now();
    let mut report = CleanReport::default();

    for rule in rules.iter_mut() {
        info!(rule = rule.name(), issues = ?rule.issue_numbers(), "Applying rule");
        rule.setup_rule(engine).await?;

        let specs = rule.get_query_specs();
        let mut rule_report = RuleReport {
            rule: rule.name().to_string(),
            issue_numbers: rule.issue_numbers().to_vec(),
            job_ids: Vec::with_capacity(specs.len()),
        };

        for (index, spec) in specs.iter().enumerate() {
            let outcome = run_query(engine, &to_request(spec, project_id)).await?;
            info!(
                rule = rule.name(),
                step = index + 1,
                of = specs.len(),
                job_id = %outcome.job_id,
                destination = %spec.destination_label(),
                "Query done"
            );
            rule_report.job_ids.push(outcome.job_id);
        }
        report.rules.push(rule_report);
    }

    info!(
        queries = report.total_queries(),
        "Dataset cleaned in {:.2?}",
        start.elapsed()
    );
    Ok(report)
}

/// `clean_dataset`, then posts the summary or the failure to `notifier`.
/// A failed run returns its own error even when the failure post fails too.
#[instrument(skip(engine, notifier, rules), fields(rules = rules.len()))]
pub async fn clean_dataset_and_notify(
    engine: &dyn QueryEngine,
    notifier: &dyn Notifier,
    project_id: &str,
    dataset_id: &str,
    rules: &mut [Box<dyn CleaningRule>],
) -> Result<CleanReport, StewardError> {
    match clean_dataset(engine, project_id, rules).await {
        Ok(report) => {
            notifier
                .post_message(&report.summary(project_id, dataset_id))
                .await?;
            Ok(report)
        }
        Err(err) => {
            error!("Cleaning run failed: {}", err);
            if let Err(post_err) = notifier
                .post_message(&failure_message(project_id, dataset_id, &err))
                .await
            {
                warn!("Failure notification not delivered: {}", post_err);
            }
            Err(err)
        }
    }
}
