// steward-core/src/application/rules/concept_suppression.rs

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};

use super::CleaningRule;
use super::config::RuleConfiguration;
use crate::application::resolver::get_tables_in_dataset;
use crate::domain::cdm::CdmCatalog;
use crate::domain::query_spec::QuerySpec;
use crate::domain::sql::{SelectQuery, TableRef};
use crate::domain::suppression::{drop_if_empty_statement, suppression_query};
use crate::error::StewardError;
use crate::ports::engine::QueryEngine;

/// Where the denylisted concept ids come from.
#[async_trait]
pub trait SuppressionStrategy: Send + Sync {
    /// Runs after the affected tables have been resolved.
    async fn setup(
        &mut self,
        _config: &RuleConfiguration,
        _engine: &dyn QueryEngine,
    ) -> Result<(), StewardError> {
        Ok(())
    }

    /// Rows of `table` referencing a denylisted concept in any of
    /// `concept_fields`.
    fn sandbox_query(
        &self,
        config: &RuleConfiguration,
        table: &TableRef,
        concept_fields: &[&str],
    ) -> SelectQuery;
}

/// Sandboxes and removes every row whose concept columns hit the denylist.
pub struct ConceptSuppression<S: SuppressionStrategy> {
    config: RuleConfiguration,
    concept_fields: BTreeMap<String, Vec<String>>,
    strategy: S,
}

impl<S: SuppressionStrategy> ConceptSuppression<S> {
    pub fn new(config: RuleConfiguration, catalog: &CdmCatalog, strategy: S) -> Self {
        let concept_fields = config
            .affected_tables
            .iter()
            .map(|table| {
                let fields = catalog
                    .concept_id_fields(table)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (table.clone(), fields)
            })
            .collect();

        Self {
            config,
            concept_fields,
            strategy,
        }
    }

    pub fn config(&self) -> &RuleConfiguration {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    fn sandbox_ref(&self, table: &str) -> TableRef {
        self.config
            .target
            .sandbox_table(&self.config.sandbox_table_name(table))
    }

    fn sandbox_spec(&self, table: &str) -> QuerySpec {
        let fields: Vec<&str> = self
            .concept_fields
            .get(table)
            .map(|f| f.iter().map(String::as_str).collect())
            .unwrap_or_default();
        let query = self
            .strategy
            .sandbox_query(&self.config, &self.config.target.table(table), &fields);

        QuerySpec::overwrite(
            query.to_string(),
            &self.config.target.sandbox_dataset_id,
            &self.config.sandbox_table_name(table),
        )
    }

    fn rewrite_spec(&self, table: &str) -> QuerySpec {
        let query = suppression_query(&self.config.target.table(table), &self.sandbox_ref(table));
        QuerySpec::overwrite(query.to_string(), &self.config.target.dataset_id, table)
    }

    fn cleanup_spec(&self, table: &str) -> QuerySpec {
        QuerySpec::statement(drop_if_empty_statement(&self.sandbox_ref(table)).to_string())
    }
}

#[async_trait]
impl<S: SuppressionStrategy> CleaningRule for ConceptSuppression<S> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn issue_numbers(&self) -> &[String] {
        &self.config.issue_numbers
    }

    fn description(&self) -> &str {
        &self.config.description
    }

    fn affected_datasets(&self) -> &BTreeSet<String> {
        &self.config.affected_datasets
    }

    fn affected_tables(&self) -> &[String] {
        &self.config.affected_tables
    }

    /// Narrows the affected tables to those present in the dataset, then
    /// lets the strategy prepare its denylist.
    #[instrument(skip(self, engine), fields(rule = %self.config.name))]
    async fn setup_rule(&mut self, engine: &dyn QueryEngine) -> Result<(), StewardError> {
        let target = &self.config.target;
        let existing = get_tables_in_dataset(
            engine,
            &target.project_id,
            &target.dataset_id,
            &self.config.affected_tables,
        )
        .await?;

        if existing.len() != self.config.affected_tables.len() {
            info!(
                configured = self.config.affected_tables.len(),
                existing = existing.len(),
                "Some affected tables are missing from {}.{}",
                target.project_id,
                target.dataset_id
            );
        }
        self.config.affected_tables = existing;

        self.strategy.setup(&self.config, engine).await
    }

    /// All sandbox specs, then all rewrite specs, then all cleanup specs.
    fn get_query_specs(&self) -> Vec<QuerySpec> {
        let tables = &self.config.affected_tables;
        let mut specs = Vec::with_capacity(tables.len() * 3);

        specs.extend(tables.iter().map(|t| self.sandbox_spec(t)));
        specs.extend(tables.iter().map(|t| self.rewrite_spec(t)));
        specs.extend(tables.iter().map(|t| self.cleanup_spec(t)));

        specs
    }
}
