// steward-core/src/application/rules/config.rs

use std::collections::BTreeSet;
use tracing::debug;

use crate::domain::cdm::CdmCatalog;
use crate::domain::error::DomainError;
use crate::domain::sql::{IdentifierKind, TableRef, validate_identifier};
use crate::domain::suppression::sandbox_table_for;

/// Project and datasets a rule reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetTarget {
    pub project_id: String,
    pub dataset_id: String,
    pub sandbox_dataset_id: String,
}

impl DatasetTarget {
    pub fn new(
        project_id: &str,
        dataset_id: &str,
        sandbox_dataset_id: &str,
    ) -> Result<Self, DomainError> {
        validate_identifier(IdentifierKind::Project, project_id)?;
        validate_identifier(IdentifierKind::Dataset, dataset_id)?;
        validate_identifier(IdentifierKind::Dataset, sandbox_dataset_id)?;

        Ok(Self {
            project_id: project_id.to_string(),
            dataset_id: dataset_id.to_string(),
            sandbox_dataset_id: sandbox_dataset_id.to_string(),
        })
    }

    pub fn table(&self, table: &str) -> TableRef {
        TableRef::new(&self.project_id, &self.dataset_id, table)
    }

    pub fn sandbox_table(&self, table: &str) -> TableRef {
        TableRef::new(&self.project_id, &self.sandbox_dataset_id, table)
    }
}

/// Everything a concept suppression rule is configured with. The affected
/// tables only ever contain tables that have concept columns and a row
/// identifier, deduplicated in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfiguration {
    pub name: String,
    pub target: DatasetTarget,
    pub issue_numbers: Vec<String>,
    pub description: String,
    pub affected_datasets: BTreeSet<String>,
    pub affected_tables: Vec<String>,
}

impl RuleConfiguration {
    pub fn new(
        name: &str,
        target: DatasetTarget,
        issue_numbers: Vec<String>,
        affected_tables: Vec<String>,
        catalog: &CdmCatalog,
    ) -> Result<Self, DomainError> {
        if issue_numbers.iter().all(|i| i.trim().is_empty()) {
            return Err(DomainError::RuleConfig {
                rule: name.to_string(),
                reason: "at least one issue number is required".to_string(),
            });
        }

        let mut kept: Vec<String> = Vec::with_capacity(affected_tables.len());
        for table in affected_tables {
            validate_identifier(IdentifierKind::Table, &table)?;
            if kept.contains(&table) {
                continue;
            }
            if catalog.concept_id_fields(&table).is_empty() || !catalog.has_domain_table_id(&table)
            {
                debug!(rule = name, table = %table, "Table cannot be suppressed, dropped");
                continue;
            }
            kept.push(table);
        }

        Ok(Self {
            name: name.to_string(),
            target,
            issue_numbers,
            description: String::new(),
            affected_datasets: BTreeSet::new(),
            affected_tables: kept,
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_affected_datasets(mut self, datasets: BTreeSet<String>) -> Self {
        self.affected_datasets = datasets;
        self
    }

    /// First non-blank issue number. Sandbox tables are named after it.
    pub fn lead_issue(&self) -> &str {
        self.issue_numbers
            .iter()
            .map(String::as_str)
            .find(|i| !i.trim().is_empty())
            .unwrap_or(self.name.as_str())
    }

    pub fn sandbox_table_name(&self, table: &str) -> String {
        sandbox_table_for(self.lead_issue(), table)
    }
}
