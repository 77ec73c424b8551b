// steward-core/src/application/rules/lookup_table.rs

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, instrument};

use super::concept_suppression::{ConceptSuppression, SuppressionStrategy};
use super::config::RuleConfiguration;
use crate::application::engine::run_query;
use crate::domain::cdm::{CONCEPT, CdmCatalog};
use crate::domain::error::DomainError;
use crate::domain::sql::{
    Condition, Expr, IdentifierKind, Literal, Relation, SelectItem, SelectQuery, Statement,
    TableRef, ValueSet, validate_identifier,
};
use crate::domain::suppression::lookup_table_sandbox_query;
use crate::error::StewardError;
use crate::ports::engine::{QueryEngine, QueryRequest};

pub type LookupTableConceptSuppression = ConceptSuppression<LookupTableSuppression>;

/// Builds the contents of a suppression lookup table: one `concept_id`
/// column.
pub trait LookupTableSource: Send + Sync {
    fn lookup_query(&self, config: &RuleConfiguration) -> SelectQuery;
}

/// Concepts of the dataset's `concept` table selected by vocabulary and/or
/// concept code patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabularyConceptSource {
    vocabulary_ids: Vec<String>,
    concept_code_patterns: Vec<String>,
}

impl VocabularyConceptSource {
    pub fn new(
        vocabulary_ids: Vec<String>,
        concept_code_patterns: Vec<String>,
    ) -> Result<Self, DomainError> {
        if vocabulary_ids.is_empty() && concept_code_patterns.is_empty() {
            return Err(DomainError::InvalidValue(
                "a vocabulary lookup needs vocabulary ids or concept code patterns".to_string(),
            ));
        }
        for pattern in &concept_code_patterns {
            Regex::new(pattern).map_err(|e| {
                DomainError::InvalidValue(format!("bad concept code pattern '{}': {}", pattern, e))
            })?;
        }

        Ok(Self {
            vocabulary_ids,
            concept_code_patterns,
        })
    }
}

impl LookupTableSource for VocabularyConceptSource {
    fn lookup_query(&self, config: &RuleConfiguration) -> SelectQuery {
        let mut conditions = Vec::new();
        if !self.vocabulary_ids.is_empty() {
            conditions.push(Condition::InSet(
                Expr::bare("vocabulary_id"),
                ValueSet::Literals(
                    self.vocabulary_ids
                        .iter()
                        .map(|v| Literal::Str(v.clone()))
                        .collect(),
                ),
            ));
        }
        if !self.concept_code_patterns.is_empty() {
            conditions.push(Condition::Or(
                self.concept_code_patterns
                    .iter()
                    .map(|p| Condition::RegexpContains(Expr::bare("concept_code"), p.clone()))
                    .collect(),
            ));
        }

        SelectQuery::from(Relation::Table(config.target.table(CONCEPT)), None)
            .distinct()
            .select(SelectItem::Expr(Expr::bare("concept_id"), None))
            .filter(Condition::And(conditions))
    }
}

/// Lookup table holding a literal id list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptIdListSource {
    concept_ids: Vec<i64>,
}

impl ConceptIdListSource {
    pub fn new(concept_ids: Vec<i64>) -> Self {
        Self { concept_ids }
    }
}

impl LookupTableSource for ConceptIdListSource {
    fn lookup_query(&self, _config: &RuleConfiguration) -> SelectQuery {
        SelectQuery::from(
            Relation::IntegerArray(self.concept_ids.clone()),
            Some("concept_id"),
        )
        .select(SelectItem::Expr(Expr::bare("concept_id"), None))
    }
}

/// Denylist materialized as a table in the sandbox dataset during setup.
pub struct LookupTableSuppression {
    lookup_table: String,
    source: Box<dyn LookupTableSource>,
}

impl LookupTableSuppression {
    pub fn new(lookup_table: &str, source: Box<dyn LookupTableSource>) -> Result<Self, DomainError> {
        validate_identifier(IdentifierKind::Table, lookup_table)?;
        Ok(Self {
            lookup_table: lookup_table.to_string(),
            source,
        })
    }

    pub fn lookup_table(&self, config: &RuleConfiguration) -> TableRef {
        config.target.sandbox_table(&self.lookup_table)
    }

    pub fn create_statement(&self, config: &RuleConfiguration) -> Statement {
        Statement::CreateOrReplaceTable {
            table: self.lookup_table(config),
            query: self.source.lookup_query(config),
        }
    }

    #[instrument(skip_all, fields(lookup_table = %self.lookup_table))]
    pub async fn create_suppression_lookup_table(
        &self,
        config: &RuleConfiguration,
        engine: &dyn QueryEngine,
    ) -> Result<(), StewardError> {
        let statement = self.create_statement(config);
        let outcome = run_query(engine, &QueryRequest::new(statement.to_string())).await?;
        info!(job_id = %outcome.job_id, "Suppression lookup table created");
        Ok(())
    }
}

#[async_trait]
impl SuppressionStrategy for LookupTableSuppression {
    async fn setup(
        &mut self,
        config: &RuleConfiguration,
        engine: &dyn QueryEngine,
    ) -> Result<(), StewardError> {
        self.create_suppression_lookup_table(config, engine).await
    }

    fn sandbox_query(
        &self,
        config: &RuleConfiguration,
        table: &TableRef,
        concept_fields: &[&str],
    ) -> SelectQuery {
        lookup_table_sandbox_query(table, concept_fields, &self.lookup_table(config))
    }
}

impl LookupTableConceptSuppression {
    pub fn with_lookup_table(
        config: RuleConfiguration,
        catalog: &CdmCatalog,
        lookup_table: &str,
        source: Box<dyn LookupTableSource>,
    ) -> Result<Self, DomainError> {
        let strategy = LookupTableSuppression::new(lookup_table, source)?;
        Ok(Self::new(config, catalog, strategy))
    }
}
