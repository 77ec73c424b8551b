// steward-core/src/application/rules/mod.rs

pub mod concept_suppression;
pub mod config;
pub mod family_history;
pub mod in_memory;
pub mod lookup_table;

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::domain::query_spec::QuerySpec;
use crate::error::StewardError;
use crate::ports::engine::QueryEngine;

pub use concept_suppression::{ConceptSuppression, SuppressionStrategy};
pub use config::{DatasetTarget, RuleConfiguration};
pub use family_history::UpdateFamilyHistoryQaCodes;
pub use in_memory::{InMemoryConceptSuppression, InMemorySuppression};
pub use lookup_table::{
    ConceptIdListSource, LookupTableConceptSuppression, LookupTableSource, LookupTableSuppression,
    VocabularyConceptSource,
};

/// A cleaning rule: set up once against the engine, then planned once into
/// an ordered list of independently executable query specs.
#[async_trait]
pub trait CleaningRule: Send + Sync {
    fn name(&self) -> &str;

    fn issue_numbers(&self) -> &[String];

    fn description(&self) -> &str;

    fn affected_datasets(&self) -> &BTreeSet<String>;

    fn affected_tables(&self) -> &[String];

    async fn setup_rule(&mut self, engine: &dyn QueryEngine) -> Result<(), StewardError>;

    fn get_query_specs(&self) -> Vec<QuerySpec>;
}
