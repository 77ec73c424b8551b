pub mod cdm;
pub mod project;

pub use cdm::load_cdm_catalog;
pub use project::{
    BigQuerySettings, LookupSourceDefinition, RuleDefinition, RuleKind, StewardConfig,
    load_config,
};
