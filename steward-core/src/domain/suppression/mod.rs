// steward-core/src/domain/suppression/mod.rs

pub mod queries;

pub use queries::{
    SUPPRESSED_CONCEPTS_CTE, concept_match_query, drop_if_empty_statement, in_memory_sandbox_query,
    lookup_table_sandbox_query, sandbox_table_for, suppression_query, tables_in_dataset_query,
};
