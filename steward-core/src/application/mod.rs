// steward-core/src/application/mod.rs

pub mod batch;
pub mod clean_engine;
pub mod engine;
pub mod factory;
pub mod resolver;
pub mod row_counts;
pub mod rules;

// --- RE-EXPORTS (FACADE PATTERN) ---
// Lets the CLI write `use steward_core::application::{clean_dataset, build_rules};`
// without knowing the file layout.

pub use batch::{BatchReport, run_batch_pipeline};
pub use clean_engine::{
    CleanReport, PlannedQuery, clean_dataset, clean_dataset_and_notify, failure_message,
    get_query_list,
};
pub use engine::{QueryOutcome, run_query};
pub use factory::build_rules;
pub use resolver::get_tables_in_dataset;
pub use row_counts::{TableRowCount, participant_row_counts};
pub use rules::CleaningRule;
