// steward/src/commands/mod.rs

pub mod batch;
pub mod clean;
pub mod notify;
pub mod row_counts;
