// steward-core/src/infrastructure/adapters/mod.rs

pub mod bigquery;
pub mod slack;

pub use bigquery::BigQueryEngine;
pub use slack::{SlackConfig, SlackNotifier};
