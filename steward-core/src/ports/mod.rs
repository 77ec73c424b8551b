// steward-core/src/ports/mod.rs

pub mod engine;
pub mod notifier;

#[cfg(test)]
pub mod mock;

pub use engine::{
    DestinationTable, EngineError, JobErrorDetail, QueryEngine, QueryJob, QueryRequest,
    QueryResult, Row,
};
pub use notifier::{DeliveryReceipt, NotificationError, Notifier};
