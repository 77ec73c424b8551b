pub mod batch;
pub mod cdm;
pub mod error;
pub mod participants;
pub mod query_spec;
pub mod sql;
pub mod suppression;

// Handy re-exports to simplify imports elsewhere
pub use error::DomainError;
pub use query_spec::{Destination, QuerySpec, WriteDisposition};
