// steward-core/src/lib.rs

// 1. Documentation is not enforced yet
#![allow(missing_docs)]

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts with the outside world: query engine, notifier.
pub mod ports;

// 2. Domain (business core)
// CDM catalog, SQL builder, suppression query shapes, batch filters.
// Depends on NOTHING else (neither infra nor app).
pub mod domain;

// 3. Infrastructure (Adapters)
// BigQuery REST, Slack, config files, NDJSON IO.
// Depends on Domain and Ports.
pub mod infrastructure;

// 4. Application (Use Cases)
// Resolver, cleaning rules, clean engine, batch pipeline.
// Depends on Domain, Infra and Ports.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
// use steward_core::StewardError;
pub use error::StewardError;
