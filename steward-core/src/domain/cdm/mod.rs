// steward-core/src/domain/cdm/mod.rs

pub mod catalog;

pub use catalog::CdmCatalog;

/// Common CDM table names.
pub const PERSON: &str = "person";
pub const DEATH: &str = "death";
pub const OBSERVATION: &str = "observation";
pub const CONCEPT: &str = "concept";

pub const MAPPING_PREFIX: &str = "_mapping_";
pub const EXT_SUFFIX: &str = "_ext";
