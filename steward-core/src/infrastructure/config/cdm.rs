// steward-core/src/infrastructure/config/cdm.rs

use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

use crate::domain::cdm::CdmCatalog;
use crate::infrastructure::error::InfrastructureError;

const BUILTIN_CDM_FIELDS: &str = include_str!("../../../resources/cdm_fields.yaml");

/// Loads the CDM field catalog from `path`, or the built-in OMOP subset.
#[instrument]
pub fn load_cdm_catalog(path: Option<&Path>) -> Result<CdmCatalog, InfrastructureError> {
    let catalog: CdmCatalog = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read CDM schema at {:?}", path))?;
            serde_yaml::from_str(&content)?
        }
        None => serde_yaml::from_str(BUILTIN_CDM_FIELDS)?,
    };

    debug!(tables = catalog.table_names().count(), "CDM catalog loaded");
    Ok(catalog)
}
