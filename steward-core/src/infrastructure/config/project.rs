// steward-core/src/infrastructure/config/project.rs

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::infrastructure::error::InfrastructureError;

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct StewardConfig {
    #[validate(length(min = 1, message = "project_id cannot be empty"))]
    pub project_id: String,

    #[validate(length(min = 1, message = "dataset_id cannot be empty"))]
    pub dataset_id: String,

    #[validate(length(min = 1, message = "sandbox_dataset_id cannot be empty"))]
    pub sandbox_dataset_id: String,

    /// Custom CDM field catalog; the built-in OMOP subset otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdm_schema_path: Option<PathBuf>,

    #[serde(default)]
    pub bigquery: BigQuerySettings,

    #[validate(nested)]
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BigQuerySettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for BigQuerySettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            location: None,
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://bigquery.googleapis.com/bigquery/v2".to_string()
}
fn default_timeout_secs() -> u64 {
    600
}
fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct RuleDefinition {
    #[validate(length(min = 1, message = "rule name cannot be empty"))]
    pub name: String,

    #[validate(length(min = 1, message = "at least one issue number is required"))]
    pub issue_numbers: Vec<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub affected_datasets: BTreeSet<String>,

    #[serde(default)]
    pub affected_tables: Vec<String>,

    #[serde(flatten)]
    pub kind: RuleKind,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    InMemoryConceptSuppression {
        concept_ids: Vec<i64>,
    },
    LookupTableConceptSuppression {
        lookup_table: String,
        source: LookupSourceDefinition,
    },
    UpdateFamilyHistoryQaCodes,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LookupSourceDefinition {
    Vocabulary {
        #[serde(default)]
        vocabulary_ids: Vec<String>,
        #[serde(default)]
        concept_code_patterns: Vec<String>,
    },
    ConceptIds {
        concept_ids: Vec<i64>,
    },
}

// --- LOADER ---

#[instrument(skip(path))]
pub fn load_config(path: &Path) -> Result<StewardConfig, InfrastructureError> {
    // 1. Discovery: accept either the file itself or its directory
    let config_path = if path.is_dir() {
        find_main_config(path)?
    } else if path.exists() {
        path.to_path_buf()
    } else {
        return Err(InfrastructureError::ConfigNotFound(
            path.display().to_string(),
        ));
    };
    info!(path = ?config_path, "Loading steward configuration");

    // 2. YAML
    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config at {:?}", config_path))?;
    let mut config: StewardConfig = serde_yaml::from_str(&content)?;

    // 3. Relative CDM schema paths are relative to the config file
    if let Some(schema) = &config.cdm_schema_path
        && schema.is_relative()
        && let Some(parent) = config_path.parent()
    {
        config.cdm_schema_path = Some(parent.join(schema));
    }

    // 4. Environment overrides (layering)
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    // 5. Fail fast on incomplete configuration
    config.validate()?;

    Ok(config)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    let candidates = ["steward.yaml", "steward.yml", "steward_project_conf.yaml"];
    for filename in candidates {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "No configuration file found in {:?}. Checked: {:?}",
        root, candidates
    )))
}

fn apply_env_overrides<F>(config: &mut StewardConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("STEWARD_PROJECT_ID") {
        info!(old = %config.project_id, new = %val, "Overriding project via ENV");
        config.project_id = val;
    }
    if let Some(val) = lookup("STEWARD_DATASET_ID") {
        info!(old = %config.dataset_id, new = %val, "Overriding dataset via ENV");
        config.dataset_id = val;
    }
    if let Some(val) = lookup("STEWARD_SANDBOX_DATASET_ID") {
        info!(old = %config.sandbox_dataset_id, new = %val, "Overriding sandbox dataset via ENV");
        config.sandbox_dataset_id = val;
    }
}
