// steward-core/src/application/factory.rs

use tracing::{debug, instrument};

use crate::application::rules::{
    CleaningRule, ConceptIdListSource, DatasetTarget, InMemoryConceptSuppression,
    LookupTableConceptSuppression, LookupTableSource, RuleConfiguration,
    UpdateFamilyHistoryQaCodes, VocabularyConceptSource,
};
use crate::domain::cdm::CdmCatalog;
use crate::domain::error::DomainError;
use crate::infrastructure::config::{
    LookupSourceDefinition, RuleDefinition, RuleKind, StewardConfig,
};

/// Instantiates every configured rule, in configuration order. When `only`
/// is given, rules with other names are skipped.
#[instrument(skip_all, fields(rules = config.rules.len()))]
pub fn build_rules(
    config: &StewardConfig,
    catalog: &CdmCatalog,
    only: Option<&str>,
) -> Result<Vec<Box<dyn CleaningRule>>, DomainError> {
    let target = DatasetTarget::new(
        &config.project_id,
        &config.dataset_id,
        &config.sandbox_dataset_id,
    )?;

    let selected: Vec<&RuleDefinition> = config
        .rules
        .iter()
        .filter(|def| only.is_none_or(|name| def.name == name))
        .collect();

    if let Some(name) = only
        && selected.is_empty()
    {
        return Err(DomainError::RuleConfig {
            rule: name.to_string(),
            reason: "no rule with this name is configured".to_string(),
        });
    }

    selected
        .into_iter()
        .map(|def| build_rule(def, &target, catalog))
        .collect()
}

fn build_rule(
    def: &RuleDefinition,
    target: &DatasetTarget,
    catalog: &CdmCatalog,
) -> Result<Box<dyn CleaningRule>, DomainError> {
    debug!(rule = %def.name, "Building rule");

    let rule: Box<dyn CleaningRule> = match &def.kind {
        RuleKind::InMemoryConceptSuppression { concept_ids } => {
            Box::new(InMemoryConceptSuppression::with_concept_ids(
                suppression_config(def, target, catalog)?,
                catalog,
                concept_ids.clone(),
            ))
        }
        RuleKind::LookupTableConceptSuppression {
            lookup_table,
            source,
        } => {
            let source: Box<dyn LookupTableSource> = match source {
                LookupSourceDefinition::Vocabulary {
                    vocabulary_ids,
                    concept_code_patterns,
                } => Box::new(
                    VocabularyConceptSource::new(
                        vocabulary_ids.clone(),
                        concept_code_patterns.clone(),
                    )
                    .map_err(|e| rule_error(def, e))?,
                ),
                LookupSourceDefinition::ConceptIds { concept_ids } => {
                    Box::new(ConceptIdListSource::new(concept_ids.clone()))
                }
            };
            Box::new(LookupTableConceptSuppression::with_lookup_table(
                suppression_config(def, target, catalog)?,
                catalog,
                lookup_table,
                source,
            )?)
        }
        RuleKind::UpdateFamilyHistoryQaCodes => Box::new(
            UpdateFamilyHistoryQaCodes::new(&def.name, target.clone(), def.issue_numbers.clone())
                .with_description(&def.description)
                .with_affected_datasets(def.affected_datasets.clone()),
        ),
    };

    Ok(rule)
}

fn suppression_config(
    def: &RuleDefinition,
    target: &DatasetTarget,
    catalog: &CdmCatalog,
) -> Result<RuleConfiguration, DomainError> {
    Ok(RuleConfiguration::new(
        &def.name,
        target.clone(),
        def.issue_numbers.clone(),
        def.affected_tables.clone(),
        catalog,
    )?
    .with_description(&def.description)
    .with_affected_datasets(def.affected_datasets.clone()))
}

fn rule_error(def: &RuleDefinition, err: DomainError) -> DomainError {
    DomainError::RuleConfig {
        rule: def.name.clone(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::load_cdm_catalog;

    const CONFIG: &str = r#"
project_id: p
dataset_id: combined
sandbox_dataset_id: combined_sandbox
rules:
  - name: covid_concepts
    kind: in_memory_concept_suppression
    issue_numbers: [DC-1000]
    affected_tables: [measurement, death, observation]
    concept_ids: [756055]
  - name: cancer_codes
    kind: lookup_table_concept_suppression
    issue_numbers: [DC-2000]
    affected_tables: [condition_occurrence]
    lookup_table: cancer_concepts
    source:
      concept_ids:
        concept_ids: [1, 2]
  - name: family_history
    kind: update_family_history_qa_codes
    issue_numbers: [DC-564]
"#;

    fn config() -> StewardConfig {
        serde_yaml::from_str(CONFIG).unwrap()
    }

    #[test]
    fn test_builds_rules_in_configuration_order() {
        let catalog = load_cdm_catalog(None).unwrap();
        let rules = build_rules(&config(), &catalog, None).unwrap();

        let names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["covid_concepts", "cancer_codes", "family_history"]);
        // death has no death_id column and cannot be suppressed
        assert_eq!(rules[0].affected_tables(), ["measurement", "observation"]);
        assert_eq!(rules[2].affected_tables(), ["observation"]);
    }

    #[test]
    fn test_only_selects_one_rule() {
        let catalog = load_cdm_catalog(None).unwrap();
        let rules = build_rules(&config(), &catalog, Some("cancer_codes")).unwrap();
        assert_eq!(rules.len(), 1);

        let err = build_rules(&config(), &catalog, Some("missing")).err().unwrap();
        assert!(matches!(err, DomainError::RuleConfig { .. }));
    }

    #[test]
    fn test_invalid_pattern_is_a_rule_config_error() {
        let mut config = config();
        config.rules[1].kind = RuleKind::LookupTableConceptSuppression {
            lookup_table: "cancer_concepts".into(),
            source: LookupSourceDefinition::Vocabulary {
                vocabulary_ids: vec![],
                concept_code_patterns: vec!["[".into()],
            },
        };

        let err = build_rules(&config, &load_cdm_catalog(None).unwrap(), None)
            .err()
            .unwrap();
        assert!(matches!(err, DomainError::RuleConfig { ref rule, .. } if rule == "cancer_codes"));
    }

    #[test]
    fn test_invalid_dataset_id() {
        let mut config = config();
        config.dataset_id = "combined`".into();
        assert!(build_rules(&config, &load_cdm_catalog(None).unwrap(), None).is_err());
    }
}
