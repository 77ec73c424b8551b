// steward-core/src/application/rules/family_history.rs

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::CleaningRule;
use super::config::DatasetTarget;
use crate::domain::cdm::OBSERVATION;
use crate::domain::query_spec::QuerySpec;
use crate::error::StewardError;
use crate::ports::engine::QueryEngine;

/// Legacy (question, answer) source concepts and their replacements.
const REMAPPED_PAIRS: [QaRemap; 3] = [
    QaRemap {
        old: (43529632, 43529091),
        new: (43529655, 43529090),
    },
    QaRemap {
        old: (43529637, 43529094),
        new: (43529660, 43529093),
    },
    QaRemap {
        old: (43529636, 702787),
        new: (43529659, 43529088),
    },
];

struct QaRemap {
    old: (i64, i64),
    new: (i64, i64),
}

impl QaRemap {
    fn when(&self, replacement: i64) -> String {
        format!(
            "    WHEN (observation_source_concept_id = {} AND value_source_concept_id = {}) THEN {}",
            self.old.0, self.old.1, replacement
        )
    }
}

/// Rewrites old family-history questions and answers in `observation` to
/// their current concepts. A single in-place UPDATE; nothing is sandboxed.
pub struct UpdateFamilyHistoryQaCodes {
    name: String,
    target: DatasetTarget,
    issue_numbers: Vec<String>,
    description: String,
    affected_datasets: BTreeSet<String>,
    affected_tables: Vec<String>,
}

impl UpdateFamilyHistoryQaCodes {
    pub fn new(name: &str, target: DatasetTarget, issue_numbers: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            target,
            issue_numbers,
            description: "Updates old family history questions and answers with the new ones"
                .to_string(),
            affected_datasets: BTreeSet::new(),
            affected_tables: vec![OBSERVATION.to_string()],
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        if !description.is_empty() {
            self.description = description.to_string();
        }
        self
    }

    pub fn with_affected_datasets(mut self, datasets: BTreeSet<String>) -> Self {
        self.affected_datasets = datasets;
        self
    }

    fn update_query(&self) -> String {
        let cases = |pick: fn(&QaRemap) -> i64| {
            REMAPPED_PAIRS
                .iter()
                .map(|pair| pair.when(pick(pair)))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let id_list = |pick: fn(&QaRemap) -> i64| {
            REMAPPED_PAIRS
                .iter()
                .map(|pair| pick(pair).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            "UPDATE {table}\nSET\nobservation_source_concept_id = CASE\n{questions}\nEND,\n\
             value_source_concept_id = CASE\n{answers}\nEND\n\
             WHERE observation_source_concept_id IN ({old_questions})\n\
             AND value_source_concept_id IN ({old_answers})",
            table = self.target.table(OBSERVATION),
            questions = cases(|p| p.new.0),
            answers = cases(|p| p.new.1),
            old_questions = id_list(|p| p.old.0),
            old_answers = id_list(|p| p.old.1),
        )
    }
}

#[async_trait]
impl CleaningRule for UpdateFamilyHistoryQaCodes {
    fn name(&self) -> &str {
        &self.name
    }

    fn issue_numbers(&self) -> &[String] {
        &self.issue_numbers
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn affected_datasets(&self) -> &BTreeSet<String> {
        &self.affected_datasets
    }

    fn affected_tables(&self) -> &[String] {
        &self.affected_tables
    }

    async fn setup_rule(&mut self, _engine: &dyn QueryEngine) -> Result<(), StewardError> {
        Ok(())
    }

    fn get_query_specs(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::statement(self.update_query())]
    }
}
