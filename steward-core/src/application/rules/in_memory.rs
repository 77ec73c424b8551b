// steward-core/src/application/rules/in_memory.rs

use super::concept_suppression::{ConceptSuppression, SuppressionStrategy};
use super::config::RuleConfiguration;
use crate::domain::cdm::CdmCatalog;
use crate::domain::sql::{SelectQuery, TableRef};
use crate::domain::suppression::in_memory_sandbox_query;

pub type InMemoryConceptSuppression = ConceptSuppression<InMemorySuppression>;

/// Denylist inlined into every sandbox query as the `suppressed_concepts` CTE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemorySuppression {
    concept_ids: Vec<i64>,
}

impl InMemorySuppression {
    pub fn new(concept_ids: Vec<i64>) -> Self {
        Self { concept_ids }
    }

    pub fn concept_ids(&self) -> &[i64] {
        &self.concept_ids
    }
}

impl SuppressionStrategy for InMemorySuppression {
    fn sandbox_query(
        &self,
        _config: &RuleConfiguration,
        table: &TableRef,
        concept_fields: &[&str],
    ) -> SelectQuery {
        in_memory_sandbox_query(table, concept_fields, &self.concept_ids)
    }
}

impl InMemoryConceptSuppression {
    pub fn with_concept_ids(
        config: RuleConfiguration,
        catalog: &CdmCatalog,
        concept_ids: Vec<i64>,
    ) -> Self {
        Self::new(config, catalog, InMemorySuppression::new(concept_ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::rules::CleaningRule;
    use crate::application::rules::config::DatasetTarget;
    use crate::error::StewardError;
    use crate::ports::engine::{EngineError, JobErrorDetail, QueryResult};
    use crate::ports::mock::{MockEngine, table_id_rows};

    fn catalog() -> CdmCatalog {
        CdmCatalog::new()
            .with_table(
                "measurement",
                vec![
                    "measurement_id",
                    "person_id",
                    "measurement_concept_id",
                    "measurement_source_concept_id",
                    "value_as_concept_id",
                ],
            )
            .with_table(
                "observation",
                vec!["observation_id", "person_id", "observation_concept_id"],
            )
            .with_table("person", vec!["person_id", "gender_concept_id"])
    }

    fn rule(concept_ids: Vec<i64>) -> InMemoryConceptSuppression {
        let config = RuleConfiguration::new(
            "covid_concepts",
            DatasetTarget::new("p", "d", "sb").unwrap(),
            vec!["DC-1000".into()],
            vec!["measurement".into(), "observation".into(), "person".into()],
            &catalog(),
        )
        .unwrap()
        .with_description("Suppress COVID test concepts");

        InMemoryConceptSuppression::with_concept_ids(config, &catalog(), concept_ids)
    }

    #[tokio::test]
    async fn test_plan_has_three_specs_per_table() {
        let mut rule = rule(vec![756055, 706170]);
        assert_eq!(rule.affected_tables(), ["measurement", "observation", "person"]);

        let engine = MockEngine::new().respond_rows(table_id_rows(&[
            "person",
            "observation",
            "measurement",
        ]));
        rule.setup_rule(&engine).await.unwrap();

        // The in-memory variant needs nothing beyond table resolution.
        assert_eq!(engine.queries().len(), 1);

        let specs = rule.get_query_specs();
        assert_eq!(specs.len(), 9);
        assert_eq!(specs[0].destination_label(), "sb.dc_1000_measurement");
        assert_eq!(specs[3].destination_label(), "d.measurement");
        assert_eq!(specs[8].destination_label(), "-");
        assert!(specs[8].query.contains("DROP TABLE `p.sb.dc_1000_person`;"));
    }

    #[tokio::test]
    async fn test_sandbox_query_matches_any_concept_column() {
        let mut rule = rule(vec![756055]);
        let engine = MockEngine::new().respond_rows(table_id_rows(&["measurement"]));
        rule.setup_rule(&engine).await.unwrap();

        let specs = rule.get_query_specs();
        assert_eq!(specs.len(), 3);
        insta::assert_snapshot!(specs[0].query.as_str(), @r"
        WITH suppressed_concepts AS (
        SELECT
          concept_id
        FROM UNNEST(ARRAY<INT64>[756055]) AS concept_id
        )
        SELECT
          d.*
        FROM `p.d.measurement` AS d
        LEFT JOIN suppressed_concepts AS s1
          ON d.measurement_concept_id = s1.concept_id
        LEFT JOIN suppressed_concepts AS s2
          ON d.measurement_source_concept_id = s2.concept_id
        LEFT JOIN suppressed_concepts AS s3
          ON d.value_as_concept_id = s3.concept_id
        WHERE COALESCE(s1.concept_id, s2.concept_id, s3.concept_id) IS NOT NULL
        ");
    }

    #[tokio::test]
    async fn test_empty_denylist_is_a_no_op_plan() {
        let mut rule = rule(vec![]);
        let engine = MockEngine::new().respond_rows(table_id_rows(&["observation"]));
        rule.setup_rule(&engine).await.unwrap();

        let specs = rule.get_query_specs();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].destination_label(), "sb.dc_1000_observation");
        assert!(specs[0].query.contains("UNNEST(ARRAY<INT64>[])"));

        // Nothing is sandboxed, so the rewrite keeps every row and the empty
        // sandbox table is dropped afterwards.
        assert_eq!(specs[1].destination_label(), "d.observation");
        insta::assert_snapshot!(specs[1].query.as_str(), @r"
        SELECT
          d.*
        FROM `p.d.observation` AS d
        LEFT JOIN `p.sb.dc_1000_observation` AS s
          ON d.observation_id = s.observation_id
        WHERE s.observation_id IS NULL
        ");
        assert_eq!(specs[2].destination_label(), "-");
        insta::assert_snapshot!(specs[2].query.as_str(), @r"
        IF (SELECT row_count FROM `p.sb.__TABLES__` WHERE table_id = 'dc_1000_observation') = 0 THEN
          DROP TABLE `p.sb.dc_1000_observation`;
        END IF;
        ");
    }

    #[tokio::test]
    async fn test_no_existing_tables_means_no_specs() {
        let mut rule = rule(vec![1]);
        let engine = MockEngine::new().respond_rows(vec![]);
        rule.setup_rule(&engine).await.unwrap();

        assert!(rule.affected_tables().is_empty());
        assert!(rule.get_query_specs().is_empty());
    }

    #[tokio::test]
    async fn test_resolver_job_errors_fail_setup() {
        let mut rule = rule(vec![1]);
        let engine = MockEngine::new().respond(Ok(QueryResult {
            rows: vec![],
            errors: vec![JobErrorDetail {
                reason: Some("accessDenied".into()),
                location: None,
                message: "Access Denied: Dataset p:d".into(),
            }],
        }));

        let err = rule.setup_rule(&engine).await.unwrap_err();
        assert!(matches!(
            err,
            StewardError::Engine(EngineError::JobFailed { .. })
        ));
        assert_eq!(rule.affected_tables().len(), 3);
    }

    #[test]
    fn test_rule_metadata() {
        let rule = rule(vec![1]);
        assert_eq!(rule.name(), "covid_concepts");
        assert_eq!(rule.issue_numbers(), ["DC-1000"]);
        assert_eq!(rule.description(), "Suppress COVID test concepts");
        assert!(rule.affected_datasets().is_empty());
        assert_eq!(rule.strategy().concept_ids(), [1]);
    }
}
