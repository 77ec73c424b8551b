// steward-core/src/domain/suppression/queries.rs

// Query shapes shared by every concept suppression rule. Everything here is
// pure: it only builds SQL, nothing is executed.

use crate::domain::cdm::catalog::domain_table_id;
use crate::domain::sql::{
    Condition, Expr, Literal, Relation, SelectItem, SelectQuery, Statement, TableRef, ValueSet,
};

pub const SUPPRESSED_CONCEPTS_CTE: &str = "suppressed_concepts";
const CONCEPT_ID: &str = "concept_id";
const DOMAIN_ALIAS: &str = "d";
const SANDBOX_ALIAS: &str = "s";

/// Sandbox table name for `table`, derived from the rule's first issue id.
pub fn sandbox_table_for(issue_number: &str, table: &str) -> String {
    let prefix: String = issue_number
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_{}", prefix, table)
}

/// `SELECT table_id FROM __TABLES__ WHERE table_id IN (...)`
pub fn tables_in_dataset_query(project: &str, dataset: &str, table_names: &[String]) -> SelectQuery {
    let names = table_names
        .iter()
        .map(|t| Literal::Str(t.clone()))
        .collect();

    SelectQuery::from(Relation::Table(TableRef::metadata(project, dataset)), None)
        .select(SelectItem::Expr(Expr::bare("table_id"), None))
        .filter(Condition::InSet(
            Expr::bare("table_id"),
            ValueSet::Literals(names),
        ))
}

/// Rows of `table` where at least one concept column matches a row of
/// `denylist`. One LEFT JOIN per concept column (`s1..sN`), kept when the
/// COALESCE of the joined ids is not null.
pub fn concept_match_query(
    table: &TableRef,
    concept_fields: &[&str],
    denylist: Relation,
) -> SelectQuery {
    let mut query = SelectQuery::from(Relation::Table(table.clone()), Some(DOMAIN_ALIAS))
        .select(SelectItem::Wildcard(Some(DOMAIN_ALIAS.to_string())));

    let mut matched_ids = Vec::with_capacity(concept_fields.len());
    for (index, field) in concept_fields.iter().enumerate() {
        let alias = format!("{}{}", SANDBOX_ALIAS, index + 1);
        query = query.left_join(
            denylist.clone(),
            &alias,
            Condition::Eq(Expr::col(DOMAIN_ALIAS, field), Expr::col(&alias, CONCEPT_ID)),
        );
        matched_ids.push(Expr::col(&alias, CONCEPT_ID));
    }

    query.filter(Condition::IsNotNull(Expr::Coalesce(matched_ids)))
}

pub fn lookup_table_sandbox_query(
    table: &TableRef,
    concept_fields: &[&str],
    lookup_table: &TableRef,
) -> SelectQuery {
    concept_match_query(table, concept_fields, Relation::Table(lookup_table.clone()))
}

pub fn in_memory_sandbox_query(
    table: &TableRef,
    concept_fields: &[&str],
    concept_ids: &[i64],
) -> SelectQuery {
    let suppressed = SelectQuery::from(
        Relation::IntegerArray(concept_ids.to_vec()),
        Some(CONCEPT_ID),
    )
    .select(SelectItem::Expr(Expr::bare(CONCEPT_ID), None));

    concept_match_query(
        table,
        concept_fields,
        Relation::Named(SUPPRESSED_CONCEPTS_CTE.to_string()),
    )
    .with_cte(SUPPRESSED_CONCEPTS_CTE, suppressed)
}

/// Rows of `table` whose `<table>_id` is absent from its sandbox table: the
/// table as it should look once suppressed rows are gone.
pub fn suppression_query(table: &TableRef, sandbox: &TableRef) -> SelectQuery {
    let id = domain_table_id(&table.table);

    SelectQuery::from(Relation::Table(table.clone()), Some(DOMAIN_ALIAS))
        .select(SelectItem::Wildcard(Some(DOMAIN_ALIAS.to_string())))
        .left_join(
            Relation::Table(sandbox.clone()),
            SANDBOX_ALIAS,
            Condition::Eq(Expr::col(DOMAIN_ALIAS, &id), Expr::col(SANDBOX_ALIAS, &id)),
        )
        .filter(Condition::IsNull(Expr::col(SANDBOX_ALIAS, &id)))
}

pub fn drop_if_empty_statement(sandbox: &TableRef) -> Statement {
    Statement::DropTableIfEmpty {
        table: sandbox.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sql::QueryLinter;

    fn observation() -> TableRef {
        TableRef::new("p", "d", "observation")
    }

    #[test]
    fn test_sandbox_table_naming() {
        assert_eq!(sandbox_table_for("DC-1358", "observation"), "dc_1358_observation");
        assert_eq!(sandbox_table_for("dc585", "person"), "dc585_person");
    }

    #[test]
    fn test_tables_in_dataset_query() {
        let query = tables_in_dataset_query("p", "d", &["person".into(), "observation".into()]);
        insta::assert_snapshot!(query.to_string(), @r"
        SELECT
          table_id
        FROM `p.d.__TABLES__`
        WHERE table_id IN ('person', 'observation')
        ");
    }

    #[test]
    fn test_lookup_sandbox_query_joins_every_concept_column() {
        let lookup = TableRef::new("p", "sb", "dc_1_concept_lookup");
        let query = lookup_table_sandbox_query(
            &observation(),
            &["observation_concept_id", "value_source_concept_id"],
            &lookup,
        );

        insta::assert_snapshot!(query.to_string(), @r"
        SELECT
          d.*
        FROM `p.d.observation` AS d
        LEFT JOIN `p.sb.dc_1_concept_lookup` AS s1
          ON d.observation_concept_id = s1.concept_id
        LEFT JOIN `p.sb.dc_1_concept_lookup` AS s2
          ON d.value_source_concept_id = s2.concept_id
        WHERE COALESCE(s1.concept_id, s2.concept_id) IS NOT NULL
        ");
        assert!(QueryLinter::check(&query.to_string()).is_ok());
    }

    #[test]
    fn test_in_memory_sandbox_query_inlines_ids() {
        let query = in_memory_sandbox_query(&observation(), &["observation_concept_id"], &[99, 10]);
        let sql = query.to_string();

        assert!(sql.starts_with("WITH suppressed_concepts AS (\nSELECT\n  concept_id\n"));
        assert!(sql.contains("FROM UNNEST(ARRAY<INT64>[99, 10]) AS concept_id\n)"));
        assert!(sql.contains("LEFT JOIN suppressed_concepts AS s1\n  ON d.observation_concept_id = s1.concept_id"));
        assert!(sql.ends_with("WHERE COALESCE(s1.concept_id) IS NOT NULL"));
    }

    #[test]
    fn test_in_memory_empty_denylist_matches_nothing() {
        let sql = in_memory_sandbox_query(&observation(), &["observation_concept_id"], &[]).to_string();
        assert!(sql.contains("UNNEST(ARRAY<INT64>[])"));
        assert!(sql.contains("IS NOT NULL"));
    }

    #[test]
    fn test_suppression_query_is_a_left_anti_join() {
        let sandbox = TableRef::new("p", "sb", "dc_1_observation");
        let query = suppression_query(&observation(), &sandbox);

        insta::assert_snapshot!(query.to_string(), @r"
        SELECT
          d.*
        FROM `p.d.observation` AS d
        LEFT JOIN `p.sb.dc_1_observation` AS s
          ON d.observation_id = s.observation_id
        WHERE s.observation_id IS NULL
        ");
        assert!(QueryLinter::check(&query.to_string()).is_ok());
    }
}
