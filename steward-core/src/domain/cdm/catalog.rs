// steward-core/src/domain/cdm/catalog.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const CONCEPT_ID_SUFFIX: &str = "concept_id";

/// Field lists per CDM table. Drives which tables a suppression rule can
/// touch and which columns it joins on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdmCatalog {
    #[serde(default)]
    tables: BTreeMap<String, Vec<String>>,
}

impl CdmCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table<S: Into<String>>(mut self, table: &str, fields: Vec<S>) -> Self {
        self.tables.insert(
            table.to_string(),
            fields.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn fields(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Fields ending in `concept_id`, in declaration order. Unknown tables
    /// have none.
    pub fn concept_id_fields(&self, table: &str) -> Vec<&str> {
        self.fields(table)
            .unwrap_or_default()
            .iter()
            .filter(|f| f.ends_with(CONCEPT_ID_SUFFIX))
            .map(String::as_str)
            .collect()
    }

    /// True when the table carries its own `<table>_id` row identifier.
    pub fn has_domain_table_id(&self, table: &str) -> bool {
        let id_field = domain_table_id(table);
        self.fields(table)
            .is_some_and(|fields| fields.iter().any(|f| *f == id_field))
    }

    /// The table has a `person_id` column.
    pub fn has_person_id(&self, table: &str) -> bool {
        self.fields(table)
            .is_some_and(|fields| fields.iter().any(|f| f == "person_id"))
    }
}

pub fn domain_table_id(table: &str) -> String {
    format!("{}_id", table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> CdmCatalog {
        CdmCatalog::new()
            .with_table(
                "condition_occurrence",
                vec![
                    "condition_occurrence_id",
                    "person_id",
                    "condition_concept_id",
                    "condition_source_concept_id",
                ],
            )
            .with_table("death", vec!["person_id", "cause_concept_id"])
            .with_table("note_nlp", vec!["note_nlp_id", "snippet"])
    }

    #[test]
    fn test_concept_id_fields_keep_declaration_order() {
        assert_eq!(
            catalog().concept_id_fields("condition_occurrence"),
            vec!["condition_concept_id", "condition_source_concept_id"]
        );
        assert!(catalog().concept_id_fields("note_nlp").is_empty());
        assert!(catalog().concept_id_fields("missing").is_empty());
    }

    #[test]
    fn test_domain_table_id() {
        let catalog = catalog();
        assert!(catalog.has_domain_table_id("condition_occurrence"));
        assert!(!catalog.has_domain_table_id("death"));
        assert!(!catalog.has_domain_table_id("missing"));
        assert!(catalog.has_person_id("death"));
    }
}
