// steward-core/src/domain/sql/linter.rs

use sqlparser::dialect::BigQueryDialect;
use sqlparser::parser::Parser;

use crate::domain::error::DomainError;

pub struct QueryLinter;

impl QueryLinter {
    /// Parses the query with the BigQuery dialect and returns the number of
    /// statements it contains.
    pub fn check(sql: &str) -> Result<usize, DomainError> {
        let dialect = BigQueryDialect {};
        let statements = Parser::parse_sql(&dialect, sql)
            .map_err(|e| DomainError::InvalidValue(format!("unparseable SQL: {}", e)))?;

        if statements.is_empty() {
            return Err(DomainError::InvalidValue("empty SQL".to_string()));
        }
        tracing::debug!(statements = statements.len(), "SQL lint passed");
        Ok(statements.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_left_anti_join() {
        let sql = "SELECT d.* FROM `p.d.person` AS d \
                   LEFT JOIN `p.sb.dc_1_person` AS s ON d.person_id = s.person_id \
                   WHERE s.person_id IS NULL";
        assert_eq!(QueryLinter::check(sql).unwrap(), 1);
    }

    #[test]
    fn test_rejects_broken_punctuation() {
        let sql = "SELECT table_id FROM `p.d.__TABLES__` WHERE table_id IN (, 'person')";
        assert!(QueryLinter::check(sql).is_err());
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(QueryLinter::check("   ").is_err());
    }
}
