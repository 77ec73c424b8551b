// steward-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, PartialEq)]
pub enum DomainError {
    #[error("Invalid {kind} identifier: '{value}'")]
    #[diagnostic(
        code(steward::domain::identifier),
        help("Identifiers must start with a letter or underscore and contain only letters, digits and underscores.")
    )]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("Invalid value: {0}")]
    #[diagnostic(code(steward::domain::value))]
    InvalidValue(String),

    #[error("Rule configuration error in '{rule}': {reason}")]
    #[diagnostic(code(steward::domain::rule_config))]
    RuleConfig { rule: String, reason: String },

    #[error("Table '{0}' is not part of the CDM catalog")]
    #[diagnostic(code(steward::domain::unknown_table))]
    UnknownTable(String),
}
