// steward-core/src/domain/sql/identifier.rs

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::domain::error::DomainError;

#[allow(clippy::expect_used)]
static PROJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*$").expect("valid project regex"));

#[allow(clippy::expect_used)]
static OBJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid object regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Project,
    Dataset,
    Table,
    Column,
}

impl IdentifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Dataset => "dataset",
            Self::Table => "table",
            Self::Column => "column",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejects anything that could escape a backtick-quoted reference.
pub fn validate_identifier(kind: IdentifierKind, value: &str) -> Result<(), DomainError> {
    let pattern = match kind {
        IdentifierKind::Project => &*PROJECT_ID,
        _ => &*OBJECT_ID,
    };

    if pattern.is_match(value) {
        Ok(())
    } else {
        Err(DomainError::InvalidIdentifier {
            kind: kind.as_str(),
            value: value.to_string(),
        })
    }
}
