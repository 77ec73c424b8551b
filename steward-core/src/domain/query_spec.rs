// steward-core/src/domain/query_spec.rs

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteDisposition {
    /// Overwrite the destination table.
    WriteTruncate,
    WriteAppend,
}

impl WriteDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteTruncate => "WRITE_TRUNCATE",
            Self::WriteAppend => "WRITE_APPEND",
        }
    }
}

impl fmt::Display for WriteDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub dataset: String,
    pub table: String,
    pub disposition: WriteDisposition,
}

/// One independently executable unit of a rule's plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
}

impl QuerySpec {
    /// A statement that writes nowhere (DDL, DML, scripts).
    pub fn statement(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            destination: None,
        }
    }

    pub fn overwrite(query: impl Into<String>, dataset: &str, table: &str) -> Self {
        Self {
            query: query.into(),
            destination: Some(Destination {
                dataset: dataset.to_string(),
                table: table.to_string(),
                disposition: WriteDisposition::WriteTruncate,
            }),
        }
    }

    pub fn destination_label(&self) -> String {
        match &self.destination {
            Some(d) => format!("{}.{}", d.dataset, d.table),
            None => "-".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_serializes_like_the_warehouse_api() {
        let json = serde_json::to_string(&WriteDisposition::WriteTruncate).unwrap();
        assert_eq!(json, "\"WRITE_TRUNCATE\"");
        assert_eq!(WriteDisposition::WriteAppend.to_string(), "WRITE_APPEND");
    }

    #[test]
    fn test_destination_label() {
        let spec = QuerySpec::overwrite("SELECT 1", "sandbox", "dc_1_person");
        assert_eq!(spec.destination_label(), "sandbox.dc_1_person");
        assert_eq!(QuerySpec::statement("DROP TABLE x").destination_label(), "-");
    }
}
