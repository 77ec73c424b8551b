// steward-core/src/domain/sql/mod.rs

pub mod builder;
pub mod identifier;
pub mod linter;

pub use builder::{
    ColumnRef, Condition, Expr, Join, JoinKind, Layout, Literal, Relation, SelectItem, SelectQuery, Statement,
    TableRef, ValueSet,
};
pub use identifier::{IdentifierKind, validate_identifier};
pub use linter::QueryLinter;
