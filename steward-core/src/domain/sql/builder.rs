// steward-core/src/domain/sql/builder.rs

// Small structured builder for the warehouse SQL the rules emit.
// Lists are always rendered with `join`, so separators never depend on
// loop position.

use std::fmt;

/// Fully qualified table reference, rendered as `` `project.dataset.table` ``.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(project: &str, dataset: &str, table: &str) -> Self {
        Self {
            project: project.to_string(),
            dataset: dataset.to_string(),
            table: table.to_string(),
        }
    }

    /// The per-dataset `__TABLES__` metadata view.
    pub fn metadata(project: &str, dataset: &str) -> Self {
        Self::new(project, dataset, "__TABLES__")
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}.{}.{}`", self.project, self.dataset, self.table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn qualified(qualifier: &str, name: &str) -> Self {
        Self {
            qualifier: Some(qualifier.to_string()),
            name: name.to_string(),
        }
    }

    pub fn bare(name: &str) -> Self {
        Self {
            qualifier: None,
            name: name.to_string(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(q) => write!(f, "{}.{}", q, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Int(i64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Int(i) => write!(f, "{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Literal),
    Coalesce(Vec<Expr>),
    CountStar,
}

impl Expr {
    pub fn col(qualifier: &str, name: &str) -> Self {
        Self::Column(ColumnRef::qualified(qualifier, name))
    }

    pub fn bare(name: &str) -> Self {
        Self::Column(ColumnRef::bare(name))
    }

    pub fn string(value: &str) -> Self {
        Self::Literal(Literal::Str(value.to_string()))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(c) => write!(f, "{}", c),
            Self::Literal(l) => write!(f, "{}", l),
            Self::Coalesce(args) => write!(f, "COALESCE({})", join(args, ", ")),
            Self::CountStar => f.write_str("COUNT(*)"),
        }
    }
}

/// Right-hand side of an `IN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSet {
    Literals(Vec<Literal>),
    Subquery(Box<SelectQuery>),
}

impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literals(values) => write!(f, "({})", join(values, ", ")),
            Self::Subquery(query) => write!(f, "({})", query.render(Layout::Inline)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    IsNull(Expr),
    IsNotNull(Expr),
    Eq(Expr, Expr),
    NotEq(Expr, Expr),
    Like(Expr, String),
    InSet(Expr, ValueSet),
    RegexpContains(Expr, String),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsNull(e) => write!(f, "{} IS NULL", e),
            Self::IsNotNull(e) => write!(f, "{} IS NOT NULL", e),
            Self::Eq(l, r) => write!(f, "{} = {}", l, r),
            Self::NotEq(l, r) => write!(f, "{} != {}", l, r),
            Self::Like(e, pattern) => write!(f, "{} LIKE {}", e, Literal::Str(pattern.clone())),
            Self::InSet(e, set) => write!(f, "{} IN {}", e, set),
            Self::RegexpContains(e, pattern) => write!(
                f,
                "REGEXP_CONTAINS({}, {})",
                e,
                Literal::Str(pattern.clone())
            ),
            Self::And(parts) => write!(f, "{}", join(parts, " AND ")),
            Self::Or(parts) if parts.len() == 1 => write!(f, "{}", parts[0]),
            Self::Or(parts) => write!(f, "({})", join(parts, " OR ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    Table(TableRef),
    /// A CTE declared in the same query.
    Named(String),
    /// Inline INT64 array, typed so an empty list stays valid.
    IntegerArray(Vec<i64>),
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(t) => write!(f, "{}", t),
            Self::Named(name) => f.write_str(name),
            Self::IntegerArray(ids) => write!(f, "UNNEST(ARRAY<INT64>[{}])", join(ids, ", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    Wildcard(Option<String>),
    Expr(Expr, Option<String>),
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard(Some(q)) => write!(f, "{}.*", q),
            Self::Wildcard(None) => f.write_str("*"),
            Self::Expr(e, Some(alias)) => write!(f, "{} AS {}", e, alias),
            Self::Expr(e, None) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => f.write_str("JOIN"),
            Self::Left => f.write_str("LEFT JOIN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub kind: JoinKind,
    pub relation: Relation,
    pub alias: String,
    pub on: Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Pretty,
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub ctes: Vec<(String, SelectQuery)>,
    pub distinct: bool,
    pub projection: Vec<SelectItem>,
    pub from: Relation,
    pub alias: Option<String>,
    pub joins: Vec<Join>,
    pub filter: Option<Condition>,
    pub limit: Option<u64>,
}

impl SelectQuery {
    pub fn from(relation: Relation, alias: Option<&str>) -> Self {
        Self {
            ctes: Vec::new(),
            distinct: false,
            projection: Vec::new(),
            from: relation,
            alias: alias.map(str::to_string),
            joins: Vec::new(),
            filter: None,
            limit: None,
        }
    }

    pub fn select(mut self, item: SelectItem) -> Self {
        self.projection.push(item);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn with_cte(mut self, name: &str, query: SelectQuery) -> Self {
        self.ctes.push((name.to_string(), query));
        self
    }

    pub fn left_join(self, relation: Relation, alias: &str, on: Condition) -> Self {
        self.join(JoinKind::Left, relation, alias, on)
    }

    pub fn inner_join(self, relation: Relation, alias: &str, on: Condition) -> Self {
        self.join(JoinKind::Inner, relation, alias, on)
    }

    fn join(mut self, kind: JoinKind, relation: Relation, alias: &str, on: Condition) -> Self {
        self.joins.push(Join {
            kind,
            relation,
            alias: alias.to_string(),
            on,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(condition);
        self
    }

    pub fn render(&self, layout: Layout) -> String {
        let (sep, indent) = match layout {
            Layout::Pretty => ("\n", "  "),
            Layout::Inline => (" ", ""),
        };
        let mut out = String::new();

        if !self.ctes.is_empty() {
            let ctes = self
                .ctes
                .iter()
                .map(|(name, q)| format!("{} AS ({}{}{})", name, sep, q.render(layout), sep))
                .collect::<Vec<_>>()
                .join(&format!(",{}", sep));
            out.push_str(&format!("WITH {}{}", ctes, sep));
        }

        out.push_str("SELECT");
        if self.distinct {
            out.push_str(" DISTINCT");
        }
        let items = self
            .projection
            .iter()
            .map(|i| format!("{}{}", indent, i))
            .collect::<Vec<_>>()
            .join(&format!(",{}", sep));
        out.push_str(sep);
        out.push_str(&items);

        out.push_str(&format!("{}FROM {}", sep, self.from));
        if let Some(alias) = &self.alias {
            out.push_str(&format!(" AS {}", alias));
        }

        for join in &self.joins {
            out.push_str(&format!(
                "{}{} {} AS {}{}{}ON {}",
                sep, join.kind, join.relation, join.alias, sep, indent, join.on
            ));
        }

        if let Some(filter) = &self.filter {
            out.push_str(&format!("{}WHERE {}", sep, filter));
        }
        if let Some(limit) = self.limit {
            out.push_str(&format!("{}LIMIT {}", sep, limit));
        }

        out
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(Layout::Pretty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Select(SelectQuery),
    CreateOrReplaceTable { table: TableRef, query: SelectQuery },
    /// Drops the table when `__TABLES__` reports zero rows for it.
    DropTableIfEmpty { table: TableRef },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(q) => write!(f, "{}", q),
            Self::CreateOrReplaceTable { table, query } => {
                write!(f, "CREATE OR REPLACE TABLE {} AS\n{}", table, query)
            }
            Self::DropTableIfEmpty { table } => {
                let row_count = SelectQuery::from(
                    Relation::Table(TableRef::metadata(&table.project, &table.dataset)),
                    None,
                )
                .select(SelectItem::Expr(Expr::bare("row_count"), None))
                .filter(Condition::Eq(Expr::bare("table_id"), Expr::string(&table.table)));

                write!(
                    f,
                    "IF ({}) = 0 THEN\n  DROP TABLE {};\nEND IF;",
                    row_count.render(Layout::Inline),
                    table
                )
            }
        }
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}
