#[cfg(not(feature = "std"))]
use alloc::{format, string::String, vec::Vec};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{types::*, utils::display_comma_separated};

/// A top-level statement (SELECT, TRACE, DESCRIBE, SHOW or CACHE).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Statement {
    /// The `SELECT ...` statement
    Select(SelectStmt),
    /// The `TRACE ...` statement
    Trace(TraceStmt),
    /// The `DESCRIBE ...` statement
    Describe(DescribeStmt),
    /// The `SHOW ...` statement
    Show(ShowStmt),
    /// The `CACHE ...` statement
    Cache(CacheStmt),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select(stmt) => write!(f, "{}", stmt),
            Self::Trace(stmt) => write!(f, "{}", stmt),
            Self::Describe(stmt) => write!(f, "{}", stmt),
            Self::Show(stmt) => write!(f, "{}", stmt),
            Self::Cache(stmt) => write!(f, "{}", stmt),
        }
    }
}

/// The `SELECT ...` statement.
///
/// ```txt
/// SELECT <projection> FROM <table>
///     [ <joins> ] [ WHERE <predicate> ]
///     [ GROUP BY <fields> ] [ HAVING <predicate> ]
///     [ ORDER BY <keys> ] [ LIMIT <n> ] [ OFFSET <n> ]
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectStmt {
    /// Projection items, in declaration order.
    pub columns: Vec<SelectColumn>,
    /// Base table name.
    pub from: String,
    /// Joined tables, in declaration order.
    pub joins: Vec<Join>,
    /// Search condition.
    pub where_clause: Option<Predicate>,
    /// Grouping keys.
    pub group_by: Vec<String>,
    /// Predicate applied to aggregated rows.
    pub having: Option<Predicate>,
    /// Sort keys, first key is the primary sort.
    pub order_by: Vec<OrderBy>,
    /// Maximum number of rows to return.
    pub limit: Option<u64>,
    /// Number of rows to skip.
    pub offset: Option<u64>,
}

impl fmt::Display for SelectStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {}", display_comma_separated(&self.columns))?;
        write!(f, " FROM {}", self.from)?;
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {}", where_clause)?;
        }
        if !self.group_by.is_empty() {
            write!(f, " GROUP BY {}", display_comma_separated(&self.group_by))?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.order_by.is_empty() {
            write!(f, " ORDER BY {}", display_comma_separated(&self.order_by))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

/// One item of the comma-separated list following `SELECT`.
///
/// `name` may be `*`, a bare column, or a `table.column` qualified name.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SelectColumn {
    /// Column (or `*`) being projected.
    pub name: String,
    /// Output name, `... AS alias`.
    pub alias: Option<String>,
    /// Aggregate applied to the column, `COUNT(name)` etc.
    pub aggregate: Option<AggregateFunc>,
}

impl SelectColumn {
    /// A plain, unaliased projection of one column.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            aggregate: None,
        }
    }

    /// Returns true if this item projects `*` without an aggregate.
    pub fn is_wildcard(&self) -> bool {
        self.name == "*" && self.aggregate.is_none()
    }

    /// The key under which this item appears in result rows: the alias if
    /// present, `AGG(column)` for aggregates, otherwise the column name.
    pub fn output_name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match self.aggregate {
            Some(agg) => format!("{}({})", agg, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for SelectColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.aggregate {
            Some(agg) => write!(f, "{}({})", agg, self.name)?,
            None => write!(f, "{}", self.name)?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

/// A joined table with its constraint.
///
/// ```txt
/// [ INNER | LEFT [OUTER] | RIGHT [OUTER] ] JOIN <table> ON <left> <op> <right>
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Join {
    /// The join flavour; bare `JOIN` is inner.
    pub kind: JoinKind,
    /// The right-hand table.
    pub table: String,
    /// The `ON` constraint.
    pub on: JoinCondition,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} JOIN {} ON {}", self.kind, self.table, self.on)
    }
}

/// The `ON` constraint of a join; fields may be qualified.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JoinCondition {
    /// Field resolved against the left relation.
    pub left_field: String,
    /// Comparison operator.
    pub op: CompareOp,
    /// Field resolved against the right relation.
    pub right_field: String,
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left_field, self.op, self.right_field)
    }
}

/// A predicate block: conditions joined by a single combinator.
///
/// The parser keeps one combinator per block; if a clause mixes `AND` and
/// `OR`, the last combinator token seen wins.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Predicate {
    /// The conditions, in source order.
    pub conditions: Vec<Condition>,
    /// How the conditions combine.
    pub combinator: Combinator,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut delim = "";
        for condition in &self.conditions {
            write!(f, "{}{}", delim, condition)?;
            delim = match self.combinator {
                Combinator::And => " AND ",
                Combinator::Or => " OR ",
            };
        }
        Ok(())
    }
}

/// A single comparison within a predicate.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Condition {
    /// The field being tested; may be qualified or an aggregate alias.
    pub field: String,
    /// Comparison operator.
    pub op: CompareOp,
    /// Comparison value; a list for `IN`, the lower bound for `BETWEEN`.
    pub value: Literal,
    /// The upper bound of `BETWEEN`.
    pub second_value: Option<Literal>,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.op, &self.second_value) {
            (CompareOp::Between, Some(upper)) => {
                write!(f, "{} BETWEEN {} AND {}", self.field, self.value, upper)
            }
            _ => write!(f, "{} {} {}", self.field, self.op, self.value),
        }
    }
}

/// One sort key of an `ORDER BY` clause.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrderBy {
    /// The field sorted on.
    pub field: String,
    /// Sort direction; ascending when omitted in the source.
    pub direction: OrderDirection,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction)
    }
}

/// The `TRACE ...` statement: follow an identifier across sources.
///
/// ```txt
/// TRACE <identifier> = <value> THROUGH <source> [, <source> ...]
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceStmt {
    /// The identifier column to follow, e.g. `service_id`.
    pub identifier: String,
    /// The value to look for.
    pub value: Literal,
    /// The sources to fan out to.
    pub through: Vec<String>,
}

impl fmt::Display for TraceStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TRACE {} = {} THROUGH {}",
            self.identifier,
            self.value,
            display_comma_separated(&self.through)
        )
    }
}

/// The `DESCRIBE <table>` statement.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DescribeStmt {
    /// The table whose schema is reported.
    pub table: String,
}

impl fmt::Display for DescribeStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DESCRIBE {}", self.table)
    }
}

/// The `SHOW { TABLES | PLUGINS | SOURCES }` statement.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ShowStmt {
    /// Which catalogue to list.
    pub what: ShowTarget,
}

impl fmt::Display for ShowStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHOW {}", self.what)
    }
}

/// A cache-control statement.
///
/// ```txt
/// CACHE SHOW
/// CACHE CLEAR [ <table> ]
/// CACHE SET TTL [ <table> ] <millis>
/// ```
///
/// `SHOW CACHE` parses to the same statement as `CACHE SHOW`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CacheStmt {
    /// What to do.
    pub action: CacheAction,
    /// Restrict the action to one table.
    pub table: Option<String>,
    /// The new time-to-live for `SET TTL`, in milliseconds.
    pub ttl_ms: Option<u64>,
}

impl fmt::Display for CacheStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CACHE {}", self.action)?;
        if let Some(table) = &self.table {
            write!(f, " {}", table)?;
        }
        if let Some(ttl_ms) = self.ttl_ms {
            write!(f, " {}", ttl_ms)?;
        }
        Ok(())
    }
}
