use std::collections::BTreeMap;
use std::time::Duration;

use infraql_ast::{CompareOp, OrderDirection, ShowTarget};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::cache::CacheStats;

/// The dynamically-typed scalar of a row cell: string, number, boolean,
/// nested object, list or null.
pub type Value = serde_json::Value;

/// One result row. The sorted map makes serialized rows (and hence cache
/// fingerprints) deterministic.
pub type Row = BTreeMap<String, Value>;

/// The declared type of a column.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Text.
    String,
    /// Integer- or real-valued.
    Number,
    /// True or false.
    Boolean,
    /// An ISO-8601 date or timestamp, carried as text.
    Date,
    /// A nested object.
    Object,
    /// A list.
    Array,
}

/// Schema of one column of a table or result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether nulls occur.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnInfo {
    /// A column with just a name and type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: None,
            description: None,
        }
    }
}

/// Schema of one table exposed by a data source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name, unique across the union of live plugins.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared columns.
    pub columns: Vec<ColumnInfo>,
    /// Approximate row count, when the source knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

/// One pushed-down condition of the WHERE clause, with literal values
/// already converted to runtime values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Filter {
    /// The field being tested.
    pub field: String,
    /// Comparison operator.
    pub op: CompareOp,
    /// Comparison value; an array for `IN`, the lower bound for `BETWEEN`.
    pub value: Value,
    /// The upper bound of `BETWEEN`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_value: Option<Value>,
}

/// One sort key passed down to a source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrderSpec {
    /// The field sorted on.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

/// The options of one plugin fetch. A source may honour any subset; the
/// executor re-applies the full predicate and the relational operators
/// post-fetch, so correctness does not depend on pushdown compliance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Maximum number of rows wanted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Rows to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Requested ordering.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub order_by: Vec<OrderSpec>,
    /// The projected column names, when the projection is explicit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    /// Advisory cap on fetched rows when no `limit` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u64>,
}

/// The rows and metadata produced by a SELECT (or a raw plugin fetch).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Result columns, unique after aliasing.
    pub columns: Vec<ColumnInfo>,
    /// The rows.
    pub rows: Vec<Row>,
    /// `rows.len()`.
    pub row_count: usize,
    /// Row count observed before pagination and truncation.
    pub total_count: usize,
    /// Wall-clock execution time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// The owning source of the base table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// True if the result was clipped to the default cap.
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub truncated: bool,
    /// Attached when `truncated` is set, suggesting LIMIT/OFFSET or WHERE.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl QueryResult {
    /// A result over the given columns and rows, with counts stamped.
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            total_count: row_count,
            execution_time_ms: None,
            source: None,
            truncated: false,
            warning: None,
        }
    }
}

/// One entry of a TRACE result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceHop {
    /// The source the hop was found in.
    pub source: String,
    /// The table the hop was found in.
    pub table: String,
    /// When the hop happened, as an RFC 3339 timestamp.
    pub timestamp: String,
    /// The matched row.
    pub data: Value,
}

/// The time-ordered hops of a TRACE statement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceResult {
    /// The identifier that was followed.
    pub identifier: String,
    /// The value that was followed.
    pub value: Value,
    /// The hops, ascending by timestamp.
    pub hops: Vec<TraceHop>,
    /// `hops.len()`.
    pub total_hops: usize,
}

/// The schema of one table, as reported by DESCRIBE.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DescribeResult {
    /// The table described.
    pub table: String,
    /// The owning source.
    pub source: String,
    /// The declared columns.
    pub columns: Vec<ColumnInfo>,
}

/// A catalogue listing, as reported by SHOW.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShowResult {
    /// Which catalogue was listed.
    pub what: ShowTarget,
    /// One value per listed item.
    pub items: Vec<Value>,
}

/// The outcome of a cache-control statement.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheResult {
    /// The action performed.
    pub action: String,
    /// A human-readable confirmation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Cache statistics, for `CACHE SHOW`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CacheStats>,
}

/// The result of executing one statement, tagged by statement kind.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExecutionResult {
    /// A SELECT result.
    Query(QueryResult),
    /// A TRACE result.
    Trace(TraceResult),
    /// A DESCRIBE result.
    Describe(DescribeResult),
    /// A SHOW listing.
    Show(ShowResult),
    /// A cache-control outcome.
    Cache(CacheResult),
}

impl ExecutionResult {
    /// The query result, if this was a SELECT.
    pub fn into_query(self) -> Option<QueryResult> {
        match self {
            Self::Query(result) => Some(result),
            _ => None,
        }
    }
}

/// Health of one plugin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the plugin considers itself usable.
    pub healthy: bool,
    /// Details, especially when unhealthy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Round-trip latency of the health probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl HealthStatus {
    /// A healthy status without details.
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            message: None,
            latency_ms: None,
        }
    }
}

/// Per-query context carried into every plugin call: the caller's
/// cancellation signal and an optional per-call timeout.
#[derive(Clone, Debug, Default)]
pub struct QueryContext {
    /// Cancellation signal carried through from the caller.
    pub cancellation: CancellationToken,
    /// Per-call timeout for plugin I/O.
    pub timeout: Option<Duration>,
}

impl QueryContext {
    /// A context with the given per-call timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            timeout: Some(timeout),
        }
    }
}
