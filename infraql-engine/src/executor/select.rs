//! The SELECT pipeline: resolve, lower, probe, fetch, join, aggregate,
//! project, order, paginate, truncate, cache.

use std::collections::HashMap;
use std::time::Instant;

use infraql_ast::{AggregateFunc, Combinator, Condition, OrderDirection, SelectColumn, SelectStmt};
use tracing::debug;

use crate::error::EngineResult;
use crate::eval;
use crate::executor::{aggregate, join, Executor};
use crate::types::{
    ColumnInfo, ColumnType, Filter, OrderSpec, QueryContext, QueryOptions, QueryResult, Row, Value,
};

impl Executor {
    pub(super) async fn execute_select(
        &self,
        stmt: &SelectStmt,
        ctx: &QueryContext,
        started: Instant,
    ) -> EngineResult<QueryResult> {
        // 1. table resolution
        let catalog = self.registry.tables_all(ctx).await;
        let base = Self::resolve_table(&catalog, &stmt.from)?.clone();
        let mut column_types = HashMap::new();
        collect_column_types(&mut column_types, &stmt.from, &base.table.columns);

        // 2. predicate lowering: the pushdown subset plus the full
        // predicate for post-fetch re-evaluation
        let filters = lower_predicate(stmt);
        let predicate = stmt.where_clause.as_ref().map(|predicate| {
            let conditions: Vec<Filter> =
                predicate.conditions.iter().map(condition_to_filter).collect();
            (conditions, predicate.combinator)
        });

        // 3. cache probe; a plan is cacheable when it has no joins, no
        // aggregates, no HAVING, and its whole predicate was pushed down
        // (otherwise the fingerprint would not capture the residual)
        let has_aggregates = stmt.columns.iter().any(|item| item.aggregate.is_some());
        let all_pushed = filters.len()
            == stmt
                .where_clause
                .as_ref()
                .map_or(0, |predicate| predicate.conditions.len());
        let cacheable =
            stmt.joins.is_empty() && !has_aggregates && stmt.having.is_none() && all_pushed;
        let options = fetch_options(stmt, self.config.default_max_results);
        if cacheable {
            if let Some(mut hit) = self.cache.get(&stmt.from, &filters, &options) {
                hit.execution_time_ms = Some(started.elapsed().as_millis() as u64);
                return Ok(hit);
            }
        }

        // 4. base fetch
        let fetched = self
            .registry
            .query(&base.source, &stmt.from, &filters, &options, ctx)
            .await?;
        let mut rows = fetched.rows;

        // 5. joins, each right-hand table fetched with empty filters
        let mut first_join = true;
        for join_clause in &stmt.joins {
            let right = Self::resolve_table(&catalog, &join_clause.table)?;
            collect_column_types(&mut column_types, &join_clause.table, &right.table.columns);
            let right_rows = self
                .registry
                .query(
                    &right.source,
                    &join_clause.table,
                    &[],
                    &QueryOptions::default(),
                    ctx,
                )
                .await?;
            rows = join::nested_loop_join(
                &rows,
                first_join.then_some(stmt.from.as_str()),
                &right_rows.rows,
                &join_clause.table,
                join_clause,
            );
            first_join = false;
        }

        // the full predicate is re-applied regardless of what the source
        // honoured
        if let Some((conditions, combinator)) = &predicate {
            rows.retain(|row| eval::matches_predicate(row, conditions, *combinator));
        }

        // 6. aggregation and HAVING
        if has_aggregates {
            rows = aggregate::aggregate_rows(&rows, stmt);
            if let Some(having) = &stmt.having {
                let conditions: Vec<Filter> =
                    having.conditions.iter().map(condition_to_filter).collect();
                rows.retain(|row| eval::matches_predicate(row, &conditions, having.combinator));
            }
        }

        // 7. projection
        let explicit = !stmt.columns.iter().any(SelectColumn::is_wildcard);
        let columns = if explicit {
            let projected = project_rows(&rows, &stmt.columns);
            rows = projected;
            projection_columns(&stmt.columns, &column_types)
        } else {
            derive_columns(&rows, &base.table.columns, &column_types)
        };

        // 8. ordering: a stable sort per key, applied in reverse so the
        // first key is the primary sort
        for key in stmt.order_by.iter().rev() {
            rows.sort_by(|a, b| {
                let ordering = compare_for_sort(
                    eval::field_value(a, &key.field),
                    eval::field_value(b, &key.field),
                );
                match key.direction {
                    OrderDirection::Asc => ordering,
                    OrderDirection::Desc => ordering.reverse(),
                }
            });
        }

        // 9. pagination
        let total_count = rows.len();
        if let Some(offset) = stmt.offset {
            let offset = (offset as usize).min(rows.len());
            rows.drain(..offset);
        }
        if let Some(limit) = stmt.limit {
            rows.truncate(limit as usize);
        }

        // 10. truncation of unbounded results
        let mut truncated = false;
        let mut warning = None;
        let cap = self.config.default_max_results;
        if stmt.limit.is_none() && rows.len() > cap {
            rows.truncate(cap);
            truncated = true;
            warning = Some(format!(
                "Result truncated to {} rows; add LIMIT/OFFSET or a narrower WHERE to page through the full set",
                cap
            ));
            debug!(table = %stmt.from, cap, "truncated unbounded result");
        }

        let result = QueryResult {
            columns,
            row_count: rows.len(),
            total_count,
            rows,
            execution_time_ms: Some(started.elapsed().as_millis() as u64),
            source: Some(base.source.clone()),
            truncated,
            warning,
        };

        // 11. record the plan's result for the next probe
        if cacheable {
            self.cache.set(&stmt.from, &filters, &options, result.clone());
        }
        Ok(result)
    }
}

/// The pushdown subset of the WHERE clause. Pushing a strict subset of an
/// OR block would drop rows the residual needs, so multi-condition OR
/// predicates are not pushed at all; conditions naming a projection alias
/// are retained for post-fetch evaluation only.
fn lower_predicate(stmt: &SelectStmt) -> Vec<Filter> {
    let predicate = match &stmt.where_clause {
        Some(predicate) => predicate,
        None => return Vec::new(),
    };
    if predicate.combinator == Combinator::Or && predicate.conditions.len() > 1 {
        return Vec::new();
    }
    let aliases: Vec<&str> = stmt
        .columns
        .iter()
        .filter_map(|item| item.alias.as_deref())
        .collect();
    predicate
        .conditions
        .iter()
        .filter(|condition| !aliases.contains(&condition.field.as_str()))
        .map(condition_to_filter)
        .collect()
}

fn condition_to_filter(condition: &Condition) -> Filter {
    Filter {
        field: condition.field.clone(),
        op: condition.op,
        value: eval::literal_to_value(&condition.value),
        second_value: condition.second_value.as_ref().map(eval::literal_to_value),
    }
}

/// The options of the base fetch: pagination, ordering and the projected
/// columns pass through; an unbounded fetch carries the truncation cap as
/// an advisory `max_results`.
fn fetch_options(stmt: &SelectStmt, default_max_results: usize) -> QueryOptions {
    let explicit = !stmt.columns.iter().any(SelectColumn::is_wildcard);
    QueryOptions {
        limit: stmt.limit,
        offset: stmt.offset,
        order_by: stmt
            .order_by
            .iter()
            .map(|key| OrderSpec {
                field: key.field.clone(),
                direction: key.direction,
            })
            .collect(),
        columns: explicit.then(|| {
            stmt.columns
                .iter()
                .map(|item| item.name.clone())
                .collect()
        }),
        max_results: stmt
            .limit
            .is_none()
            .then_some(default_max_results as u64),
    }
}

/// Rewrites each row to the projected set, with aliases as output keys.
fn project_rows(rows: &[Row], items: &[SelectColumn]) -> Vec<Row> {
    rows.iter()
        .map(|row| {
            let mut projected = Row::new();
            for item in items {
                let output = item.output_name();
                let value = match row.get(&output) {
                    Some(value) => value.clone(),
                    None => eval::field_value(row, &item.name)
                        .cloned()
                        .unwrap_or(Value::Null),
                };
                projected.insert(output, value);
            }
            projected
        })
        .collect()
}

/// Result-column metadata of an explicit projection, preserving declared
/// types where resolvable and defaulting to string.
fn projection_columns(
    items: &[SelectColumn],
    column_types: &HashMap<String, ColumnType>,
) -> Vec<ColumnInfo> {
    items
        .iter()
        .map(|item| {
            let column_type = match item.aggregate {
                Some(AggregateFunc::Count | AggregateFunc::Sum | AggregateFunc::Avg) => {
                    ColumnType::Number
                }
                Some(AggregateFunc::Min | AggregateFunc::Max) | None => {
                    lookup_type(column_types, &item.name).unwrap_or(ColumnType::String)
                }
            };
            ColumnInfo::new(item.output_name(), column_type)
        })
        .collect()
}

/// Result-column metadata of a wildcard projection, derived from the rows
/// themselves (or the base table's declared columns when there are none).
fn derive_columns(
    rows: &[Row],
    base_columns: &[ColumnInfo],
    column_types: &HashMap<String, ColumnType>,
) -> Vec<ColumnInfo> {
    match rows.first() {
        Some(first) => first
            .iter()
            .map(|(key, value)| {
                let column_type = lookup_type(column_types, key)
                    .or_else(|| infer_type(value))
                    .unwrap_or(ColumnType::String);
                ColumnInfo::new(key.clone(), column_type)
            })
            .collect(),
        None => base_columns.to_vec(),
    }
}

fn collect_column_types(
    column_types: &mut HashMap<String, ColumnType>,
    table: &str,
    columns: &[ColumnInfo],
) {
    for column in columns {
        column_types.insert(format!("{}.{}", table, column.name), column.column_type);
        column_types
            .entry(column.name.clone())
            .or_insert(column.column_type);
    }
}

fn lookup_type(column_types: &HashMap<String, ColumnType>, field: &str) -> Option<ColumnType> {
    column_types.get(field).copied().or_else(|| {
        field
            .rsplit_once('.')
            .and_then(|(_, column)| column_types.get(column).copied())
    })
}

fn infer_type(value: &Value) -> Option<ColumnType> {
    match value {
        Value::Number(_) => Some(ColumnType::Number),
        Value::Bool(_) => Some(ColumnType::Boolean),
        Value::String(_) => Some(ColumnType::String),
        Value::Array(_) => Some(ColumnType::Array),
        Value::Object(_) => Some(ColumnType::Object),
        Value::Null => None,
    }
}

/// Row ordering for ORDER BY: values compare per the engine's comparison
/// semantics, and null (or missing) fields sort last in ascending order.
fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) if !a.is_null() && !b.is_null() => eval::compare_values(a, b),
        (Some(a), _) if !a.is_null() => Ordering::Less,
        (_, Some(b)) if !b.is_null() => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
