//! Grouping and aggregation over in-memory row sets.

use std::collections::HashMap;

use infraql_ast::{AggregateFunc, SelectStmt};
use serde_json::Number;

use crate::eval;
use crate::types::{Row, Value};

/// Groups and aggregates rows according to the statement's projection.
///
/// With `GROUP BY`, one output row is emitted per group in first-seen
/// order; without it a single row with only the aggregate values. Each
/// aggregate lands under its alias or `AGG(column)`. Non-aggregated,
/// non-grouped projections are filled from the group's first row (the
/// permissive behaviour SQL would reject).
pub(crate) fn aggregate_rows(rows: &[Row], stmt: &SelectStmt) -> Vec<Row> {
    let groups = group_rows(rows, &stmt.group_by);
    let mut output = Vec::with_capacity(groups.len());
    for group in groups {
        let mut out = Row::new();
        if let Some(first) = group.first() {
            for field in &stmt.group_by {
                let value = eval::field_value(first, field).cloned().unwrap_or(Value::Null);
                out.insert(field.clone(), value);
            }
        }
        for item in &stmt.columns {
            match item.aggregate {
                Some(func) => {
                    out.insert(item.output_name(), compute(func, &group, &item.name));
                }
                None => {
                    if item.is_wildcard() || stmt.group_by.contains(&item.name) {
                        continue;
                    }
                    // first-row semantics for non-grouped plain projections
                    if let Some(first) = group.first() {
                        let value =
                            eval::field_value(first, &item.name).cloned().unwrap_or(Value::Null);
                        out.insert(item.name.clone(), value);
                    }
                }
            }
        }
        output.push(out);
    }
    output
}

/// Partitions rows by the composite grouping key, preserving first-seen
/// group order. Without grouping keys, all rows form one group (even when
/// there are none, so plain aggregates emit exactly one row).
fn group_rows<'a>(rows: &'a [Row], group_by: &[String]) -> Vec<Vec<&'a Row>> {
    if group_by.is_empty() {
        return vec![rows.iter().collect()];
    }
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<&Row>> = Vec::new();
    for row in rows {
        let key = group_by
            .iter()
            .map(|field| match eval::field_value(row, field) {
                Some(value) => eval::value_text(value),
                None => "NULL".to_string(),
            })
            .collect::<Vec<_>>()
            .join("|");
        match index.get(&key) {
            Some(&slot) => groups[slot].push(row),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![row]);
            }
        }
    }
    groups
}

fn compute(func: AggregateFunc, group: &[&Row], field: &str) -> Value {
    match func {
        AggregateFunc::Count => {
            if field == "*" {
                Value::from(group.len() as u64)
            } else {
                let count = group
                    .iter()
                    .filter(|row| {
                        eval::field_value(row, field).map_or(false, |value| !value.is_null())
                    })
                    .count();
                Value::from(count as u64)
            }
        }
        AggregateFunc::Sum => sum(group, field),
        AggregateFunc::Avg => {
            let (total, count) = numeric_fold(group, field);
            if count == 0 {
                Value::Null
            } else {
                Number::from_f64(total / count as f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        AggregateFunc::Min => extreme(group, field, std::cmp::Ordering::Less),
        AggregateFunc::Max => extreme(group, field, std::cmp::Ordering::Greater),
    }
}

/// SUM ignores non-numeric values and stays integer-valued as long as every
/// summed value is an integer; an empty input sums to 0.
fn sum(group: &[&Row], field: &str) -> Value {
    let mut int_sum: i64 = 0;
    let mut float_sum = 0.0f64;
    let mut real = false;
    for row in group {
        match eval::field_value(row, field) {
            Some(Value::Number(number)) => {
                if let Some(int) = number.as_i64() {
                    int_sum = int_sum.wrapping_add(int);
                    float_sum += int as f64;
                } else if let Some(float) = number.as_f64() {
                    real = true;
                    float_sum += float;
                }
            }
            _ => {}
        }
    }
    if real {
        Number::from_f64(float_sum).map(Value::Number).unwrap_or(Value::Null)
    } else {
        Value::from(int_sum)
    }
}

fn numeric_fold(group: &[&Row], field: &str) -> (f64, usize) {
    let mut total = 0.0;
    let mut count = 0;
    for row in group {
        if let Some(value) = eval::field_value(row, field) {
            if let Some(number) = value.as_f64() {
                total += number;
                count += 1;
            }
        }
    }
    (total, count)
}

/// MIN/MAX by the natural ordering of the column's scalar type, skipping
/// nulls.
fn extreme(group: &[&Row], field: &str, keep: std::cmp::Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for row in group {
        let value = match eval::field_value(row, field) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        best = match best {
            None => Some(value),
            Some(current) => {
                if eval::compare_values(value, current) == keep {
                    Some(value)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use infraql_ast::SelectColumn;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        [
            json!({"status": "active", "replicas": 2, "name": "a"}),
            json!({"status": "active", "replicas": 3, "name": "b"}),
            json!({"status": "degraded", "replicas": 1, "name": "c"}),
            json!({"status": "degraded", "replicas": null, "name": "d"}),
        ]
        .into_iter()
        .map(|value| match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => unreachable!(),
        })
        .collect()
    }

    fn stmt(columns: Vec<SelectColumn>, group_by: Vec<String>) -> SelectStmt {
        SelectStmt {
            columns,
            from: "services".to_string(),
            joins: vec![],
            where_clause: None,
            group_by,
            having: None,
            order_by: vec![],
            limit: None,
            offset: None,
        }
    }

    fn agg(func: AggregateFunc, name: &str, alias: Option<&str>) -> SelectColumn {
        SelectColumn {
            name: name.to_string(),
            alias: alias.map(str::to_string),
            aggregate: Some(func),
        }
    }

    #[test]
    fn count_star_counts_all_rows_per_group() {
        let out = aggregate_rows(
            &rows(),
            &stmt(
                vec![
                    SelectColumn::plain("status"),
                    agg(AggregateFunc::Count, "*", Some("count")),
                ],
                vec!["status".to_string()],
            ),
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["status"], json!("active"));
        assert_eq!(out[0]["count"], json!(2));
        assert_eq!(out[1]["status"], json!("degraded"));
        assert_eq!(out[1]["count"], json!(2));
    }

    #[test]
    fn count_column_skips_nulls() {
        let out = aggregate_rows(
            &rows(),
            &stmt(
                vec![agg(AggregateFunc::Count, "replicas", Some("n"))],
                vec![],
            ),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["n"], json!(3));
    }

    #[test]
    fn sum_stays_integer_for_integer_inputs() {
        let out = aggregate_rows(
            &rows(),
            &stmt(vec![agg(AggregateFunc::Sum, "replicas", Some("s"))], vec![]),
        );
        assert_eq!(out[0]["s"], json!(6));
    }

    #[test]
    fn avg_is_sum_over_nonnull_count() {
        let out = aggregate_rows(
            &rows(),
            &stmt(vec![agg(AggregateFunc::Avg, "replicas", Some("avg"))], vec![]),
        );
        assert_eq!(out[0]["avg"], json!(2.0));
    }

    #[test]
    fn min_max_use_natural_ordering_and_skip_nulls() {
        let out = aggregate_rows(
            &rows(),
            &stmt(
                vec![
                    agg(AggregateFunc::Min, "replicas", Some("lo")),
                    agg(AggregateFunc::Max, "replicas", Some("hi")),
                    agg(AggregateFunc::Min, "name", Some("first")),
                ],
                vec![],
            ),
        );
        assert_eq!(out[0]["lo"], json!(1));
        assert_eq!(out[0]["hi"], json!(3));
        assert_eq!(out[0]["first"], json!("a"));
    }

    #[test]
    fn unaliased_aggregates_land_under_their_call_form() {
        let out = aggregate_rows(
            &rows(),
            &stmt(vec![agg(AggregateFunc::Count, "*", None)], vec![]),
        );
        assert_eq!(out[0]["COUNT(*)"], json!(4));
    }

    #[test]
    fn empty_input_still_emits_one_row_of_plain_aggregates() {
        let out = aggregate_rows(
            &[],
            &stmt(
                vec![
                    agg(AggregateFunc::Count, "*", Some("n")),
                    agg(AggregateFunc::Sum, "replicas", Some("s")),
                    agg(AggregateFunc::Avg, "replicas", Some("a")),
                ],
                vec![],
            ),
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["n"], json!(0));
        assert_eq!(out[0]["s"], json!(0));
        assert_eq!(out[0]["a"], Value::Null);
    }

    #[test]
    fn nongrouped_plain_projections_take_the_first_row() {
        let out = aggregate_rows(
            &rows(),
            &stmt(
                vec![
                    SelectColumn::plain("name"),
                    agg(AggregateFunc::Count, "*", Some("n")),
                ],
                vec!["status".to_string()],
            ),
        );
        assert_eq!(out[0]["name"], json!("a"));
        assert_eq!(out[1]["name"], json!("c"));
    }
}
