//! In-memory nested-loop joins over fetched row sets.

use std::collections::BTreeSet;

use infraql_ast::{Join, JoinKind};

use crate::eval;
use crate::types::{Row, Value};

/// Joins two row sets, preserving the outer relation's emission order.
///
/// Merged rows carry the qualified `table.column` keys of every table seen
/// so far plus the unqualified keys, where the left-hand side wins
/// unqualified collisions. `left_qualify` names the base table on the first
/// join (whose rows are still unqualified); later joins pass `None` since
/// their left rows are already merged.
pub(crate) fn nested_loop_join(
    left_rows: &[Row],
    left_qualify: Option<&str>,
    right_rows: &[Row],
    right_table: &str,
    join: &Join,
) -> Vec<Row> {
    let left_keys = key_union(left_rows);
    let right_keys = key_union(right_rows);
    let mut merged = Vec::new();

    match join.kind {
        JoinKind::Inner => {
            for left in left_rows {
                for right in right_rows {
                    if on_matches(left, left_qualify, right, right_table, join) {
                        merged.push(merge_rows(
                            Some(left),
                            left_qualify,
                            &left_keys,
                            Some(right),
                            right_table,
                            &right_keys,
                        ));
                    }
                }
            }
        }
        JoinKind::Left => {
            for left in left_rows {
                let mut matched = false;
                for right in right_rows {
                    if on_matches(left, left_qualify, right, right_table, join) {
                        matched = true;
                        merged.push(merge_rows(
                            Some(left),
                            left_qualify,
                            &left_keys,
                            Some(right),
                            right_table,
                            &right_keys,
                        ));
                    }
                }
                if !matched {
                    merged.push(merge_rows(
                        Some(left),
                        left_qualify,
                        &left_keys,
                        None,
                        right_table,
                        &right_keys,
                    ));
                }
            }
        }
        JoinKind::Right => {
            for right in right_rows {
                let mut matched = false;
                for left in left_rows {
                    if on_matches(left, left_qualify, right, right_table, join) {
                        matched = true;
                        merged.push(merge_rows(
                            Some(left),
                            left_qualify,
                            &left_keys,
                            Some(right),
                            right_table,
                            &right_keys,
                        ));
                    }
                }
                if !matched {
                    merged.push(merge_rows(
                        None,
                        left_qualify,
                        &left_keys,
                        Some(right),
                        right_table,
                        &right_keys,
                    ));
                }
            }
        }
    }
    merged
}

fn key_union(rows: &[Row]) -> BTreeSet<String> {
    rows.iter()
        .flat_map(|row| row.keys().cloned())
        .collect()
}

/// Evaluates the `ON` constraint for one candidate pair. Null (or missing)
/// fields never match.
fn on_matches(
    left: &Row,
    left_qualify: Option<&str>,
    right: &Row,
    right_table: &str,
    join: &Join,
) -> bool {
    let left_value = side_field_value(left, &join.on.left_field, left_qualify);
    let right_value = side_field_value(right, &join.on.right_field, Some(right_table));
    match (left_value, right_value) {
        (Some(l), Some(r)) if !l.is_null() && !r.is_null() => {
            eval::compare_with_op(l, join.on.op, r)
        }
        _ => false,
    }
}

/// Resolves an `ON` field against one side. `t.c` looks up `c` when `t` is
/// this side's own table, otherwise the qualified key of an earlier join.
fn side_field_value<'a>(row: &'a Row, field: &str, own_table: Option<&str>) -> Option<&'a Value> {
    if let Some((table, column)) = field.split_once('.') {
        if own_table == Some(table) {
            return row.get(column).or_else(|| row.get(field));
        }
        return row.get(field).or_else(|| row.get(column));
    }
    row.get(field)
}

fn merge_rows(
    left: Option<&Row>,
    left_qualify: Option<&str>,
    left_keys: &BTreeSet<String>,
    right: Option<&Row>,
    right_table: &str,
    right_keys: &BTreeSet<String>,
) -> Row {
    let mut merged = Row::new();

    // qualified keys of the left-hand side
    match left {
        Some(row) => {
            for (key, value) in row {
                if key.contains('.') {
                    merged.insert(key.clone(), value.clone());
                } else if let Some(table) = left_qualify {
                    merged.insert(format!("{}.{}", table, key), value.clone());
                }
            }
        }
        None => {
            for key in left_keys {
                if key.contains('.') {
                    merged.insert(key.clone(), Value::Null);
                } else if let Some(table) = left_qualify {
                    merged.insert(format!("{}.{}", table, key), Value::Null);
                }
            }
        }
    }

    // qualified keys of the right-hand side
    match right {
        Some(row) => {
            for (key, value) in row {
                if !key.contains('.') {
                    merged.insert(format!("{}.{}", right_table, key), value.clone());
                }
            }
        }
        None => {
            for key in right_keys {
                if !key.contains('.') {
                    merged.insert(format!("{}.{}", right_table, key), Value::Null);
                }
            }
        }
    }

    // unqualified keys: the left-hand side wins collisions
    match left {
        Some(row) => {
            for (key, value) in row {
                if !key.contains('.') {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        None => {
            for key in left_keys {
                if !key.contains('.') {
                    merged.insert(key.clone(), Value::Null);
                }
            }
        }
    }
    match right {
        Some(row) => {
            for (key, value) in row {
                if !key.contains('.') {
                    merged.entry(key.clone()).or_insert_with(|| value.clone());
                }
            }
        }
        None => {
            for key in right_keys {
                if !key.contains('.') {
                    merged.entry(key.clone()).or_insert(Value::Null);
                }
            }
        }
    }

    merged
}
