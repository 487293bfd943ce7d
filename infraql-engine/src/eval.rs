//! Comparison semantics shared by the executor and by sources that honour
//! filter pushdown.

use std::cmp::Ordering;

use infraql_ast::{Combinator, CompareOp, Literal};

use crate::types::{Filter, Row, Value};

/// Converts a parsed literal into a runtime value. Numeric literals
/// containing a `.` become real-valued, the rest integer-valued.
pub(crate) fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Number(text) => {
            if text.contains('.') {
                match text.parse::<f64>() {
                    Ok(real) => serde_json::Number::from_f64(real)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    Err(_) => Value::String(text.clone()),
                }
            } else {
                match text.parse::<i64>() {
                    Ok(int) => Value::Number(int.into()),
                    Err(_) => Value::String(text.clone()),
                }
            }
        }
        Literal::List(items) => Value::Array(items.iter().map(literal_to_value).collect()),
    }
}

/// Resolves a possibly-qualified field name against a row.
///
/// Merged join rows carry both `table.column` and bare keys, so an exact
/// lookup is tried first; a qualified name falls back to its bare column so
/// `services.id` still resolves against an unjoined base row.
pub(crate) fn field_value<'a>(row: &'a Row, field: &str) -> Option<&'a Value> {
    if let Some(value) = row.get(field) {
        return Some(value);
    }
    field
        .rsplit_once('.')
        .and_then(|(_, column)| row.get(column))
}

/// Applies a predicate block to a row: AND requires every condition, OR any.
pub(crate) fn matches_predicate(row: &Row, filters: &[Filter], combinator: Combinator) -> bool {
    match combinator {
        Combinator::And => filters.iter().all(|filter| matches_filter(row, filter)),
        Combinator::Or => filters.iter().any(|filter| matches_filter(row, filter)),
    }
}

/// Applies one condition to a row. Null (or a missing field) never compares
/// equal to anything, so every operator fails on it.
pub(crate) fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let value = match field_value(row, &filter.field) {
        Some(value) if !value.is_null() => value,
        _ => return false,
    };
    match filter.op {
        CompareOp::Eq
        | CompareOp::NotEq
        | CompareOp::Gt
        | CompareOp::Lt
        | CompareOp::GtEq
        | CompareOp::LtEq => compare_with_op(value, filter.op, &filter.value),
        CompareOp::Like => like_match(value, &filter.value),
        CompareOp::In => match &filter.value {
            Value::Array(items) => items.iter().any(|item| item == value),
            _ => false,
        },
        CompareOp::Between => match &filter.second_value {
            Some(upper) => {
                compare_values(value, &filter.value) != Ordering::Less
                    && compare_values(value, upper) != Ordering::Greater
            }
            None => false,
        },
    }
}

/// Applies one of the ordering operators to a pair of values.
///
/// LIKE/IN/BETWEEN take a predicate context and are handled by
/// [`matches_filter`]; this covers the operators a join constraint allows.
pub(crate) fn compare_with_op(left: &Value, op: CompareOp, right: &Value) -> bool {
    let ordering = compare_values(left, right);
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::GtEq => ordering != Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Like | CompareOp::In | CompareOp::Between => false,
    }
}

/// Orders two values: numerically when both sides are numeric, otherwise
/// lexicographically on the string form.
pub(crate) fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => value_text(left).cmp(&value_text(right)),
    }
}

/// Case-insensitive substring match; `%` at either end of the pattern is
/// treated as the usual wildcard and stripped.
fn like_match(value: &Value, pattern: &Value) -> bool {
    let haystack = value_text(value).to_lowercase();
    let needle = value_text(pattern).to_lowercase();
    let needle = needle.trim_matches('%');
    haystack.contains(needle)
}

/// The string form of a value, as used for grouping keys and lexicographic
/// comparison. Strings render unquoted.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
