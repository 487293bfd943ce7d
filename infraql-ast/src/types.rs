#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::utils::display_comma_separated;

/// Literal values such as null, boolean, number, string and lists.
///
/// Numbers keep their source text; whether a number is integer- or
/// real-valued (it contains a `.`) is decided when the literal is converted
/// to a runtime value.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Literal {
    /// `NULL` value
    Null,
    /// Boolean literal, TRUE or FALSE
    Boolean(bool),
    /// Numeric literal
    Number(String),
    /// String literal, e.g. 'production'
    String(String),
    /// A parenthesized literal list, as used by `IN (...)`
    List(Vec<Literal>),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(v) => {
                if *v {
                    f.write_str("TRUE")
                } else {
                    f.write_str("FALSE")
                }
            }
            Self::Number(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "'{}'", v),
            Self::List(items) => write!(f, "({})", display_comma_separated(items)),
        }
    }
}

impl Literal {
    /// Returns true if this numeric literal is real-valued (contains a `.`).
    pub fn is_real(&self) -> bool {
        matches!(self, Literal::Number(n) if n.contains('.'))
    }
}

/// A comparison operator usable in join constraints and predicates.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompareOp {
    /// Equal `=`
    Eq,
    /// Not equal `!=`
    NotEq,
    /// Greater than `>`
    Gt,
    /// Less than `<`
    Lt,
    /// Greater than or equal `>=`
    GtEq,
    /// Less than or equal `<=`
    LtEq,
    /// Case-insensitive substring match
    Like,
    /// List membership
    In,
    /// Inclusive range match
    Between,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::GtEq => ">=",
            Self::LtEq => "<=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Between => "BETWEEN",
        })
    }
}

/// How the conditions of a predicate block combine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Combinator {
    /// All conditions must match.
    And,
    /// Any condition may match.
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "AND",
            Self::Or => "OR",
        })
    }
}

/// An aggregate function applied to a projection item.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AggregateFunc {
    /// Row count, or count of non-null values of a column.
    Count,
    /// Numeric sum, ignoring non-numeric values.
    Sum,
    /// Numeric average over non-null values.
    Avg,
    /// Minimum by the natural ordering of the column.
    Min,
    /// Maximum by the natural ordering of the column.
    Max,
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        })
    }
}

/// The join flavour.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JoinKind {
    /// Emit only matching pairs.
    Inner,
    /// Emit every left row, null-padding the right side.
    Left,
    /// Emit every right row, null-padding the left side.
    Right,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inner => "INNER",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        })
    }
}

/// Sort direction of an `ORDER BY` key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OrderDirection {
    /// Ascending (the default).
    Asc,
    /// Descending.
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        })
    }
}

/// The catalogue listed by a `SHOW` statement.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShowTarget {
    /// All tables of all live sources.
    Tables,
    /// All registered plugins with health information.
    Plugins,
    /// The names of all registered sources.
    Sources,
}

impl fmt::Display for ShowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tables => "TABLES",
            Self::Plugins => "PLUGINS",
            Self::Sources => "SOURCES",
        })
    }
}

/// A cache-control action.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CacheAction {
    /// Report cache statistics.
    Show,
    /// Drop all entries, or the entries of one table.
    Clear,
    /// Change the default or a per-table time-to-live.
    SetTtl,
}

impl fmt::Display for CacheAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Show => "SHOW",
            Self::Clear => "CLEAR",
            Self::SetTtl => "SET TTL",
        })
    }
}
