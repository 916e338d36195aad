//! WHERE predicates.
//!
//! A [`Predicate`] renders to one [`Fragment`]: the SQL text of a single
//! condition plus the values for its placeholders, in placeholder order.
//! Predicates only ever combine by conjunction; there is no OR and no
//! grouping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::dialect::Dialect;
use crate::error::{GenError, Result};
use crate::value::{SqlValue, ToSqlValue};

/// Predicate operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
    /// `LIKE` (`ILIKE` on PostgreSQL)
    Like,
    /// `NOT LIKE` (`NOT ILIKE` on PostgreSQL)
    NotLike,
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,
}

impl Operator {
    /// Returns the operator as written in SQL.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// Returns true for the six scalar comparisons.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Operator {
    type Err = GenError;

    /// Accepts SQL spellings (`NOT IN`, `<>`) and tag names (`not_in`, `is_not`).
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "=" | "eq" | "equal" => Ok(Self::Eq),
            "<>" | "!=" | "ne" => Ok(Self::Ne),
            "<" | "lt" => Ok(Self::Lt),
            "<=" | "lte" => Ok(Self::Le),
            ">" | "gt" => Ok(Self::Gt),
            ">=" | "gte" => Ok(Self::Ge),
            "in" => Ok(Self::In),
            "not in" | "not_in" => Ok(Self::NotIn),
            "like" => Ok(Self::Like),
            "not like" | "not_like" => Ok(Self::NotLike),
            "is null" | "is" => Ok(Self::IsNull),
            "is not null" | "is_not" => Ok(Self::IsNotNull),
            _ => Err(GenError::InvalidOperator(s.to_string())),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = GenError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Operator> for &'static str {
    fn from(op: Operator) -> Self {
        op.as_sql()
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateValue {
    /// No value (`IS NULL` / `IS NOT NULL`).
    #[default]
    Null,
    /// A list of values (`IN` / `NOT IN`).
    List(Vec<SqlValue>),
    /// A single value.
    Scalar(SqlValue),
}

impl PredicateValue {
    /// Wraps a single value. A NULL scalar collapses to [`PredicateValue::Null`].
    #[must_use]
    pub fn scalar<T: ToSqlValue>(value: T) -> Self {
        match value.to_sql_value() {
            SqlValue::Null => Self::Null,
            value => Self::Scalar(value),
        }
    }

    /// Wraps a list of values.
    #[must_use]
    pub fn list<T: ToSqlValue>(values: impl IntoIterator<Item = T>) -> Self {
        Self::List(values.into_iter().map(ToSqlValue::to_sql_value).collect())
    }

    fn normalized(self) -> Self {
        match self {
            Self::Scalar(SqlValue::Null) => Self::Null,
            other => other,
        }
    }
}

/// One condition on a column: `table.column OP value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    /// Table (or join alias) the column belongs to.
    pub table: String,
    /// Column name.
    pub column: String,
    /// Operator.
    pub operator: Operator,
    /// Value to compare against.
    #[serde(default)]
    pub value: PredicateValue,
}

impl Predicate {
    /// Creates a predicate.
    #[must_use]
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        operator: Operator,
        value: PredicateValue,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            operator,
            value: value.normalized(),
        }
    }

    /// `table.column = value`
    #[must_use]
    pub fn eq<T: ToSqlValue>(table: &str, column: &str, value: T) -> Self {
        Self::new(table, column, Operator::Eq, PredicateValue::scalar(value))
    }

    /// `table.column <> value`
    #[must_use]
    pub fn ne<T: ToSqlValue>(table: &str, column: &str, value: T) -> Self {
        Self::new(table, column, Operator::Ne, PredicateValue::scalar(value))
    }

    /// `table.column < value`
    #[must_use]
    pub fn lt<T: ToSqlValue>(table: &str, column: &str, value: T) -> Self {
        Self::new(table, column, Operator::Lt, PredicateValue::scalar(value))
    }

    /// `table.column <= value`
    #[must_use]
    pub fn le<T: ToSqlValue>(table: &str, column: &str, value: T) -> Self {
        Self::new(table, column, Operator::Le, PredicateValue::scalar(value))
    }

    /// `table.column > value`
    #[must_use]
    pub fn gt<T: ToSqlValue>(table: &str, column: &str, value: T) -> Self {
        Self::new(table, column, Operator::Gt, PredicateValue::scalar(value))
    }

    /// `table.column >= value`
    #[must_use]
    pub fn ge<T: ToSqlValue>(table: &str, column: &str, value: T) -> Self {
        Self::new(table, column, Operator::Ge, PredicateValue::scalar(value))
    }

    /// `table.column IN (...)`
    #[must_use]
    pub fn in_list<T: ToSqlValue>(table: &str, column: &str, values: Vec<T>) -> Self {
        Self::new(table, column, Operator::In, PredicateValue::list(values))
    }

    /// `table.column NOT IN (...)`
    #[must_use]
    pub fn not_in<T: ToSqlValue>(table: &str, column: &str, values: Vec<T>) -> Self {
        Self::new(table, column, Operator::NotIn, PredicateValue::list(values))
    }

    /// `table.column LIKE pattern`
    #[must_use]
    pub fn like(table: &str, column: &str, pattern: &str) -> Self {
        Self::new(table, column, Operator::Like, PredicateValue::scalar(pattern))
    }

    /// `table.column NOT LIKE pattern`
    #[must_use]
    pub fn not_like(table: &str, column: &str, pattern: &str) -> Self {
        Self::new(table, column, Operator::NotLike, PredicateValue::scalar(pattern))
    }

    /// `table.column IS NULL`
    #[must_use]
    pub fn is_null(table: &str, column: &str) -> Self {
        Self::new(table, column, Operator::IsNull, PredicateValue::Null)
    }

    /// `table.column IS NOT NULL`
    #[must_use]
    pub fn is_not_null(table: &str, column: &str) -> Self {
        Self::new(table, column, Operator::IsNotNull, PredicateValue::Null)
    }

    /// Translates a finder search descriptor into a predicate.
    ///
    /// `search_type` is one of `=`, `<>`, `<`, `<=`, `>`, `>=`. A list value
    /// turns `=` into `IN` and `<>` into `NOT IN`; a null value turns `=` into
    /// `IS NULL` and `<>` into `IS NOT NULL`.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidSearchType`] for any other search type, or
    /// for a list or null paired with an ordering comparison.
    pub fn from_search(
        table: &str,
        column: &str,
        search_type: &str,
        value: PredicateValue,
    ) -> Result<Self> {
        let base = search_type
            .parse::<Operator>()
            .ok()
            .filter(|op| op.is_comparison())
            .ok_or_else(|| GenError::InvalidSearchType(search_type.to_string()))?;

        let value = value.normalized();
        let operator = match (&value, base) {
            (PredicateValue::List(_), Operator::Eq) => Operator::In,
            (PredicateValue::List(_), Operator::Ne) => Operator::NotIn,
            (PredicateValue::Null, Operator::Eq) => Operator::IsNull,
            (PredicateValue::Null, Operator::Ne) => Operator::IsNotNull,
            (PredicateValue::List(_), _) => {
                return Err(GenError::InvalidSearchType(format!(
                    "{search_type} with a list of values; valid values are = and <>"
                )));
            }
            (PredicateValue::Null, _) => {
                return Err(GenError::InvalidSearchType(format!(
                    "{search_type} with a null value; valid values are = and <>"
                )));
            }
            (PredicateValue::Scalar(_), op) => op,
        };

        Ok(Self::new(table, column, operator, value))
    }

    fn mismatch(&self, expected: &'static str) -> GenError {
        GenError::ValueMismatch {
            operator: self.operator.to_string(),
            expected,
        }
    }
}

/// A rendered SQL fragment and the values for its placeholders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// SQL text containing one `?` per bind.
    pub sql: String,
    /// Bind values in placeholder order.
    pub binds: Vec<SqlValue>,
}

impl Fragment {
    /// Creates a fragment.
    #[must_use]
    pub fn new(sql: impl Into<String>, binds: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            binds,
        }
    }

    /// Joins fragments with `AND`, keeping their order and their binds' order.
    #[must_use]
    pub fn conjunction(fragments: Vec<Self>) -> Self {
        let mut sql = Vec::with_capacity(fragments.len());
        let mut binds = Vec::new();
        for fragment in fragments {
            sql.push(fragment.sql);
            binds.extend(fragment.binds);
        }
        Self {
            sql: sql.join("\nAND "),
            binds,
        }
    }
}

/// Renders one predicate for `dialect`.
///
/// On dialects with a magic primary key, a predicate on that key compares
/// against `CHARTOROWID(?)` instead of a bare placeholder.
///
/// # Errors
///
/// - [`GenError::EmptyInList`] for `IN` / `NOT IN` with no values.
/// - [`GenError::ValueMismatch`] when the value shape does not fit the operator.
pub fn build_predicate(dialect: Dialect, predicate: &Predicate) -> Result<Fragment> {
    let magic = dialect.is_magic_primary_key(&predicate.column);
    let target = if magic {
        dialect
            .magic_primary_key_target(&predicate.table)
            .unwrap_or_else(|| dialect.qualify(&predicate.table, &predicate.column))
    } else {
        dialect.qualify(&predicate.table, &predicate.column)
    };
    let placeholder = if magic { "CHARTOROWID(?)" } else { "?" };

    let op = predicate.operator;
    let fragment = match op {
        Operator::Eq
        | Operator::Ne
        | Operator::Lt
        | Operator::Le
        | Operator::Gt
        | Operator::Ge => match &predicate.value {
            PredicateValue::Scalar(value) => Fragment::new(
                format!("{target} {op} {placeholder}"),
                vec![value.clone()],
            ),
            PredicateValue::Null | PredicateValue::List(_) => {
                return Err(predicate.mismatch("a single non-null value"));
            }
        },
        Operator::In | Operator::NotIn => match &predicate.value {
            PredicateValue::List(values) if values.is_empty() => {
                return Err(GenError::EmptyInList {
                    table: predicate.table.clone(),
                    column: predicate.column.clone(),
                });
            }
            PredicateValue::List(values) => {
                let placeholders = vec![placeholder; values.len()].join(",");
                Fragment::new(
                    format!("{target} {op} ({placeholders})"),
                    values.clone(),
                )
            }
            PredicateValue::Null | PredicateValue::Scalar(_) => {
                return Err(predicate.mismatch("a list of values"));
            }
        },
        Operator::Like | Operator::NotLike => match &predicate.value {
            PredicateValue::Scalar(value) => {
                let keyword = dialect.like_keyword(op == Operator::NotLike);
                Fragment::new(format!("{target} {keyword} ?"), vec![value.clone()])
            }
            PredicateValue::Null | PredicateValue::List(_) => {
                return Err(predicate.mismatch("a single pattern"));
            }
        },
        Operator::IsNull | Operator::IsNotNull => match &predicate.value {
            PredicateValue::Null => Fragment::new(format!("{target} {op}"), vec![]),
            PredicateValue::Scalar(_) | PredicateValue::List(_) => {
                return Err(predicate.mismatch("no value"));
            }
        },
    };

    trace!(dialect = %dialect, fragment = %fragment.sql, binds = fragment.binds.len(), "predicate");
    Ok(fragment)
}

/// Renders predicates in order. [`Fragment::conjunction`] ANDs them together.
///
/// # Errors
///
/// Fails on the first predicate [`build_predicate`] rejects.
pub fn build_predicates(dialect: Dialect, predicates: &[Predicate]) -> Result<Vec<Fragment>> {
    predicates
        .iter()
        .map(|predicate| build_predicate(dialect, predicate))
        .collect()
}
