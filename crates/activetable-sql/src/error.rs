//! Error types for SQL generation.

use thiserror::Error;

/// Errors raised while validating or rendering a query.
///
/// All of these are local validation failures: they are detected before any
/// SQL text is handed back, so a caller never sees a partial statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    /// Predicate operator outside the supported set.
    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    /// `IN` / `NOT IN` with no values.
    #[error("attempting to do IN on {table}.{column} with no data")]
    EmptyInList {
        /// Table the predicate targets.
        table: String,
        /// Column the predicate targets.
        column: String,
    },

    /// Join type other than `inner` or `left`.
    #[error("unknown join type '{0}'")]
    UnknownJoinType(String),

    /// Both an explicit row limit and a slice were requested.
    #[error("a row limit has been set for this query; cannot also return a slice")]
    ConflictingPagination,

    /// The dialect cannot express the requested feature.
    #[error("{feature} is not supported by the {dialect} dialect")]
    UnsupportedDialectFeature {
        /// Dialect name.
        dialect: &'static str,
        /// What was asked for.
        feature: String,
    },

    /// A lookup joins back onto the primary table.
    #[error("cannot join table '{0}' onto itself")]
    SelfJoinUnsupported(String),

    /// Two joins reference their tables by the same alias.
    #[error("join alias '{0}' is used more than once")]
    DuplicateJoinAlias(String),

    /// Slice bounds out of order.
    #[error("invalid slice [{start}, {end}): start must be below end")]
    InvalidSlice {
        /// Inclusive start.
        start: u64,
        /// Exclusive end.
        end: u64,
    },

    /// Nothing to select.
    #[error("query selects no columns")]
    EmptyProjection,

    /// An ORDER BY column has no positional alias to order the outer levels of a slice by.
    #[error("order column {table}.{column} is not part of the selected columns")]
    OrderColumnNotProjected {
        /// Table of the order column.
        table: String,
        /// Name of the order column.
        column: String,
    },

    /// Operator used with a value of the wrong shape.
    #[error("operator {operator} expects {expected}")]
    ValueMismatch {
        /// The operator.
        operator: String,
        /// Shape of value the operator accepts.
        expected: &'static str,
    },

    /// Search type that cannot be translated into an operator.
    #[error("invalid search type: {0}")]
    InvalidSearchType(String),

    /// Driver name that maps to no dialect.
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),

    /// Statement verb other than SELECT.
    #[error("unsupported verb: {0}")]
    UnsupportedVerb(String),

    /// Column or alias referencing a join position that does not exist.
    #[error("no join at position {0}")]
    UnknownJoinIndex(usize),

    /// Result column that is not a positional alias of this query.
    #[error("unknown column alias: {0}")]
    UnknownAlias(String),
}

impl GenError {
    /// Creates an unsupported-feature error.
    #[must_use]
    pub fn unsupported(dialect: &'static str, feature: impl Into<String>) -> Self {
        Self::UnsupportedDialectFeature {
            dialect,
            feature: feature.into(),
        }
    }
}

/// Result type alias for SQL generation.
pub type Result<T> = std::result::Result<T, GenError>;
