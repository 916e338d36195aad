//! Lookup-table joins.
//!
//! Dialects with ANSI syntax get an `INNER JOIN` / `LEFT JOIN` clause. Legacy
//! Oracle has neither: the lookup table is appended to the FROM list and the
//! join condition moves into WHERE, with `(+)` marking the optional side of an
//! outer join.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::dialect::Dialect;
use crate::error::{GenError, Result};
use crate::predicate::{build_predicates, Fragment, Predicate};
use crate::spec::TableRef;

/// How a lookup table is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum JoinType {
    /// Rows without a match are dropped.
    Inner,
    /// Rows without a match are kept with NULL lookup columns.
    Left,
}

impl JoinType {
    /// Returns the tag name (`inner` / `left`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
        }
    }

    /// Returns the ANSI join keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinType {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inner" => Ok(Self::Inner),
            "left" => Ok(Self::Left),
            _ => Err(GenError::UnknownJoinType(s.to_string())),
        }
    }
}

impl TryFrom<String> for JoinType {
    type Error = GenError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<JoinType> for &'static str {
    fn from(join_type: JoinType) -> Self {
        join_type.as_str()
    }
}

/// A lookup table joined onto the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Table already available to the query that holds the local key.
    pub local_table: String,
    /// Key column in the local table.
    pub local_key: String,
    /// Table being joined to.
    pub foreign_table: String,
    /// Alias for the joined table; defaults to its name.
    #[serde(default)]
    pub foreign_table_alias: Option<String>,
    /// Key column in the joined table.
    pub foreign_key: String,
    /// Join type.
    pub join_type: JoinType,
    /// Database or schema the joined table lives in.
    #[serde(default)]
    pub database: Option<String>,
    /// Extra conditions on the joined table, ANDed into WHERE.
    #[serde(default)]
    pub filter: Vec<Predicate>,
}

impl JoinSpec {
    /// Creates a join of `foreign_table.foreign_key` onto `local_table.local_key`.
    #[must_use]
    pub fn new(
        join_type: JoinType,
        local_table: impl Into<String>,
        local_key: impl Into<String>,
        foreign_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            local_table: local_table.into(),
            local_key: local_key.into(),
            foreign_table: foreign_table.into(),
            foreign_table_alias: None,
            foreign_key: foreign_key.into(),
            join_type,
            database: None,
            filter: vec![],
        }
    }

    /// Creates an inner join.
    #[must_use]
    pub fn inner(
        local_table: impl Into<String>,
        local_key: impl Into<String>,
        foreign_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(JoinType::Inner, local_table, local_key, foreign_table, foreign_key)
    }

    /// Creates a left (outer) join.
    #[must_use]
    pub fn left(
        local_table: impl Into<String>,
        local_key: impl Into<String>,
        foreign_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(JoinType::Left, local_table, local_key, foreign_table, foreign_key)
    }

    /// Sets the alias, needed to join the same table more than once.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.foreign_table_alias = Some(alias.into());
        self
    }

    /// Sets the database or schema of the joined table.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Adds a filter predicate on the joined table.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter.push(predicate);
        self
    }

    /// Returns the alias the joined table is referenced by.
    #[must_use]
    pub fn foreign_alias(&self) -> &str {
        self.foreign_table_alias
            .as_deref()
            .unwrap_or(&self.foreign_table)
    }

    /// True when the lookup is `table` itself or is aliased as `table`.
    #[must_use]
    pub fn targets(&self, table: &str) -> bool {
        self.foreign_table.eq_ignore_ascii_case(table)
            || self.foreign_alias().eq_ignore_ascii_case(table)
    }
}

/// Where a rendered join lands in the statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinClause {
    /// A clause following FROM: `INNER JOIN t a ON ...`.
    Native(String),
    /// Legacy Oracle: an extra FROM item and a WHERE condition.
    Legacy {
        /// `table alias`, appended to the FROM list.
        from_item: String,
        /// `local.key = alias.key`, with ` (+)` for outer joins.
        condition: String,
    },
}

/// A rendered join and its filter conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinFragment {
    /// The join itself.
    pub clause: JoinClause,
    /// Rendered filter predicates, in declaration order.
    pub filter: Vec<Fragment>,
}

/// Renders one join for `dialect`.
///
/// # Errors
///
/// - [`GenError::SelfJoinUnsupported`] when the lookup is the primary table
///   or is aliased with its name.
/// - Any error [`crate::predicate::build_predicate`] raises for the filter.
pub fn build_join(dialect: Dialect, primary: &TableRef, join: &JoinSpec) -> Result<JoinFragment> {
    if join.targets(&primary.name) {
        return Err(GenError::SelfJoinUnsupported(primary.name.clone()));
    }

    let table = dialect.table_name(&join.foreign_table, join.database.as_deref());
    let alias = dialect.quote_identifier(join.foreign_alias());
    let local = dialect.qualify(&join.local_table, &join.local_key);
    let foreign = dialect.qualify(join.foreign_alias(), &join.foreign_key);

    let clause = if dialect.supports_native_joins() {
        JoinClause::Native(format!(
            "{} {table} {alias} ON {local} = {foreign}",
            join.join_type.keyword()
        ))
    } else {
        let condition = match join.join_type {
            JoinType::Inner => format!("{local} = {foreign}"),
            JoinType::Left => format!("{local} = {foreign} (+)"),
        };
        JoinClause::Legacy {
            from_item: format!("{table} {alias}"),
            condition,
        }
    };

    trace!(dialect = %dialect, table = %join.foreign_table, join_type = %join.join_type, "join");

    Ok(JoinFragment {
        clause,
        filter: build_predicates(dialect, &join.filter)?,
    })
}
