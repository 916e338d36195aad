//! Query description.
//!
//! A [`QuerySpec`] is an immutable value: it is built once, handed to
//! [`crate::render::render`] by reference, and never modified by rendering.

use serde::{Deserialize, Serialize};

use crate::error::{GenError, Result};
use crate::join::JoinSpec;
use crate::predicate::Predicate;

/// A table, optionally qualified by its database or schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Table name.
    pub name: String,
    /// Database or schema.
    #[serde(default)]
    pub schema: Option<String>,
}

impl TableRef {
    /// Creates an unqualified table reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
        }
    }

    /// Qualifies the table with a database or schema.
    #[must_use]
    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

/// A projected column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ColumnRef {
    /// Column of the primary table.
    Primary {
        /// Column name.
        column: String,
    },
    /// Column of the join at position `join`.
    Join {
        /// 0-based position in [`QuerySpec::joins`].
        join: usize,
        /// Column name.
        column: String,
    },
    /// Computed SQL expression.
    Virtual {
        /// Name the value is decoded under.
        name: String,
        /// SQL expression, emitted verbatim.
        expression: String,
    },
}

impl ColumnRef {
    /// Column of the primary table.
    #[must_use]
    pub fn primary(column: impl Into<String>) -> Self {
        Self::Primary {
            column: column.into(),
        }
    }

    /// Column of the join at position `join`.
    #[must_use]
    pub fn joined(join: usize, column: impl Into<String>) -> Self {
        Self::Join {
            join,
            column: column.into(),
        }
    }

    /// Computed expression decoded under `name`.
    #[must_use]
    pub fn virtual_column(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Virtual {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// Returns the opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A column to order by: the primary table or a join alias, and a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderColumn {
    /// Primary table name or join alias.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl OrderColumn {
    /// Creates an order column.
    #[must_use]
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// ORDER BY request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSpec {
    /// Order by columns; the direction applies to each of them.
    Columns {
        /// Columns, most significant first.
        columns: Vec<OrderColumn>,
        /// Direction.
        #[serde(default)]
        direction: Direction,
    },
    /// Free-form expression list emitted after `ORDER BY` verbatim.
    ///
    /// Cannot be combined with a slice on MSSQL.
    Raw(String),
}

/// Row window `[start, end)`, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slice {
    /// First row, inclusive.
    pub start: u64,
    /// Last row, exclusive.
    pub end: u64,
}

impl Slice {
    /// Creates a slice.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Number of rows in the window.
    #[must_use]
    pub const fn len(self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns true for an empty or inverted window.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start >= self.end
    }
}

/// Everything needed to render one SELECT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Primary table.
    pub from: TableRef,
    /// Lookup tables, in join order.
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
    /// Projected columns.
    #[serde(default)]
    pub columns: Vec<ColumnRef>,
    /// Conditions, ANDed in order.
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    /// Ordering.
    #[serde(default)]
    pub order: Option<OrderSpec>,
    /// Explicit row limit.
    #[serde(default)]
    pub limit: Option<u64>,
    /// Row window.
    #[serde(default)]
    pub slice: Option<Slice>,
}

impl QuerySpec {
    /// Creates a query on `from` with nothing selected yet.
    #[must_use]
    pub const fn new(from: TableRef) -> Self {
        Self {
            from,
            joins: vec![],
            columns: vec![],
            predicates: vec![],
            order: None,
            limit: None,
            slice: None,
        }
    }

    /// Creates a query on the unqualified table `name`.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::new(TableRef::new(name))
    }

    /// Adds a join.
    #[must_use]
    pub fn join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    /// Adds one projected column.
    #[must_use]
    pub fn column(mut self, column: ColumnRef) -> Self {
        self.columns.push(column);
        self
    }

    /// Projects primary-table columns.
    #[must_use]
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns
            .extend(columns.iter().map(|c| ColumnRef::primary(*c)));
        self
    }

    /// Projects columns of the join at position `join`.
    #[must_use]
    pub fn join_columns(mut self, join: usize, columns: &[&str]) -> Self {
        self.columns
            .extend(columns.iter().map(|c| ColumnRef::joined(join, *c)));
        self
    }

    /// Adds a predicate.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Orders by columns in one direction.
    #[must_use]
    pub fn order_by(mut self, columns: Vec<OrderColumn>, direction: Direction) -> Self {
        self.order = Some(OrderSpec::Columns { columns, direction });
        self
    }

    /// Orders by a free-form expression list.
    #[must_use]
    pub fn order_by_raw(mut self, expression: impl Into<String>) -> Self {
        self.order = Some(OrderSpec::Raw(expression.into()));
        self
    }

    /// Limits the number of rows.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Requests the row window `[start, end)`.
    #[must_use]
    pub const fn slice(mut self, start: u64, end: u64) -> Self {
        self.slice = Some(Slice::new(start, end));
        self
    }

    /// Checks the dialect-independent invariants.
    ///
    /// # Errors
    ///
    /// - [`GenError::InvalidSlice`] when `start >= end`.
    /// - [`GenError::ConflictingPagination`] when both a limit and a slice are set.
    /// - [`GenError::SelfJoinUnsupported`] when a join targets the primary
    ///   table or borrows its name as alias.
    /// - [`GenError::DuplicateJoinAlias`] when two joins share an alias.
    /// - [`GenError::UnknownJoinIndex`] when a column names a missing join.
    /// - [`GenError::EmptyProjection`] when nothing is selected.
    pub fn validate(&self) -> Result<()> {
        if let Some(slice) = self.slice {
            if slice.is_empty() {
                return Err(GenError::InvalidSlice {
                    start: slice.start,
                    end: slice.end,
                });
            }
            if self.limit.is_some() {
                return Err(GenError::ConflictingPagination);
            }
        }

        let mut aliases: Vec<&str> = Vec::with_capacity(self.joins.len());
        for join in &self.joins {
            if join.targets(&self.from.name) {
                return Err(GenError::SelfJoinUnsupported(self.from.name.clone()));
            }
            let alias = join.foreign_alias();
            if aliases.iter().any(|seen| seen.eq_ignore_ascii_case(alias)) {
                return Err(GenError::DuplicateJoinAlias(alias.to_string()));
            }
            aliases.push(alias);
        }

        for column in &self.columns {
            if let ColumnRef::Join { join, .. } = column {
                if *join >= self.joins.len() {
                    return Err(GenError::UnknownJoinIndex(*join));
                }
            }
        }

        if self.columns.is_empty() {
            return Err(GenError::EmptyProjection);
        }

        Ok(())
    }
}
