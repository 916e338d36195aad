//! Row windows and row limits.
//!
//! A slice `[start, end)` is 0-based, start inclusive and end exclusive, for
//! every dialect:
//!
//! | Dialect | Rendering |
//! |---|---|
//! | MySQL | `LIMIT start,end-start` |
//! | PostgreSQL | `LIMIT end-start OFFSET start` |
//! | Oracle | `ROWNUM <= end` inside, `rnum >= start+1` outside |
//! | MSSQL | `TOP (end)`, then `TOP (end-start)` in reverse order, then re-sorted |
//!
//! Oracle's `ROWNUM` is assigned after the inner query has materialized its
//! first `end` rows, so the outer filter only trims the head. MSSQL has
//! neither an offset nor a row number: the last `end-start` rows of the first
//! `end` are taken by reversing the order, and the outer level restores it.

use crate::dialect::Dialect;
use crate::error::{GenError, Result};
use crate::spec::{Direction, Slice};
use crate::statement::SelectStatement;

/// Derived table name of the innermost MSSQL window level.
const MSSQL_INNER: &str = "slice_inner";
/// Derived table name of the middle MSSQL window level.
const MSSQL_OUTER: &str = "slice_outer";

/// Ordering the nested MSSQL levels sort by.
///
/// The outer levels of the window can only see the inner projection, so they
/// order by positional aliases rather than by `table.column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOrder {
    /// Quoted aliases, most significant first.
    pub aliases: Vec<String>,
    /// Direction of the requested order.
    pub direction: Direction,
}

impl WindowOrder {
    /// Creates a window order.
    #[must_use]
    pub const fn new(aliases: Vec<String>, direction: Direction) -> Self {
        Self { aliases, direction }
    }

    /// Renders the aliases, each followed by `direction`.
    #[must_use]
    pub fn clause(&self, direction: Direction) -> String {
        self.aliases
            .iter()
            .map(|alias| format!("{alias} {}", direction.as_sql()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Wraps or extends `base` so it returns exactly the rows of `slice`.
///
/// `window` is only consulted for MSSQL. When `base` has no ORDER BY of its
/// own, the innermost MSSQL level is ordered by the window order.
///
/// # Errors
///
/// - [`GenError::InvalidSlice`] when `slice` is empty.
/// - [`GenError::UnsupportedDialectFeature`] for MSSQL without a window order.
pub fn paginate(
    dialect: Dialect,
    mut base: SelectStatement,
    window: Option<&WindowOrder>,
    slice: Slice,
) -> Result<String> {
    if slice.is_empty() {
        return Err(GenError::InvalidSlice {
            start: slice.start,
            end: slice.end,
        });
    }
    let Slice { start, end } = slice;
    let count = slice.len();

    let sql = match dialect {
        Dialect::MySql => {
            base.limit = Some(format!("LIMIT {start},{count}"));
            base.to_sql()
        }
        Dialect::PostgreSql => {
            base.limit = Some(format!("LIMIT {count}\nOFFSET {start}"));
            base.to_sql()
        }
        Dialect::Oracle { .. } => format!(
            "SELECT * FROM (\nSELECT a.*, ROWNUM rnum FROM (\n{base}\n) a\nWHERE ROWNUM <= {end}\n)\nWHERE rnum >= {}",
            start + 1
        ),
        Dialect::MsSql => {
            let window = window
                .filter(|w| !w.aliases.is_empty())
                .ok_or_else(|| {
                    GenError::unsupported(dialect.name(), "slice without an order column")
                })?;
            base.top = Some(end);
            if base.order_by.is_none() {
                base.order_by = Some(window.clause(window.direction));
            }
            let middle = format!(
                "SELECT TOP ({count}) * FROM (\n{base}\n) AS {}\nORDER BY {}",
                dialect.quote_identifier(MSSQL_INNER),
                window.clause(window.direction.reversed())
            );
            format!(
                "SELECT * FROM (\n{middle}\n) AS {}\nORDER BY {}",
                dialect.quote_identifier(MSSQL_OUTER),
                window.clause(window.direction)
            )
        }
    };

    Ok(sql)
}

/// Restricts `base` to its first `n` rows.
#[must_use]
pub fn apply_limit(dialect: Dialect, mut base: SelectStatement, n: u64) -> String {
    match dialect {
        Dialect::MySql | Dialect::PostgreSql => {
            base.limit = Some(format!("LIMIT {n}"));
            base.to_sql()
        }
        Dialect::MsSql => {
            base.top = Some(n);
            base.to_sql()
        }
        Dialect::Oracle { .. } => format!("SELECT * FROM (\n{base}\n)\nWHERE ROWNUM <= {n}"),
    }
}
