//! # activetable-sql
//!
//! Multi-dialect SELECT generation for MySQL, PostgreSQL, Microsoft SQL
//! Server and Oracle.
//!
//! This crate provides:
//! - An immutable query description ([`QuerySpec`]) with joins, predicates,
//!   ordering and a row window
//! - Positional column aliases (`cx_0`, `c0_1`, `cvirt_0`) and an
//!   [`AliasMap`] that splits result rows back into tables
//! - Dialect-correct pagination: `LIMIT`, `LIMIT/OFFSET`, `ROWNUM`
//!   double-nesting and `TOP` with reversed ordering
//! - Legacy Oracle `(+)` outer joins and `rowid` keys
//!
//! ## Rendering a query
//!
//! ```rust
//! use activetable_sql::{Dialect, JoinSpec, Predicate, QuerySpec, Verb, render};
//!
//! let spec = QuerySpec::table("customer")
//!     .columns(&["cust_number", "company_name"])
//!     .join(JoinSpec::inner(
//!         "customer",
//!         "sales_category_id",
//!         "sales_category_lookup",
//!         "sales_category_id",
//!     ))
//!     .join_columns(0, &["sales_category_desc"])
//!     .filter(Predicate::eq("customer", "state", "MN"))
//!     .slice(1, 10);
//!
//! let rendered = render(Verb::Select, &spec, Dialect::ORACLE).unwrap();
//! assert!(rendered.sql.contains("WHERE ROWNUM <= 10"));
//! assert!(rendered.sql.ends_with("WHERE rnum >= 2"));
//! assert_eq!(rendered.binds.len(), 1);
//! ```
//!
//! ## Decoding result rows
//!
//! Values never appear in the SQL text. The alias map returned with the
//! statement maps each result column back to its table:
//!
//! ```rust
//! use activetable_sql::{Dialect, QuerySpec, Verb, render};
//!
//! let spec = QuerySpec::table("sale").columns(&["sale_id", "total"]);
//! let rendered = render(Verb::Select, &spec, Dialect::MySql).unwrap();
//!
//! let row = rendered
//!     .aliases
//!     .decode_row(vec![("cx_0", 7), ("cx_1", 120)])
//!     .unwrap();
//! assert_eq!(row.primary["total"], 120);
//! ```

pub mod alias;
pub mod dialect;
pub mod error;
pub mod join;
pub mod pagination;
pub mod predicate;
pub mod render;
pub mod spec;
pub mod statement;
pub mod value;

pub use alias::{AliasMap, ColumnAlias, DecodedColumn, DecodedRow, Scope};
pub use dialect::Dialect;
pub use error::{GenError, Result};
pub use join::{JoinSpec, JoinType};
pub use predicate::{Fragment, Operator, Predicate, PredicateValue};
pub use render::{describe_table, last_insert_id, render, QueryRenderer, RenderedQuery, Verb};
pub use spec::{ColumnRef, Direction, OrderColumn, OrderSpec, QuerySpec, Slice, TableRef};
pub use value::{SqlValue, ToSqlValue};
