//! Query rendering.
//!
//! [`render`] turns a [`QuerySpec`] into SQL text, the positional bind list
//! for its `?` placeholders and the [`AliasMap`] needed to decode the result
//! rows. Every check runs before any text is assembled, so an error never
//! comes with a partial statement.
//!
//! Binds are collected in the order their placeholders appear: join filters
//! in join order, then the top-level predicates in declaration order.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::alias::{encode_projection, AliasMap, ColumnAlias};
use crate::dialect::Dialect;
use crate::error::{GenError, Result};
use crate::join::{build_join, JoinClause};
use crate::pagination::{apply_limit, paginate, WindowOrder};
use crate::predicate::{build_predicates, Fragment};
use crate::spec::{Direction, OrderColumn, OrderSpec, QuerySpec};
use crate::statement::SelectStatement;
use crate::value::SqlValue;

/// Statement verb.
///
/// Only SELECT is generated here; writes go through the database layer's own
/// statement builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// `SELECT`
    Select,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => f.write_str("select"),
        }
    }
}

impl FromStr for Verb {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("select") {
            Ok(Self::Select)
        } else {
            Err(GenError::UnsupportedVerb(s.to_string()))
        }
    }
}

/// A rendered statement.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub binds: Vec<SqlValue>,
    /// Decoder for the result rows.
    pub aliases: AliasMap,
}

impl RenderedQuery {
    /// Splits into SQL text and binds, dropping the alias map.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.binds)
    }
}

/// Renders `spec` for `dialect`.
///
/// # Errors
///
/// Any [`GenError`] raised while validating `spec` or building its
/// fragments.
pub fn render(verb: Verb, spec: &QuerySpec, dialect: Dialect) -> Result<RenderedQuery> {
    match verb {
        Verb::Select => render_select(spec, dialect),
    }
}

/// Returns the metadata query listing the columns of `table`.
#[must_use]
pub fn describe_table(table: &str, schema: Option<&str>, dialect: Dialect) -> String {
    dialect.describe_table_statement(table, schema)
}

/// Returns the statement fetching the key of the last inserted row.
///
/// # Errors
///
/// Returns [`GenError::UnsupportedDialectFeature`] for MSSQL.
pub fn last_insert_id(table: &str, dialect: Dialect) -> Result<String> {
    dialect.last_insert_id_statement(table)
}

fn render_select(spec: &QuerySpec, dialect: Dialect) -> Result<RenderedQuery> {
    spec.validate()?;

    let (projection, aliases) = encode_projection(dialect, spec)?;
    let mut stmt = SelectStatement::new(
        projection,
        dialect.table_name(&spec.from.name, spec.from.schema.as_deref()),
    );
    let mut conditions = Vec::new();

    for join in &spec.joins {
        let fragment = build_join(dialect, &spec.from, join)?;
        match fragment.clause {
            JoinClause::Native(clause) => stmt.joins.push(clause),
            JoinClause::Legacy {
                from_item,
                condition,
            } => {
                stmt.from.push(from_item);
                conditions.push(Fragment::new(condition, vec![]));
            }
        }
        conditions.extend(fragment.filter);
    }

    conditions.extend(build_predicates(dialect, &spec.predicates)?);

    let filter = Fragment::conjunction(conditions);
    let binds = filter.binds;
    if !filter.sql.is_empty() {
        stmt.filter = Some(filter.sql);
    }

    stmt.order_by = order_clause(dialect, spec)?;

    let sql = match (spec.limit, spec.slice) {
        (Some(_), Some(_)) => return Err(GenError::ConflictingPagination),
        (Some(n), None) => apply_limit(dialect, stmt, n),
        (None, Some(slice)) => {
            let window = match dialect {
                Dialect::MsSql => Some(window_order(dialect, spec, &aliases)?),
                _ => None,
            };
            paginate(dialect, stmt, window.as_ref(), slice)?
        }
        (None, None) => stmt.to_sql(),
    };

    debug!(dialect = %dialect, binds = binds.len(), sql = %sql, "Rendered select");

    Ok(RenderedQuery {
        sql,
        binds,
        aliases,
    })
}

fn order_clause(dialect: Dialect, spec: &QuerySpec) -> Result<Option<String>> {
    match &spec.order {
        None => Ok(None),
        Some(OrderSpec::Raw(_)) if dialect == Dialect::MsSql => Err(GenError::unsupported(
            dialect.name(),
            "free-form ORDER BY fragment",
        )),
        Some(OrderSpec::Raw(expression)) => {
            let expression = expression.trim();
            Ok((!expression.is_empty()).then(|| expression.to_string()))
        }
        Some(OrderSpec::Columns { columns, direction }) => {
            if columns.is_empty() {
                return Ok(None);
            }
            let clause = columns
                .iter()
                .map(|c| format!("{} {}", order_target(dialect, c), direction.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            Ok(Some(clause))
        }
    }
}

fn order_target(dialect: Dialect, column: &OrderColumn) -> String {
    if dialect.is_magic_primary_key(&column.column) {
        if let Some(target) = dialect.magic_primary_key_target(&column.table) {
            return target;
        }
    }
    dialect.qualify(&column.table, &column.column)
}

/// Ordering for the outer levels of an MSSQL slice: the aliases of the order
/// columns, or the first projected alias descending.
fn window_order(dialect: Dialect, spec: &QuerySpec, aliases: &AliasMap) -> Result<WindowOrder> {
    let quoted = |alias: ColumnAlias| dialect.quote_alias(&alias.to_string());

    match &spec.order {
        Some(OrderSpec::Columns { columns, direction }) if !columns.is_empty() => {
            let order = columns
                .iter()
                .map(|c| {
                    aliases
                        .alias_for(&c.table, &c.column)
                        .map(quoted)
                        .ok_or_else(|| GenError::OrderColumnNotProjected {
                            table: c.table.clone(),
                            column: c.column.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(WindowOrder::new(order, *direction))
        }
        _ => {
            let first = aliases.first_alias().ok_or(GenError::EmptyProjection)?;
            Ok(WindowOrder::new(vec![quoted(first)], Direction::Desc))
        }
    }
}

/// Renders statements for one dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryRenderer {
    dialect: Dialect,
}

impl QueryRenderer {
    /// Creates a renderer for `dialect`.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// The dialect statements are rendered for.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Renders a SELECT.
    ///
    /// # Errors
    ///
    /// See [`render`].
    pub fn select(&self, spec: &QuerySpec) -> Result<RenderedQuery> {
        render(Verb::Select, spec, self.dialect)
    }

    /// See [`describe_table`].
    #[must_use]
    pub fn describe_table(&self, table: &str, schema: Option<&str>) -> String {
        describe_table(table, schema, self.dialect)
    }

    /// See [`last_insert_id`].
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnsupportedDialectFeature`] for MSSQL.
    pub fn last_insert_id(&self, table: &str) -> Result<String> {
        last_insert_id(table, self.dialect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::JoinSpec;
    use crate::predicate::Predicate;
    use crate::spec::ColumnRef;

    fn sale() -> QuerySpec {
        QuerySpec::table("sale")
            .columns(&["sale_id", "total"])
            .join(JoinSpec::inner("sale", "sale_status_id", "sale_status", "sale_status_id"))
            .join_columns(0, &["status_name"])
    }

    #[test]
    fn test_plain_select_mysql() {
        let (sql, binds) = render(Verb::Select, &sale(), Dialect::MySql)
            .unwrap()
            .into_parts();
        assert_eq!(
            sql,
            "SELECT\n`sale`.`sale_id` AS `cx_0`,\n`sale`.`total` AS `cx_1`,\n\
             `sale_status`.`status_name` AS `c0_0`\nFROM `sale`\n\
             INNER JOIN `sale_status` `sale_status` ON `sale`.`sale_status_id` = `sale_status`.`sale_status_id`"
        );
        assert!(binds.is_empty());
    }

    #[test]
    fn test_bind_order_join_filters_first() {
        let spec = QuerySpec::table("sale")
            .columns(&["sale_id", "total"])
            .join(
                JoinSpec::inner("sale", "sale_status_id", "sale_status", "sale_status_id")
                    .filter(Predicate::eq("sale_status", "active", "Y")),
            )
            .join(
                JoinSpec::left("sale", "store_id", "store", "store_id")
                    .filter(Predicate::eq("store", "region", "north")),
            )
            .join_columns(0, &["status_name"])
            .filter(Predicate::gt("sale", "total", 100));
        let rendered = render(Verb::Select, &spec, Dialect::PostgreSql).unwrap();
        assert_eq!(
            rendered.binds,
            vec![
                SqlValue::Text(String::from("Y")),
                SqlValue::Text(String::from("north")),
                SqlValue::Int(100),
            ]
        );
        assert!(rendered.sql.ends_with(
            "WHERE \"sale_status\".\"active\" = ?\nAND \"store\".\"region\" = ?\nAND \"sale\".\"total\" > ?"
        ));
    }

    #[test]
    fn test_oracle_legacy_join_conditions_precede_predicates() {
        let spec = sale()
            .join(JoinSpec::left("sale", "store_id", "store", "store_id"))
            .filter(Predicate::eq("sale", "state", "MN"));
        let sql = render(Verb::Select, &spec, Dialect::ORACLE).unwrap().sql;
        assert!(sql.contains("\nFROM sale, sale_status sale_status, store store\n"));
        assert!(sql.ends_with(
            "WHERE sale.sale_status_id = sale_status.sale_status_id\n\
             AND sale.store_id = store.store_id (+)\nAND sale.state = ?"
        ));
    }

    #[test]
    fn test_order_direction_applies_to_every_column() {
        let spec = sale().order_by(
            vec![OrderColumn::new("sale", "total"), OrderColumn::new("sale", "sale_id")],
            Direction::Desc,
        );
        let sql = render(Verb::Select, &spec, Dialect::MySql).unwrap().sql;
        assert!(sql.ends_with("ORDER BY `sale`.`total` DESC, `sale`.`sale_id` DESC"));
    }

    #[test]
    fn test_raw_order() {
        let spec = sale().order_by_raw("sale.total DESC");
        let sql = render(Verb::Select, &spec, Dialect::PostgreSql).unwrap().sql;
        assert!(sql.ends_with("\nORDER BY sale.total DESC"));
        assert!(matches!(
            render(Verb::Select, &spec, Dialect::MsSql),
            Err(GenError::UnsupportedDialectFeature { dialect: "mssql", .. })
        ));
    }

    #[test]
    fn test_explicit_limit() {
        let spec = sale().limit(5);
        assert!(render(Verb::Select, &spec, Dialect::MySql)
            .unwrap()
            .sql
            .ends_with("\nLIMIT 5"));
        assert!(render(Verb::Select, &spec, Dialect::MsSql)
            .unwrap()
            .sql
            .starts_with("SELECT\nTOP (5)\n"));
        assert!(render(Verb::Select, &spec, Dialect::ORACLE)
            .unwrap()
            .sql
            .ends_with("\n)\nWHERE ROWNUM <= 5"));
    }

    #[test]
    fn test_limit_and_slice_conflict() {
        let spec = sale().limit(5).slice(0, 10);
        assert_eq!(
            render(Verb::Select, &spec, Dialect::PostgreSql),
            Err(GenError::ConflictingPagination)
        );
    }

    #[test]
    fn test_mssql_slice_orders_by_aliases() {
        let spec = sale()
            .order_by(vec![OrderColumn::new("sale_status", "status_name")], Direction::Asc)
            .slice(10, 20);
        let sql = render(Verb::Select, &spec, Dialect::MsSql).unwrap().sql;
        assert!(sql.starts_with("SELECT * FROM (\nSELECT TOP (10) * FROM (\nSELECT\nTOP (20)\n"));
        assert!(sql.contains("ORDER BY [sale_status].[status_name] ASC\n) AS [slice_inner]"));
        assert!(sql.contains("ORDER BY [c0_0] DESC\n) AS [slice_outer]"));
        assert!(sql.ends_with("ORDER BY [c0_0] ASC"));
    }

    #[test]
    fn test_mssql_slice_default_order() {
        let sql = render(Verb::Select, &sale().slice(0, 10), Dialect::MsSql)
            .unwrap()
            .sql;
        assert!(sql.contains("ORDER BY [cx_0] DESC\n) AS [slice_inner]\nORDER BY [cx_0] ASC"));
        assert!(sql.ends_with("ORDER BY [cx_0] DESC"));
    }

    #[test]
    fn test_mssql_slice_order_column_must_be_projected() {
        let spec = sale()
            .order_by(vec![OrderColumn::new("sale", "created_at")], Direction::Asc)
            .slice(0, 10);
        assert_eq!(
            render(Verb::Select, &spec, Dialect::MsSql),
            Err(GenError::OrderColumnNotProjected {
                table: String::from("sale"),
                column: String::from("created_at"),
            })
        );
        assert!(render(Verb::Select, &spec, Dialect::MySql).is_ok());
    }

    #[test]
    fn test_magic_key_predicate_and_projection() {
        let spec = QuerySpec::table("customer")
            .columns(&["rowid", "cust_number"])
            .filter(Predicate::eq("customer", "rowid", "AAAR3sAAEAAAACXAAA"));
        let rendered = render(Verb::Select, &spec, Dialect::ORACLE).unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT\ncustomer.cust_number AS cx_0,\nROWIDTOCHAR(customer.rowid) AS cx_1\n\
             FROM customer\nWHERE customer.rowid = CHARTOROWID(?)"
        );
        assert_eq!(rendered.binds.len(), 1);
        assert_eq!(rendered.aliases.decode("CX_1").unwrap().column, "rowid");
    }

    #[test]
    fn test_spec_left_untouched() {
        let spec = sale()
            .column(ColumnRef::virtual_column("n", "COUNT(*)"))
            .slice(0, 5);
        let before = spec.clone();
        for dialect in [Dialect::MySql, Dialect::PostgreSql, Dialect::MsSql, Dialect::ORACLE] {
            render(Verb::Select, &spec, dialect).unwrap();
        }
        assert_eq!(spec, before);
    }

    #[test]
    fn test_verb_parse() {
        assert_eq!("SELECT".parse::<Verb>().unwrap(), Verb::Select);
        assert_eq!(
            "delete".parse::<Verb>(),
            Err(GenError::UnsupportedVerb(String::from("delete")))
        );
    }

    #[test]
    fn test_renderer_wrapper() {
        let renderer = QueryRenderer::new(Dialect::PostgreSql);
        assert_eq!(renderer.dialect(), Dialect::PostgreSql);
        assert_eq!(
            renderer.last_insert_id("sale").unwrap(),
            "SELECT lastval() AS last_insert_id"
        );
        assert!(renderer.describe_table("sale", None).contains("pg_class.relname = 'sale'"));
        assert!(renderer.select(&sale()).is_ok());
        assert!(QueryRenderer::new(Dialect::MsSql).last_insert_id("sale").is_err());
    }
}
