//! SQL dialect descriptors.
//!
//! The four supported RDBMS families differ in identifier quoting, join
//! syntax, pagination and metadata queries. [`Dialect`] is a closed set: every
//! place where behaviour diverges matches on it exhaustively, so adding a
//! dialect is checked by the compiler.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::error::{GenError, Result};
use crate::value::SqlValue;

/// Canonical datetime layout shared by every dialect.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What [`Dialect::format_date`] returns for a missing datetime.
pub const ZERO_DATE: &str = "0000-00-00 00:00:00";

/// A supported RDBMS dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// MySQL 4/5 family: backtick quoting, `LIMIT offset,count`.
    MySql,
    /// PostgreSQL: double-quote quoting, `ILIKE`, `LIMIT n OFFSET m`.
    PostgreSql,
    /// Microsoft SQL Server: bracket quoting, `TOP`, no offset primitive.
    MsSql,
    /// Oracle PL/SQL: `ROWNUM` pagination, `(+)` outer joins, `rowid` keys.
    Oracle {
        /// Wrap identifiers in double quotes. Legacy schemas leave them bare.
        quote_identifiers: bool,
    },
}

impl Dialect {
    /// Legacy Oracle with bare identifiers.
    pub const ORACLE: Self = Self::Oracle {
        quote_identifiers: false,
    };

    /// Returns the dialect name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
            Self::MsSql => "mssql",
            Self::Oracle { .. } => "oracle",
        }
    }

    /// Returns the opening and closing identifier quote, if the dialect quotes.
    #[must_use]
    pub const fn identifier_quotes(self) -> Option<(char, char)> {
        match self {
            Self::MySql => Some(('`', '`')),
            Self::MsSql => Some(('[', ']')),
            Self::PostgreSql
            | Self::Oracle {
                quote_identifiers: true,
            } => Some(('"', '"')),
            Self::Oracle {
                quote_identifiers: false,
            } => None,
        }
    }

    /// Quotes an identifier, doubling any embedded closing quote.
    #[must_use]
    pub fn quote_identifier(self, name: &str) -> String {
        match self.identifier_quotes() {
            Some((open, close)) => {
                let escaped = name.replace(close, &format!("{close}{close}"));
                format!("{open}{escaped}{close}")
            }
            None => name.to_string(),
        }
    }

    /// Renders `table.column` with both parts quoted.
    #[must_use]
    pub fn qualify(self, table: &str, column: &str) -> String {
        format!(
            "{}.{}",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )
    }

    /// Renders a table name, prefixed by its database or schema when given.
    #[must_use]
    pub fn table_name(self, table: &str, schema: Option<&str>) -> String {
        match schema {
            Some(schema) => format!(
                "{}.{}",
                self.quote_identifier(schema),
                self.quote_identifier(table)
            ),
            None => self.quote_identifier(table),
        }
    }

    /// Renders a positional column alias.
    ///
    /// PostgreSQL and Oracle leave aliases bare and fold their case; result
    /// columns are matched case-insensitively when decoded.
    #[must_use]
    pub fn quote_alias(self, alias: &str) -> String {
        match self {
            Self::MySql | Self::MsSql => self.quote_identifier(alias),
            Self::PostgreSql | Self::Oracle { .. } => alias.to_string(),
        }
    }

    /// Formats a datetime as `YYYY-MM-DD HH:MM:SS`; `None` yields [`ZERO_DATE`].
    #[must_use]
    pub fn format_date(self, datetime: Option<&NaiveDateTime>) -> String {
        datetime.map_or_else(
            || ZERO_DATE.to_string(),
            |dt| dt.format(DATE_FORMAT).to_string(),
        )
    }

    /// Name of the implicit row identifier usable as a primary key.
    #[must_use]
    pub const fn magic_primary_key_name(self) -> Option<&'static str> {
        match self {
            Self::Oracle { .. } => Some("rowid"),
            Self::MySql | Self::PostgreSql | Self::MsSql => None,
        }
    }

    /// Returns true when `column` names the magic primary key.
    #[must_use]
    pub fn is_magic_primary_key(self, column: &str) -> bool {
        self.magic_primary_key_name()
            .is_some_and(|magic| magic.eq_ignore_ascii_case(column))
    }

    /// Expression projecting the magic primary key of `table` as text.
    ///
    /// The pseudo-column itself is never quoted: a quoted `"rowid"` would name
    /// an ordinary, case-sensitive column.
    #[must_use]
    pub fn magic_primary_key_projection(self, table: &str) -> Option<String> {
        let magic = self.magic_primary_key_name()?;
        Some(format!(
            "ROWIDTOCHAR({}.{magic})",
            self.quote_identifier(table)
        ))
    }

    /// Column side of a predicate on the magic primary key of `table`.
    #[must_use]
    pub fn magic_primary_key_target(self, table: &str) -> Option<String> {
        let magic = self.magic_primary_key_name()?;
        Some(format!("{}.{magic}", self.quote_identifier(table)))
    }

    /// WHERE fragment identifying a row by its magic primary key for updates.
    ///
    /// The single placeholder receives the textual key read back through
    /// [`Dialect::magic_primary_key_projection`].
    #[must_use]
    pub fn magic_update_where(self) -> Option<String> {
        let magic = self.magic_primary_key_name()?;
        Some(format!("{magic} = CHARTOROWID(?)"))
    }

    /// Whether the dialect has ANSI `INNER JOIN` / `LEFT JOIN` syntax.
    ///
    /// Legacy Oracle lists joined tables in FROM and marks the optional side
    /// of an outer join with `(+)` in WHERE.
    #[must_use]
    pub const fn supports_native_joins(self) -> bool {
        !matches!(self, Self::Oracle { .. })
    }

    /// Pattern-match keyword. PostgreSQL matches case-insensitively.
    #[must_use]
    pub const fn like_keyword(self, negated: bool) -> &'static str {
        match (self, negated) {
            (Self::PostgreSql, false) => "ILIKE",
            (Self::PostgreSql, true) => "NOT ILIKE",
            (_, false) => "LIKE",
            (_, true) => "NOT LIKE",
        }
    }

    /// Returns the metadata query listing a table's columns.
    ///
    /// Every variant yields a `field` column; all but Oracle also yield `type`.
    #[must_use]
    pub fn describe_table_statement(self, table: &str, schema: Option<&str>) -> String {
        let table_literal = literal(table);
        match self {
            Self::MySql => format!("DESCRIBE {}", self.table_name(table, schema)),
            Self::MsSql => {
                let mut sql = format!(
                    "SELECT COLUMN_NAME AS [field], DATA_TYPE AS [type] \
                     FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_NAME = {table_literal}"
                );
                if let Some(schema) = schema {
                    sql.push_str(&format!(" AND TABLE_CATALOG = {}", literal(schema)));
                }
                sql
            }
            Self::Oracle { .. } => {
                let mut sql = format!(
                    "SELECT COLUMN_NAME AS field FROM ALL_TAB_COLUMNS \
                     WHERE UPPER(TABLE_NAME) = UPPER({table_literal})"
                );
                if let Some(schema) = schema {
                    sql.push_str(&format!(" AND UPPER(OWNER) = UPPER({})", literal(schema)));
                }
                sql
            }
            Self::PostgreSql => {
                let mut sql = String::from(
                    "SELECT pg_attribute.attname AS field, pg_type.typname AS type \
                     FROM pg_class \
                     INNER JOIN pg_attribute ON pg_class.oid = pg_attribute.attrelid \
                     INNER JOIN pg_type ON pg_attribute.atttypid = pg_type.oid",
                );
                if schema.is_some() {
                    sql.push_str(
                        " INNER JOIN pg_namespace ON pg_class.relnamespace = pg_namespace.oid",
                    );
                }
                sql.push_str(&format!(
                    " WHERE pg_class.relname = {table_literal} AND pg_attribute.attnum > 0 \
                     AND NOT pg_attribute.attisdropped"
                ));
                if let Some(schema) = schema {
                    sql.push_str(&format!(" AND pg_namespace.nspname = {}", literal(schema)));
                }
                sql.push_str(" ORDER BY pg_attribute.attnum");
                sql
            }
        }
    }

    /// Returns the statement fetching the key of the last inserted row.
    ///
    /// # Errors
    ///
    /// MSSQL has no write path and fails with
    /// [`GenError::UnsupportedDialectFeature`].
    pub fn last_insert_id_statement(self, table: &str) -> Result<String> {
        match self {
            Self::MySql => Ok(String::from("SELECT LAST_INSERT_ID() AS last_insert_id")),
            Self::PostgreSql => Ok(String::from("SELECT lastval() AS last_insert_id")),
            Self::Oracle { .. } => Ok(format!(
                "SELECT ROWIDTOCHAR(MAX(rowid)) AS last_insert_id FROM {}",
                self.quote_identifier(table)
            )),
            Self::MsSql => Err(GenError::unsupported(
                self.name(),
                "last insert id (write operations)",
            )),
        }
    }
}

fn literal(text: &str) -> String {
    SqlValue::Text(text.to_string()).to_sql_inline()
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oracle {
                quote_identifiers: true,
            } => f.write_str("oracle-quoted"),
            _ => f.write_str(self.name()),
        }
    }
}

impl FromStr for Dialect {
    type Err = GenError;

    /// Parses a driver name.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mysqli" => Ok(Self::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Self::PostgreSql),
            "mssql" | "sqlsrv" => Ok(Self::MsSql),
            "oci8" | "oci" | "oracle" => Ok(Self::ORACLE),
            "oracle-quoted" | "oci8-quoted" => Ok(Self::Oracle {
                quote_identifiers: true,
            }),
            _ => Err(GenError::UnknownDialect(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const QUOTED_ORACLE: Dialect = Dialect::Oracle {
        quote_identifiers: true,
    };

    #[test]
    fn test_quote_identifier_per_dialect() {
        assert_eq!(Dialect::MySql.quote_identifier("order"), "`order`");
        assert_eq!(Dialect::MsSql.quote_identifier("order"), "[order]");
        assert_eq!(Dialect::PostgreSql.quote_identifier("order"), "\"order\"");
        assert_eq!(QUOTED_ORACLE.quote_identifier("order"), "\"order\"");
        assert_eq!(Dialect::ORACLE.quote_identifier("order"), "order");
    }

    #[test]
    fn test_quote_identifier_escapes_closing_quote() {
        assert_eq!(Dialect::MySql.quote_identifier("a`b"), "`a``b`");
        assert_eq!(Dialect::MsSql.quote_identifier("a]b"), "[a]]b]");
        assert_eq!(Dialect::PostgreSql.quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_table_name_with_schema() {
        assert_eq!(
            Dialect::MySql.table_name("customer", Some("eplus")),
            "`eplus`.`customer`"
        );
        assert_eq!(
            Dialect::ORACLE.table_name("customer", Some("eplus")),
            "eplus.customer"
        );
        assert_eq!(Dialect::MsSql.table_name("customer", None), "[customer]");
    }

    #[test]
    fn test_format_date() {
        let dt = NaiveDate::from_ymd_opt(2007, 11, 2)
            .unwrap()
            .and_hms_opt(23, 59, 1)
            .unwrap();
        for dialect in [
            Dialect::MySql,
            Dialect::PostgreSql,
            Dialect::MsSql,
            Dialect::ORACLE,
        ] {
            assert_eq!(dialect.format_date(Some(&dt)), "2007-11-02 23:59:01");
            assert_eq!(dialect.format_date(None), ZERO_DATE);
        }
    }

    #[test]
    fn test_magic_primary_key() {
        assert_eq!(Dialect::ORACLE.magic_primary_key_name(), Some("rowid"));
        assert_eq!(Dialect::MySql.magic_primary_key_name(), None);
        assert!(Dialect::ORACLE.is_magic_primary_key("ROWID"));
        assert!(!Dialect::PostgreSql.is_magic_primary_key("rowid"));
        assert_eq!(
            QUOTED_ORACLE.magic_primary_key_projection("customer").as_deref(),
            Some("ROWIDTOCHAR(\"customer\".rowid)")
        );
        assert_eq!(
            Dialect::ORACLE.magic_update_where().as_deref(),
            Some("rowid = CHARTOROWID(?)")
        );
        assert_eq!(Dialect::MsSql.magic_update_where(), None);
    }

    #[test]
    fn test_describe_table_statements() {
        assert_eq!(
            Dialect::MySql.describe_table_statement("sale", None),
            "DESCRIBE `sale`"
        );
        assert_eq!(
            Dialect::MySql.describe_table_statement("sale", Some("shop")),
            "DESCRIBE `shop`.`sale`"
        );
        assert_eq!(
            Dialect::MsSql.describe_table_statement("sale", Some("shop")),
            "SELECT COLUMN_NAME AS [field], DATA_TYPE AS [type] FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_NAME = 'sale' AND TABLE_CATALOG = 'shop'"
        );
        assert_eq!(
            Dialect::ORACLE.describe_table_statement("customer", None),
            "SELECT COLUMN_NAME AS field FROM ALL_TAB_COLUMNS WHERE UPPER(TABLE_NAME) = UPPER('customer')"
        );
        let pg = Dialect::PostgreSql.describe_table_statement("sale", Some("public"));
        assert!(pg.contains("pg_attribute.attname AS field"));
        assert!(pg.contains("pg_class.relname = 'sale'"));
        assert!(pg.contains("pg_namespace.nspname = 'public'"));
    }

    #[test]
    fn test_describe_escapes_literals() {
        let sql = Dialect::MsSql.describe_table_statement("o'brien", None);
        assert!(sql.ends_with("TABLE_NAME = 'o''brien'"));
    }

    #[test]
    fn test_last_insert_id() {
        assert_eq!(
            Dialect::PostgreSql.last_insert_id_statement("sale").unwrap(),
            "SELECT lastval() AS last_insert_id"
        );
        assert_eq!(
            Dialect::ORACLE.last_insert_id_statement("sale").unwrap(),
            "SELECT ROWIDTOCHAR(MAX(rowid)) AS last_insert_id FROM sale"
        );
        assert!(matches!(
            Dialect::MsSql.last_insert_id_statement("sale"),
            Err(GenError::UnsupportedDialectFeature { dialect: "mssql", .. })
        ));
    }

    #[test]
    fn test_like_keyword() {
        assert_eq!(Dialect::PostgreSql.like_keyword(false), "ILIKE");
        assert_eq!(Dialect::PostgreSql.like_keyword(true), "NOT ILIKE");
        assert_eq!(Dialect::MsSql.like_keyword(true), "NOT LIKE");
    }

    #[test]
    fn test_parse_driver_names() {
        assert_eq!("mysqli".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert_eq!("pgsql".parse::<Dialect>().unwrap(), Dialect::PostgreSql);
        assert_eq!("MSSQL".parse::<Dialect>().unwrap(), Dialect::MsSql);
        assert_eq!("oci8".parse::<Dialect>().unwrap(), Dialect::ORACLE);
        assert_eq!("oracle-quoted".parse::<Dialect>().unwrap(), QUOTED_ORACLE);
        assert_eq!(
            "sybase".parse::<Dialect>(),
            Err(GenError::UnknownDialect(String::from("sybase")))
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for dialect in [
            Dialect::MySql,
            Dialect::PostgreSql,
            Dialect::MsSql,
            Dialect::ORACLE,
            QUOTED_ORACLE,
        ] {
            assert_eq!(dialect.to_string().parse::<Dialect>().unwrap(), dialect);
        }
    }
}
