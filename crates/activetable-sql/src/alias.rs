//! Positional column aliases.
//!
//! Every projected column is selected under a short alias that encodes its
//! scope and its ordinal within that scope:
//!
//! | Scope | Alias |
//! |---|---|
//! | primary table | `cx_<i>` |
//! | join at position `j` | `c<j>_<i>` |
//! | computed expression | `cvirt_<i>` |
//!
//! The aliases stay under Oracle's 30 character limit and never collide with
//! reserved words. The [`AliasMap`] captured while building the projection is
//! the only way back from an alias to a `(table, column)` pair; it is returned
//! with the rendered query and must be kept until the result rows are read.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::dialect::Dialect;
use crate::error::{GenError, Result};
use crate::spec::{ColumnRef, QuerySpec};

/// Helper column added by Oracle pagination; never part of a decoded row.
pub const ROW_NUMBER_ALIAS: &str = "rnum";

/// Scope tag of primary-table aliases.
pub const PRIMARY_SCOPE_TAG: &str = "x";

/// Scope tag of computed-expression aliases.
pub const VIRTUAL_SCOPE_TAG: &str = "virt";

/// Which part of the query a projected column belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The primary table.
    Primary,
    /// The join at this position.
    Join(usize),
    /// A computed expression.
    Virtual,
}

/// A parsed positional alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnAlias {
    /// Scope of the column.
    pub scope: Scope,
    /// Position within the scope.
    pub ordinal: usize,
}

impl ColumnAlias {
    /// Creates an alias.
    #[must_use]
    pub const fn new(scope: Scope, ordinal: usize) -> Self {
        Self { scope, ordinal }
    }

    /// Parses an alias as read back from a result row, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnknownAlias`] for text that is not a positional alias.
    pub fn parse(alias: &str) -> Result<Self> {
        let unknown = || GenError::UnknownAlias(alias.to_string());

        let rest = alias
            .strip_prefix('c')
            .or_else(|| alias.strip_prefix('C'))
            .ok_or_else(unknown)?;
        let (tag, ordinal) = rest.split_once('_').ok_or_else(unknown)?;
        let ordinal = ordinal.parse::<usize>().map_err(|_| unknown())?;

        let scope = if tag.eq_ignore_ascii_case(PRIMARY_SCOPE_TAG) {
            Scope::Primary
        } else if tag.eq_ignore_ascii_case(VIRTUAL_SCOPE_TAG) {
            Scope::Virtual
        } else if !tag.is_empty() && tag.bytes().all(|b| b.is_ascii_digit()) {
            Scope::Join(tag.parse().map_err(|_| unknown())?)
        } else {
            return Err(unknown());
        };

        Ok(Self { scope, ordinal })
    }
}

impl fmt::Display for ColumnAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Primary => write!(f, "c{PRIMARY_SCOPE_TAG}_{}", self.ordinal),
            Scope::Join(j) => write!(f, "c{j}_{}", self.ordinal),
            Scope::Virtual => write!(f, "c{VIRTUAL_SCOPE_TAG}_{}", self.ordinal),
        }
    }
}

/// Columns selected from one join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinColumns {
    /// Alias the joined table is referenced by.
    pub table_alias: String,
    /// Column names, by ordinal.
    pub columns: Vec<String>,
}

/// Reverse mapping from positional aliases to the columns they stand for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    primary_table: String,
    primary: Vec<String>,
    joins: Vec<JoinColumns>,
    virtuals: Vec<String>,
}

/// A decoded result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedColumn {
    /// Scope of the column.
    pub scope: Scope,
    /// Primary table name or join alias; `None` for computed expressions.
    pub table: Option<String>,
    /// Column name, or the name of the computed expression.
    pub column: String,
}

/// A result row split by scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRow<V> {
    /// Primary-table columns by name.
    pub primary: BTreeMap<String, V>,
    /// Joined columns by join alias, then column name.
    pub joins: BTreeMap<String, BTreeMap<String, V>>,
    /// Computed expressions by name.
    pub virtuals: BTreeMap<String, V>,
}

impl<V> Default for DecodedRow<V> {
    fn default() -> Self {
        Self {
            primary: BTreeMap::new(),
            joins: BTreeMap::new(),
            virtuals: BTreeMap::new(),
        }
    }
}

impl AliasMap {
    /// Creates an empty map for a query on `primary_table`.
    #[must_use]
    pub fn new(primary_table: impl Into<String>) -> Self {
        Self {
            primary_table: primary_table.into(),
            ..Self::default()
        }
    }

    /// Registers the next join; columns are pushed onto it by position.
    pub fn register_join(&mut self, table_alias: impl Into<String>) {
        self.joins.push(JoinColumns {
            table_alias: table_alias.into(),
            columns: vec![],
        });
    }

    /// Adds a primary-table column and returns its alias.
    pub fn push_primary(&mut self, column: impl Into<String>) -> ColumnAlias {
        self.primary.push(column.into());
        ColumnAlias::new(Scope::Primary, self.primary.len() - 1)
    }

    /// Adds a column of the join at `join` and returns its alias.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnknownJoinIndex`] when no such join was registered.
    pub fn push_join(&mut self, join: usize, column: impl Into<String>) -> Result<ColumnAlias> {
        let entry = self
            .joins
            .get_mut(join)
            .ok_or(GenError::UnknownJoinIndex(join))?;
        entry.columns.push(column.into());
        Ok(ColumnAlias::new(Scope::Join(join), entry.columns.len() - 1))
    }

    /// Adds a computed expression and returns its alias.
    pub fn push_virtual(&mut self, name: impl Into<String>) -> ColumnAlias {
        self.virtuals.push(name.into());
        ColumnAlias::new(Scope::Virtual, self.virtuals.len() - 1)
    }

    /// Name of the primary table.
    #[must_use]
    pub fn primary_table(&self) -> &str {
        &self.primary_table
    }

    /// Primary-table columns, by ordinal.
    #[must_use]
    pub fn primary_columns(&self) -> &[String] {
        &self.primary
    }

    /// Registered joins, by position.
    #[must_use]
    pub fn joins(&self) -> &[JoinColumns] {
        &self.joins
    }

    /// Computed expression names, by ordinal.
    #[must_use]
    pub fn virtual_columns(&self) -> &[String] {
        &self.virtuals
    }

    /// Total number of projected columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.primary.len()
            + self.joins.iter().map(|j| j.columns.len()).sum::<usize>()
            + self.virtuals.len()
    }

    /// Returns true when nothing is projected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alias of the first projected column.
    #[must_use]
    pub fn first_alias(&self) -> Option<ColumnAlias> {
        if !self.primary.is_empty() {
            return Some(ColumnAlias::new(Scope::Primary, 0));
        }
        self.joins
            .iter()
            .position(|j| !j.columns.is_empty())
            .map(|j| ColumnAlias::new(Scope::Join(j), 0))
            .or_else(|| (!self.virtuals.is_empty()).then_some(ColumnAlias::new(Scope::Virtual, 0)))
    }

    /// Finds the alias of `table.column`, where `table` is the primary table
    /// or a join alias. Names match case-insensitively.
    #[must_use]
    pub fn alias_for(&self, table: &str, column: &str) -> Option<ColumnAlias> {
        let position = |columns: &[String]| {
            columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(column))
        };

        if table.eq_ignore_ascii_case(&self.primary_table) {
            if let Some(i) = position(&self.primary) {
                return Some(ColumnAlias::new(Scope::Primary, i));
            }
        }
        self.joins.iter().enumerate().find_map(|(j, join)| {
            if join.table_alias.eq_ignore_ascii_case(table) {
                position(&join.columns).map(|i| ColumnAlias::new(Scope::Join(j), i))
            } else {
                None
            }
        })
    }

    /// Looks up the column an alias stands for.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnknownAlias`] when the ordinal or join position
    /// was never allocated.
    pub fn resolve(&self, alias: ColumnAlias) -> Result<DecodedColumn> {
        let unknown = || GenError::UnknownAlias(alias.to_string());
        let (table, column) = match alias.scope {
            Scope::Primary => (
                Some(self.primary_table.clone()),
                self.primary.get(alias.ordinal).ok_or_else(unknown)?,
            ),
            Scope::Join(j) => {
                let join = self.joins.get(j).ok_or_else(unknown)?;
                (
                    Some(join.table_alias.clone()),
                    join.columns.get(alias.ordinal).ok_or_else(unknown)?,
                )
            }
            Scope::Virtual => (None, self.virtuals.get(alias.ordinal).ok_or_else(unknown)?),
        };
        Ok(DecodedColumn {
            scope: alias.scope,
            table,
            column: column.clone(),
        })
    }

    /// Parses and resolves a result column name.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnknownAlias`] when the name is not an alias of
    /// this query.
    pub fn decode(&self, alias: &str) -> Result<DecodedColumn> {
        self.resolve(ColumnAlias::parse(alias)?)
            .map_err(|_| GenError::UnknownAlias(alias.to_string()))
    }

    /// Splits a flat result row into primary, joined and computed columns.
    ///
    /// The `rnum` helper column of Oracle pagination is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnknownAlias`] for any other column that is not an
    /// alias of this query.
    pub fn decode_row<K, V, I>(&self, row: I) -> Result<DecodedRow<V>>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut decoded = DecodedRow::default();
        for (key, value) in row {
            let key = key.as_ref();
            if key.eq_ignore_ascii_case(ROW_NUMBER_ALIAS) {
                continue;
            }
            let column = self.decode(key)?;
            match (column.scope, column.table) {
                (Scope::Join(_), Some(table)) => {
                    decoded
                        .joins
                        .entry(table)
                        .or_default()
                        .insert(column.column, value);
                }
                (Scope::Virtual, _) => {
                    decoded.virtuals.insert(column.column, value);
                }
                _ => {
                    decoded.primary.insert(column.column, value);
                }
            }
        }
        Ok(decoded)
    }
}

/// Builds the projection list of `spec` and the map to decode its results.
///
/// Primary-table columns come first, then the magic primary key when one was
/// requested, then joined columns in join order, then computed expressions.
/// A primary column naming the dialect's magic key is not selected as an
/// ordinary column; it is projected once, through
/// [`Dialect::magic_primary_key_projection`], as the last primary alias.
///
/// # Errors
///
/// - [`GenError::UnknownJoinIndex`] for a column of a missing join.
/// - [`GenError::EmptyProjection`] when nothing ends up selected.
pub fn encode_projection(dialect: Dialect, spec: &QuerySpec) -> Result<(Vec<String>, AliasMap)> {
    let primary = &spec.from.name;
    let mut map = AliasMap::new(primary.clone());
    for join in &spec.joins {
        map.register_join(join.foreign_alias());
    }

    let mut projection = Vec::with_capacity(spec.columns.len());
    let mut wants_magic_key = None;

    for column in &spec.columns {
        if let ColumnRef::Primary { column } = column {
            if dialect.is_magic_primary_key(column) {
                if wants_magic_key.is_none() {
                    wants_magic_key = Some(column.clone());
                }
                continue;
            }
            let alias = map.push_primary(column.clone());
            projection.push(aliased(dialect, dialect.qualify(primary, column), alias));
        }
    }

    if let Some(name) = wants_magic_key {
        if let Some(expression) = dialect.magic_primary_key_projection(primary) {
            let alias = map.push_primary(name);
            projection.push(aliased(dialect, expression, alias));
        }
    }

    for column in &spec.columns {
        if let ColumnRef::Join { join, column } = column {
            let table = spec
                .joins
                .get(*join)
                .ok_or(GenError::UnknownJoinIndex(*join))?
                .foreign_alias();
            let alias = map.push_join(*join, column.clone())?;
            projection.push(aliased(dialect, dialect.qualify(table, column), alias));
        }
    }

    for column in &spec.columns {
        if let ColumnRef::Virtual { name, expression } = column {
            let alias = map.push_virtual(name.clone());
            projection.push(aliased(dialect, expression.clone(), alias));
        }
    }

    if projection.is_empty() {
        return Err(GenError::EmptyProjection);
    }

    Ok((projection, map))
}

fn aliased(dialect: Dialect, expression: String, alias: ColumnAlias) -> String {
    format!("{expression} AS {}", dialect.quote_alias(&alias.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::JoinSpec;

    fn customer() -> QuerySpec {
        QuerySpec::table("customer")
            .columns(&["cust_number", "company_name"])
            .join(JoinSpec::inner(
                "customer",
                "sales_category_id",
                "sales_category_lookup",
                "sales_category_id",
            ))
            .join_columns(0, &["sales_category_desc"])
    }

    #[test]
    fn test_alias_display() {
        assert_eq!(ColumnAlias::new(Scope::Primary, 0).to_string(), "cx_0");
        assert_eq!(ColumnAlias::new(Scope::Join(3), 12).to_string(), "c3_12");
        assert_eq!(ColumnAlias::new(Scope::Virtual, 1).to_string(), "cvirt_1");
    }

    #[test]
    fn test_alias_parse_ignores_case() {
        assert_eq!(
            ColumnAlias::parse("CX_4").unwrap(),
            ColumnAlias::new(Scope::Primary, 4)
        );
        assert_eq!(
            ColumnAlias::parse("cVIRT_0").unwrap(),
            ColumnAlias::new(Scope::Virtual, 0)
        );
        assert_eq!(
            ColumnAlias::parse("c10_2").unwrap(),
            ColumnAlias::new(Scope::Join(10), 2)
        );
    }

    #[test]
    fn test_alias_parse_rejects_garbage() {
        for text in ["", "x_1", "c", "cx", "cx_", "cx_a", "cy_1", "c-1_0", "company_name"] {
            assert_eq!(
                ColumnAlias::parse(text),
                Err(GenError::UnknownAlias(text.to_string())),
                "{text}"
            );
        }
    }

    #[test]
    fn test_encode_projection_mysql() {
        let (projection, map) = encode_projection(Dialect::MySql, &customer()).unwrap();
        assert_eq!(
            projection,
            vec![
                "`customer`.`cust_number` AS `cx_0`",
                "`customer`.`company_name` AS `cx_1`",
                "`sales_category_lookup`.`sales_category_desc` AS `c0_0`",
            ]
        );
        assert_eq!(map.len(), 3);
        assert_eq!(map.primary_table(), "customer");
    }

    #[test]
    fn test_encode_projection_oracle_bare_aliases() {
        let (projection, _) = encode_projection(Dialect::ORACLE, &customer()).unwrap();
        assert_eq!(projection[0], "customer.cust_number AS cx_0");
        assert_eq!(
            projection[2],
            "sales_category_lookup.sales_category_desc AS c0_0"
        );
    }

    #[test]
    fn test_magic_key_appended_once_and_last() {
        let spec = QuerySpec::table("customer").columns(&["rowid", "cust_number", "ROWID"]);
        let (projection, map) = encode_projection(Dialect::ORACLE, &spec).unwrap();
        assert_eq!(
            projection,
            vec![
                "customer.cust_number AS cx_0",
                "ROWIDTOCHAR(customer.rowid) AS cx_1",
            ]
        );
        assert_eq!(map.primary_columns(), ["cust_number", "rowid"]);
    }

    #[test]
    fn test_rowid_is_ordinary_column_without_magic_key() {
        let spec = QuerySpec::table("t").columns(&["rowid"]);
        let (projection, _) = encode_projection(Dialect::PostgreSql, &spec).unwrap();
        assert_eq!(projection, vec!["\"t\".\"rowid\" AS cx_0"]);
    }

    #[test]
    fn test_virtual_columns_projected_last() {
        let spec = QuerySpec::table("sale")
            .column(ColumnRef::virtual_column("total_tax", "SUM(tax)"))
            .columns(&["sale_id"]);
        let (projection, map) = encode_projection(Dialect::MsSql, &spec).unwrap();
        assert_eq!(
            projection,
            vec!["[sale].[sale_id] AS [cx_0]", "SUM(tax) AS [cvirt_0]"]
        );
        assert_eq!(map.decode("cvirt_0").unwrap().column, "total_tax");
    }

    #[test]
    fn test_alias_for_matches_primary_and_join() {
        let (_, map) = encode_projection(Dialect::MySql, &customer()).unwrap();
        assert_eq!(
            map.alias_for("CUSTOMER", "company_name"),
            Some(ColumnAlias::new(Scope::Primary, 1))
        );
        assert_eq!(
            map.alias_for("sales_category_lookup", "sales_category_desc"),
            Some(ColumnAlias::new(Scope::Join(0), 0))
        );
        assert_eq!(map.alias_for("customer", "state"), None);
    }

    #[test]
    fn test_first_alias_follows_projection_order() {
        let (_, map) = encode_projection(Dialect::MySql, &customer()).unwrap();
        assert_eq!(map.first_alias(), Some(ColumnAlias::new(Scope::Primary, 0)));

        let spec = QuerySpec::table("sale")
            .join(JoinSpec::inner("sale", "a_id", "a", "a_id"))
            .join(JoinSpec::inner("sale", "b_id", "b", "b_id"))
            .join_columns(1, &["name"]);
        let (_, map) = encode_projection(Dialect::MySql, &spec).unwrap();
        assert_eq!(map.first_alias(), Some(ColumnAlias::new(Scope::Join(1), 0)));
        assert_eq!(AliasMap::new("sale").first_alias(), None);
    }

    #[test]
    fn test_decode_row_splits_scopes() {
        let spec = customer()
            .join(JoinSpec::left("customer", "rep_id", "staff", "staff_id").alias("rep"))
            .join_columns(1, &["last_name"])
            .column(ColumnRef::virtual_column("n", "1"));
        let (_, map) = encode_projection(Dialect::ORACLE, &spec).unwrap();

        let row = vec![
            ("CX_0", "C100"),
            ("CX_1", "Acme"),
            ("C0_0", "Retail"),
            ("C1_0", "Smith"),
            ("CVIRT_0", "1"),
            ("RNUM", "2"),
        ];
        let decoded = map.decode_row(row).unwrap();
        assert_eq!(decoded.primary["cust_number"], "C100");
        assert_eq!(decoded.primary["company_name"], "Acme");
        assert_eq!(decoded.joins["sales_category_lookup"]["sales_category_desc"], "Retail");
        assert_eq!(decoded.joins["rep"]["last_name"], "Smith");
        assert_eq!(decoded.virtuals["n"], "1");
    }

    #[test]
    fn test_decode_unknown_alias() {
        let (_, map) = encode_projection(Dialect::MySql, &customer()).unwrap();
        assert_eq!(
            map.decode("cx_9"),
            Err(GenError::UnknownAlias(String::from("cx_9")))
        );
        assert_eq!(
            map.decode("c4_0"),
            Err(GenError::UnknownAlias(String::from("c4_0")))
        );
        assert!(map.decode_row(vec![("state", 1)]).is_err());
    }

    #[test]
    fn test_encode_rejects_missing_join() {
        let spec = QuerySpec::table("sale").join_columns(0, &["status_name"]);
        assert_eq!(
            encode_projection(Dialect::MySql, &spec),
            Err(GenError::UnknownJoinIndex(0))
        );
    }

    #[test]
    fn test_encode_rejects_empty_projection() {
        assert_eq!(
            encode_projection(Dialect::MySql, &QuerySpec::table("sale")),
            Err(GenError::EmptyProjection)
        );
        let spec = QuerySpec::table("customer").columns(&["rowid"]);
        assert!(encode_projection(Dialect::ORACLE, &spec).is_ok());
    }
}
