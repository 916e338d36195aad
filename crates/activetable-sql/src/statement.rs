//! Structured SELECT statement.
//!
//! The renderer fills a [`SelectStatement`] clause by clause and the
//! pagination strategies adjust its `top`, `order_by` and `limit` slots before
//! it is turned into text. Bind values are tracked separately by the renderer;
//! this type only holds SQL text.

use std::fmt;

/// A SELECT split into its clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectStatement {
    /// Row count for `SELECT TOP (n)`.
    pub top: Option<u64>,
    /// Projected expressions, already aliased.
    pub projection: Vec<String>,
    /// FROM items, comma separated.
    pub from: Vec<String>,
    /// JOIN clauses following the FROM list.
    pub joins: Vec<String>,
    /// Body of the WHERE clause.
    pub filter: Option<String>,
    /// Expression list after `ORDER BY`.
    pub order_by: Option<String>,
    /// Trailing clause such as `LIMIT 10`.
    pub limit: Option<String>,
}

impl SelectStatement {
    /// Creates a statement selecting `projection` from `from`.
    #[must_use]
    pub fn new(projection: Vec<String>, from: String) -> Self {
        Self {
            projection,
            from: vec![from],
            ..Self::default()
        }
    }

    /// Renders the statement, one clause per line.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = String::from("SELECT\n");

        if let Some(n) = self.top {
            sql.push_str(&format!("TOP ({n})\n"));
        }

        sql.push_str(&self.projection.join(",\n"));

        sql.push_str("\nFROM ");
        sql.push_str(&self.from.join(", "));

        for join in &self.joins {
            sql.push('\n');
            sql.push_str(join);
        }

        if let Some(ref filter) = self.filter {
            sql.push_str("\nWHERE ");
            sql.push_str(filter);
        }

        if let Some(ref order_by) = self.order_by {
            sql.push_str("\nORDER BY ");
            sql.push_str(order_by);
        }

        if let Some(ref limit) = self.limit {
            sql.push('\n');
            sql.push_str(limit);
        }

        sql
    }
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_select() {
        let stmt = SelectStatement::new(vec![String::from("a AS cx_0")], String::from("t"));
        assert_eq!(stmt.to_sql(), "SELECT\na AS cx_0\nFROM t");
    }

    #[test]
    fn test_every_clause() {
        let stmt = SelectStatement {
            top: Some(5),
            projection: vec![String::from("t.a AS cx_0"), String::from("u.b AS c0_0")],
            from: vec![String::from("t"), String::from("v v")],
            joins: vec![String::from("INNER JOIN u u ON t.id = u.id")],
            filter: Some(String::from("t.a = ?\nAND t.b IS NULL")),
            order_by: Some(String::from("t.a DESC")),
            limit: Some(String::from("LIMIT 5")),
        };
        assert_eq!(
            stmt.to_string(),
            "SELECT\nTOP (5)\nt.a AS cx_0,\nu.b AS c0_0\nFROM t, v v\n\
             INNER JOIN u u ON t.id = u.id\nWHERE t.a = ?\nAND t.b IS NULL\n\
             ORDER BY t.a DESC\nLIMIT 5"
        );
    }
}
