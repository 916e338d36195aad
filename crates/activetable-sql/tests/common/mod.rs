#![allow(dead_code)]

use activetable_sql::{
    render, Dialect, Direction, JoinSpec, OrderColumn, Predicate, QuerySpec, RenderedQuery, Verb,
};

pub const QUOTED_ORACLE: Dialect = Dialect::Oracle {
    quote_identifiers: true,
};

pub fn all_dialects() -> [Dialect; 5] {
    [
        Dialect::MySql,
        Dialect::PostgreSql,
        Dialect::MsSql,
        Dialect::ORACLE,
        QUOTED_ORACLE,
    ]
}

pub fn render_ok(spec: &QuerySpec, dialect: Dialect) -> RenderedQuery {
    render(Verb::Select, spec, dialect)
        .unwrap_or_else(|e| panic!("Failed to render for {dialect}: {e}\nSpec: {spec:?}"))
}

/// Counts `?` placeholders outside string literals.
pub fn count_placeholders(sql: &str) -> usize {
    let mut in_literal = false;
    let mut count = 0;
    for c in sql.chars() {
        match c {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => count += 1,
            _ => {}
        }
    }
    count
}

/// `customer` joined to `sales_category_lookup`, filtered on state.
pub fn customer_spec() -> QuerySpec {
    QuerySpec::table("customer")
        .columns(&["cust_number", "company_name"])
        .join(JoinSpec::inner(
            "customer",
            "sales_category_id",
            "sales_category_lookup",
            "sales_category_id",
        ))
        .join_columns(0, &["sales_category_desc"])
        .filter(Predicate::eq("customer", "state", "MN"))
}

/// `sale` joined to `sale_status`, ordered by id.
pub fn sale_spec() -> QuerySpec {
    QuerySpec::table("sale")
        .columns(&["sale_id", "total"])
        .join(JoinSpec::inner(
            "sale",
            "sale_status_id",
            "sale_status",
            "sale_status_id",
        ))
        .join_columns(0, &["status_name"])
        .order_by(vec![OrderColumn::new("sale", "sale_id")], Direction::Asc)
}
