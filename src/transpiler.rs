//! SQL builders.
//!
//! Identifiers are validated and placed in the text; values are always
//! emitted as `?` placeholders and carried in [`Statement::params`].

use crate::ast::*;
use crate::catalog::ColumnSpec;
use crate::error::{SqlError, SqlResult};
use crate::parser::identifier;
use crate::value::Value;

/// Trait for converting builder nodes to SQL text.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

impl ToSql for Condition {
    fn to_sql(&self) -> String {
        format!("{} {} ?", self.column, self.op)
    }
}

impl ToSql for Assignment {
    fn to_sql(&self) -> String {
        format!("{} = ?", self.column)
    }
}

impl ToSql for Columns {
    fn to_sql(&self) -> String {
        match self {
            Columns::All => "*".to_string(),
            Columns::List(cols) => cols.join(", "),
        }
    }
}

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }
}

pub fn create_database(name: &str) -> SqlResult<String> {
    Ok(format!("CREATE DATABASE IF NOT EXISTS {}", identifier(name)?))
}

pub fn drop_database(name: &str) -> SqlResult<String> {
    Ok(format!("DROP DATABASE IF EXISTS {}", identifier(name)?))
}

pub fn use_database(name: &str) -> SqlResult<String> {
    Ok(format!("USE {}", identifier(name)?))
}

/// `CREATE TABLE IF NOT EXISTS t (spec, spec, …)`
pub fn create_table(table: &str, columns: &[ColumnSpec]) -> SqlResult<String> {
    if columns.is_empty() {
        return Err(SqlError::invalid(format!("table {} has no columns", table)));
    }
    for spec in columns {
        identifier(spec.name())?;
    }
    let specs: Vec<&str> = columns.iter().map(ColumnSpec::as_str).collect();
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        identifier(table)?,
        specs.join(", ")
    ))
}

pub fn drop_table(table: &str) -> SqlResult<String> {
    Ok(format!("DROP TABLE IF EXISTS {}", identifier(table)?))
}

/// `INSERT INTO t (a, b) VALUES (?, ?)`
pub fn insert(table: &str, columns: &[&str]) -> SqlResult<String> {
    if columns.is_empty() {
        return Err(SqlError::invalid(format!("no columns to insert into {}", table)));
    }
    for col in columns {
        identifier(col)?;
    }
    let placeholders = vec!["?"; columns.len()];
    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        identifier(table)?,
        columns.join(", "),
        placeholders.join(", ")
    ))
}

/// `SELECT cols FROM source`. `source` may be a join clause and is not validated.
pub fn select(source: &str, columns: &Columns) -> SqlResult<String> {
    let source = source.trim();
    if source.is_empty() {
        return Err(SqlError::invalid("select needs a table or join clause"));
    }
    if let Columns::List(cols) = columns {
        for col in cols {
            if !is_column_ref(col) {
                return Err(SqlError::InvalidIdentifier(col.clone()));
            }
        }
    }
    Ok(format!("SELECT {} FROM {}", columns.to_sql(), source))
}

/// Column references in a select list may be `table.column` or `table.*`.
fn is_column_ref(col: &str) -> bool {
    match col.rsplit_once('.') {
        Some((table, "*")) => crate::parser::is_identifier(table),
        _ => crate::parser::is_identifier(col),
    }
}

fn where_clause(conditions: &[Condition], params: &mut Vec<Value>) -> SqlResult<String> {
    if conditions.is_empty() {
        return Err(SqlError::invalid("at least one condition is required"));
    }
    let mut parts = Vec::with_capacity(conditions.len());
    for cond in conditions {
        identifier(&cond.column)?;
        parts.push(cond.to_sql());
        params.push(cond.value.clone());
    }
    Ok(parts.join(" AND "))
}

/// `UPDATE t SET a = ?, … WHERE c <op> ? AND …`
pub fn update(table: &str, assignments: &[Assignment], conditions: &[Condition]) -> SqlResult<Statement> {
    if assignments.is_empty() {
        return Err(SqlError::invalid(format!("nothing to update in {}", table)));
    }
    let mut params = Vec::with_capacity(assignments.len() + conditions.len());
    let mut set_clauses = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        identifier(&assignment.column)?;
        set_clauses.push(assignment.to_sql());
        params.push(assignment.value.clone());
    }
    let where_sql = where_clause(conditions, &mut params)?;

    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {}",
            identifier(table)?,
            set_clauses.join(", "),
            where_sql
        ),
        params,
    })
}

/// `DELETE FROM t WHERE c <op> ? AND …`
pub fn delete(table: &str, conditions: &[Condition]) -> SqlResult<Statement> {
    let mut params = Vec::with_capacity(conditions.len());
    let where_sql = where_clause(conditions, &mut params)?;
    Ok(Statement {
        sql: format!("DELETE FROM {} WHERE {}", identifier(table)?, where_sql),
        params,
    })
}

pub fn add_primary_key(table: &str, column: &str) -> SqlResult<String> {
    Ok(format!(
        "ALTER TABLE {} ADD PRIMARY KEY ({})",
        identifier(table)?,
        identifier(column)?
    ))
}

pub fn add_foreign_key(
    table: &str,
    column: &str,
    referenced_table: &str,
    referenced_column: &str,
) -> SqlResult<String> {
    Ok(format!(
        "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {}({})",
        identifier(table)?,
        identifier(column)?,
        identifier(referenced_table)?,
        identifier(referenced_column)?
    ))
}

/// Star join anchored on the first table.
///
/// Table `i` (for `i >= 1`) is joined on `tables[0].columns[i-1] =
/// tables[i].columns[i-1]`. The result keeps a trailing space so it can be
/// followed directly by more clause text.
pub fn join(tables: &[&str], join_type: JoinType, columns: &[&str]) -> SqlResult<String> {
    let Some((first, rest)) = tables.split_first() else {
        return Err(SqlError::invalid("join needs at least one table"));
    };
    if columns.len() < rest.len() {
        return Err(SqlError::invalid(format!(
            "join of {} tables needs {} join columns, got {}",
            tables.len(),
            rest.len(),
            columns.len()
        )));
    }

    let mut sql = format!("{} ", identifier(first)?);
    for (table, column) in rest.iter().zip(columns) {
        let table = identifier(table)?;
        let column = identifier(column)?;
        sql.push_str(&format!(
            "{} join {} on {}.{} = {}.{} ",
            join_type, table, first, column, table, column
        ));
    }
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_star_join() {
        let sql = join(
            &["orders", "products", "customers"],
            JoinType::Inner,
            &["product_id", "customer_id"],
        )
        .unwrap();
        assert_eq!(
            sql,
            "orders inner join products on orders.product_id = products.product_id \
             inner join customers on orders.customer_id = customers.customer_id "
        );
    }

    #[test]
    fn test_join_single_table_and_short_columns() {
        assert_eq!(join(&["orders"], JoinType::Left, &[]).unwrap(), "orders ");
        assert!(join(&["orders", "products"], JoinType::Inner, &[]).is_err());
        assert!(join(&[], JoinType::Inner, &[]).is_err());
    }

    #[test]
    fn test_update_binds_values() {
        let stmt = update(
            "products",
            &[("product_name", "Phone").into(), ("price", 10000).into()],
            &[Condition::eq("product_name", "Smartphone")],
        )
        .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE products SET product_name = ?, price = ? WHERE product_name = ?"
        );
        assert_eq!(
            stmt.params,
            vec![
                Value::Text("Phone".into()),
                Value::Int(10000),
                Value::Text("Smartphone".into())
            ]
        );
    }

    #[test]
    fn test_delete_joins_conditions_with_and() {
        let stmt = delete(
            "products",
            &[
                Condition::eq("product_name", "Phone"),
                Condition::new("price", Operator::Gt, 100.5),
            ],
        )
        .unwrap();
        assert_eq!(stmt.sql, "DELETE FROM products WHERE product_name = ? AND price > ?");
        assert_eq!(stmt.params.len(), 2);
    }

    #[test]
    fn test_values_never_reach_sql_text() {
        let stmt = delete("products", &[Condition::eq("name", "x'; drop table products; --")]).unwrap();
        assert!(!stmt.sql.contains("drop"));
    }

    #[test]
    fn test_rejects_bad_identifiers_and_empty_clauses() {
        assert!(matches!(
            delete("products; drop", &[Condition::eq("id", 1)]),
            Err(SqlError::InvalidIdentifier(_))
        ));
        assert!(delete("products", &[]).is_err());
        assert!(update("products", &[], &[Condition::eq("id", 1)]).is_err());
    }

    #[test]
    fn test_insert() {
        assert_eq!(
            insert("products", &["id", "name", "price"]).unwrap(),
            "INSERT INTO products (id, name, price) VALUES (?, ?, ?)"
        );
        assert!(insert("products", &[]).is_err());
    }

    #[test]
    fn test_select() {
        assert_eq!(select("new_table", &Columns::All).unwrap(), "SELECT * FROM new_table");
        assert_eq!(
            select("new_table", &Columns::from(["last_name", "country"])).unwrap(),
            "SELECT last_name, country FROM new_table"
        );
        assert_eq!(
            select("orders inner join products on orders.product_id = products.product_id ", &Columns::from("orders.*"))
                .unwrap(),
            "SELECT orders.* FROM orders inner join products on orders.product_id = products.product_id"
        );
    }

    #[test]
    fn test_create_table() {
        let cols = crate::catalog::column_specs(["id tinyint unsigned unique", "price float(15, 5)"]).unwrap();
        assert_eq!(
            create_table("products", &cols).unwrap(),
            "CREATE TABLE IF NOT EXISTS products (id tinyint unsigned unique, price float(15, 5))"
        );
        assert!(create_table("products", &[]).is_err());
    }

    #[test]
    fn test_keys() {
        assert_eq!(
            add_primary_key("orders", "order_id").unwrap(),
            "ALTER TABLE orders ADD PRIMARY KEY (order_id)"
        );
        assert_eq!(
            add_foreign_key("customers", "order_id", "orders", "order_id").unwrap(),
            "ALTER TABLE customers ADD FOREIGN KEY (order_id) REFERENCES orders(order_id)"
        );
    }
}
