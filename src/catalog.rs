//! In-memory mirror of the tables a session has declared.
//!
//! The mirror is only updated by the session's own DDL helpers. It follows a
//! single invalidation rule: dropping a table removes its entry, and switching
//! or dropping the current database clears everything. DDL issued by anyone
//! else is invisible here; sessions that need to see it run in
//! [`CatalogMode::Live`].

use serde::Deserialize;

use crate::error::{SqlError, SqlResult};

/// Where table and column lookups are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Trust the in-memory mirror.
    #[default]
    Local,
    /// Ask the server (`SHOW TABLES`, `SHOW COLUMNS`) on every lookup.
    Live,
}

/// A free-form column specification such as `"id tinyint unsigned unique"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec(String);

impl ColumnSpec {
    pub fn new(spec: impl Into<String>) -> SqlResult<Self> {
        let spec = spec.into();
        if spec.trim().is_empty() {
            return Err(SqlError::invalid("empty column specification"));
        }
        Ok(Self(spec.trim().to_string()))
    }

    /// Column name: the first whitespace-delimited token.
    pub fn name(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a list of column specification strings.
pub fn column_specs<I, S>(specs: I) -> SqlResult<Vec<ColumnSpec>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    specs.into_iter().map(ColumnSpec::new).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl TableDescriptor {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(ColumnSpec::name).collect()
    }
}

/// Ordered table-name → column-spec mapping.
///
/// `generation` increases on every mutation so callers holding derived data
/// can tell whether it is still current.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<TableDescriptor>,
    generation: u64,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a table. Re-declaring keeps the original position.
    pub fn declare(&mut self, name: &str, columns: Vec<ColumnSpec>) {
        match self.tables.iter_mut().find(|t| t.name == name) {
            Some(existing) => existing.columns = columns,
            None => self.tables.push(TableDescriptor {
                name: name.to_string(),
                columns,
            }),
        }
        self.generation += 1;
    }

    /// Forget a table. Returns whether it was known.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.tables.len();
        self.tables.retain(|t| t.name != name);
        let removed = self.tables.len() != before;
        if removed {
            self.generation += 1;
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.tables.is_empty() {
            self.tables.clear();
            self.generation += 1;
        }
    }

    pub fn get(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Column names in declaration order, `None` for an unknown table.
    pub fn columns(&self, name: &str) -> Option<Vec<&str>> {
        self.get(name).map(TableDescriptor::column_names)
    }

    /// Table names in declaration order.
    pub fn tables(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(list: &[&str]) -> Vec<ColumnSpec> {
        column_specs(list.iter().copied()).unwrap()
    }

    #[test]
    fn test_columns_take_first_token() {
        let mut catalog = Catalog::new();
        catalog.declare("that_table", specs(&["id tinyint unique", "name varchar(255)"]));
        assert_eq!(catalog.columns("that_table"), Some(vec!["id", "name"]));
        assert_eq!(catalog.columns("other"), None);
    }

    #[test]
    fn test_declaration_order() {
        let mut catalog = Catalog::new();
        catalog.declare("orders_combined", specs(&["order_id tinyint"]));
        catalog.declare("customers", specs(&["customer_id tinyint"]));
        catalog.declare("orders", specs(&["order_id tinyint"]));
        catalog.declare("customers", specs(&["customer_id int", "email varchar(255)"]));

        assert_eq!(catalog.tables(), vec!["orders_combined", "customers", "orders"]);
        assert_eq!(catalog.columns("customers"), Some(vec!["customer_id", "email"]));
    }

    #[test]
    fn test_generation_and_invalidation() {
        let mut catalog = Catalog::new();
        assert_eq!(catalog.generation(), 0);
        catalog.declare("a", specs(&["id int"]));
        catalog.declare("b", specs(&["id int"]));
        assert_eq!(catalog.generation(), 2);

        assert!(catalog.remove("a"));
        assert!(!catalog.remove("a"));
        assert_eq!(catalog.generation(), 3);

        catalog.clear();
        assert!(catalog.is_empty());
        assert_eq!(catalog.generation(), 4);
    }

    #[test]
    fn test_column_spec_rejects_blank() {
        assert!(ColumnSpec::new("   ").is_err());
        let spec = ColumnSpec::new("  price float(15, 5) ").unwrap();
        assert_eq!(spec.name(), "price");
        assert_eq!(spec.as_str(), "price float(15, 5)");
    }
}
