//! Table definitions and the bundled `tech_store` schema.

use std::path::{Path, PathBuf};

use crate::catalog::{column_specs, ColumnSpec};
use crate::error::SqlResult;

/// A table to declare, optionally with a CSV fixture to load into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub csv: Option<PathBuf>,
}

impl TableDefinition {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> SqlResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            name: name.into(),
            columns: column_specs(columns)?,
            csv: None,
        })
    }

    /// Attach a CSV fixture path.
    pub fn with_csv(mut self, path: impl Into<PathBuf>) -> Self {
        self.csv = Some(path.into());
        self
    }
}

pub const TECH_STORE: &str = "tech_store";

/// The four `tech_store` tables with fixtures under `data_dir`.
pub fn tech_store(data_dir: &Path) -> SqlResult<Vec<TableDefinition>> {
    Ok(vec![
        TableDefinition::new(
            "orders_combined",
            [
                "order_id tinyint unsigned unique",
                "date_time timestamp",
                "customer_name varchar(255)",
                "customer_email varchar(255)",
                "product_name varchar(255)",
                "product_price float(15, 5)",
            ],
        )?
        .with_csv(data_dir.join("orders_combined.csv")),
        TableDefinition::new(
            "customers",
            [
                "customer_id tinyint unsigned unique",
                "customer_name varchar(255)",
                "email varchar(255)",
            ],
        )?
        .with_csv(data_dir.join("customers.csv")),
        TableDefinition::new(
            "orders",
            [
                "order_id tinyint unsigned unique",
                "date_time timestamp",
                "customer_id tinyint unsigned",
                "product_id tinyint unsigned",
            ],
        )?
        .with_csv(data_dir.join("orders.csv")),
        TableDefinition::new(
            "products",
            [
                "product_id tinyint unsigned unique",
                "product_name varchar(255)",
                "price float(15, 5)",
            ],
        )?
        .with_csv(data_dir.join("products.csv")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_loader::read_csv;

    #[test]
    fn test_tech_store_layout() {
        let tables = tech_store(Path::new("data")).unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["orders_combined", "customers", "orders", "products"]);

        let orders = &tables[2];
        let cols: Vec<&str> = orders.columns.iter().map(ColumnSpec::name).collect();
        assert_eq!(cols, vec!["order_id", "date_time", "customer_id", "product_id"]);
        assert_eq!(orders.csv.as_deref(), Some(Path::new("data/orders.csv")));
    }

    #[test]
    fn test_bundled_fixtures_match_schema() {
        let data_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        for table in tech_store(&data_dir).unwrap() {
            let csv = read_csv(table.csv.as_ref().unwrap()).unwrap();
            assert_eq!(csv.headers.len(), table.columns.len(), "{}", table.name);
            assert!(!csv.rows.is_empty(), "{}", table.name);
            for row in &csv.rows {
                assert_eq!(row.len(), table.columns.len(), "{}", table.name);
            }
        }
    }
}
