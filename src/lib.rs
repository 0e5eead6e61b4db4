//! # connect-sql — a thin MySQL session layer
//!
//! Connect with credentials from the environment, declare tables from column
//! specifications, bulk-load CSV fixtures and issue common mutations and joins
//! through small builders.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use connect_sql::prelude::*;
//!
//! let creds = Config::load(None)?.credentials("tech_store_db")?;
//! let mut options = SessionOptions::new(creds);
//! options.database = Some("tech_store".into());
//! options.create_database = true;
//!
//! let mut session = Session::open(options).await?;
//! session.create_table("products", ["product_id tinyint unique", "product_name varchar(255)"], true).await?;
//! session.load_csv("products", "data/products.csv", true).await?;
//!
//! session.select("products", "*").await?;
//! for row in session.fetch_all()? {
//!     println!("{:?}", row.values);
//! }
//! session.close().await?;
//! ```
//!
//! ## Builders
//!
//! | Operation  | SQL                                                   |
//! |------------|-------------------------------------------------------|
//! | `update`   | `UPDATE t SET a = ? WHERE c = ?`                      |
//! | `delete`   | `DELETE FROM t WHERE c = ?`                           |
//! | `add_key`  | `ALTER TABLE t ADD PRIMARY KEY (c)` (+ foreign key)   |
//! | `join`     | `t0 inner join t1 on t0.c = t1.c ...`                 |
//!
//! Values always travel as bound parameters.

pub mod ast;
pub mod catalog;
pub mod config;
pub mod csv_loader;
pub mod driver;
pub mod engine;
pub mod error;
pub mod parser;
pub mod schema;
pub mod transpiler;
pub mod value;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::catalog::{Catalog, CatalogMode, ColumnSpec};
    pub use crate::config::{Config, Credentials};
    pub use crate::engine::{Session, SessionOptions};
    pub use crate::error::*;
    pub use crate::schema::TableDefinition;
    pub use crate::transpiler::ToSql;
    pub use crate::value::{Row, Value};
}

pub use engine::{Session, SessionOptions};
pub use error::{SqlError, SqlResult};

/// Split statement text on top-level `;`.
///
/// # Example
///
/// ```
/// use connect_sql::split_statements;
///
/// let parts = split_statements("select ';'; select 2;").unwrap();
/// assert_eq!(parts, vec!["select ';'", "select 2"]);
/// ```
pub fn split_statements(input: &str) -> SqlResult<Vec<&str>> {
    parser::split_statements(input)
}
