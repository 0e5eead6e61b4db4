//! connect-sql — seed and inspect a MySQL database
//!
//! # Usage
//!
//! ```bash
//! # Credentials come from the environment (or the config file)
//! export tech_store_db="user=root,password=secret,host=localhost,port=3306"
//!
//! # Create tech_store, declare its tables and load data/*.csv
//! connect-sql seed --reset --demo
//!
//! # Inspect
//! connect-sql tables
//! connect-sql columns orders
//! connect-sql select products --columns product_name,price --limit 3
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use connect_sql::prelude::*;
use connect_sql::schema::{self, TECH_STORE};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "connect-sql")]
#[command(version)]
#[command(about = "Seed and inspect a MySQL database", long_about = None)]
#[command(after_help = "EXAMPLES:
    connect-sql seed --reset --demo
    connect-sql columns orders
    connect-sql select products --columns product_name,price --limit 3 --format json")]
struct Cli {
    /// Environment variable (or [credentials.<key>] config table) holding credentials
    #[arg(long, global = true, default_value = "tech_store_db")]
    env_key: String,

    /// Config file path
    #[arg(long, global = true, env = "CONNECT_SQL_CONFIG")]
    config: Option<PathBuf>,

    /// Database to use (defaults to the config's, then tech_store)
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Directory holding the CSV fixtures
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database, declare its tables and load the CSV fixtures
    Seed {
        /// Drop and recreate the database first
        #[arg(long)]
        reset: bool,

        /// Run the sample update/delete/key/join sequence afterwards
        #[arg(long)]
        demo: bool,
    },
    /// List the tables of the database
    Tables,
    /// List the columns of a table
    Columns {
        table: String,
    },
    /// Select rows from a table or join clause
    Select {
        from: String,

        /// Comma-separated column list (default: all)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Show at most N rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "connect_sql=debug" } else { "connect_sql=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("loading config")?;
    let creds = config
        .credentials(&cli.env_key)
        .with_context(|| format!("resolving credentials '{}'", cli.env_key))?;

    let database = cli
        .database
        .clone()
        .or_else(|| config.database.clone())
        .unwrap_or_else(|| TECH_STORE.to_string());

    if cli.verbose {
        println!(
            "{} {}@{}:{}/{}",
            "Connecting to:".dimmed(),
            creds.user,
            creds.host,
            creds.port,
            database
        );
    }

    let mut options = SessionOptions::new(creds);
    options.database = Some(database.clone());

    match &cli.command {
        Commands::Seed { reset, demo } => {
            let data_dir = cli
                .data_dir
                .clone()
                .or_else(|| config.data_dir.clone())
                .unwrap_or_else(|| PathBuf::from("data"));

            options.create_database = true;
            options.reset_database = *reset;
            options.catalog = config.catalog;

            let mut session = Session::open(options).await?;
            let result = seed(&mut session, &database, &data_dir, *demo, &cli.format).await;
            finish(session, result).await
        }
        Commands::Tables => {
            options.catalog = CatalogMode::Live;
            let mut session = Session::open(options).await?;
            let tables = session.tables().await.map_err(Into::into);
            print_list("tables", &finish(session, tables).await?, &cli.format);
            Ok(())
        }
        Commands::Columns { table } => {
            options.catalog = CatalogMode::Live;
            let mut session = Session::open(options).await?;
            let columns = session.columns(table).await.map_err(Into::into);
            print_list("columns", &finish(session, columns).await?, &cli.format);
            Ok(())
        }
        Commands::Select { from, columns, limit } => {
            options.catalog = CatalogMode::Live;
            let mut session = Session::open(options).await?;
            let rows = select(&mut session, from, columns.clone()).await;

            let mut rows = finish(session, rows).await?;
            if let Some(n) = limit {
                rows.truncate(*n);
            }
            format_output(&rows, &cli.format);
            Ok(())
        }
    }
}

/// Close the session. An error from `result` wins over a close failure.
async fn finish<T>(mut session: Session, result: Result<T>) -> Result<T> {
    let closed = session.close().await;
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                tracing::warn!(error = %close_err, "error closing session");
            }
            Err(e)
        }
    }
}

async fn select(session: &mut Session, from: &str, columns: Vec<String>) -> Result<Vec<Row>> {
    session.select(from, columns).await?;
    Ok(session.fetch_all()?)
}

async fn seed(
    session: &mut Session,
    database: &str,
    data_dir: &Path,
    demo: bool,
    format: &OutputFormat,
) -> Result<()> {
    let definitions = schema::tech_store(data_dir)?;
    let loaded = session.create_tables(&definitions).await?;
    println!(
        "{} {} tables declared in {}, {} rows loaded",
        "✓".green(),
        definitions.len(),
        database.cyan(),
        loaded
    );

    if demo {
        run_demo(session, format).await?;
    }
    Ok(())
}

/// Rename a product, delete it again, add keys and join the store tables.
async fn run_demo(session: &mut Session, format: &OutputFormat) -> Result<()> {
    let updated = session
        .update(
            "products",
            &[
                Assignment::new("product_name", "Phone"),
                Assignment::new("price", 10000),
            ],
            &[Condition::eq("product_name", "Smartphone")],
            true,
        )
        .await?;
    println!("{} {} rows updated", "✓".green(), updated);

    let deleted = session
        .delete("products", &[Condition::eq("product_name", "Phone")], true)
        .await?;
    println!("{} {} rows deleted", "✓".green(), deleted);

    session.add_key("orders", "order_id", None, None).await?;
    session.add_key("customers", "customer_id", Some("orders"), None).await?;
    session.add_key("products", "product_id", Some("orders"), None).await?;
    println!("{} keys added", "✓".green());

    let clause = session
        .join(
            &["orders", "products", "customers"],
            JoinType::Inner,
            &["product_id", "customer_id"],
        )
        .await?;
    println!("{} {}", "Join:".dimmed(), clause.white());

    session.select(&clause, "*").await?;
    let mut rows = session.fetch_all()?;
    rows.truncate(5);
    format_output(&rows, format);
    Ok(())
}

fn print_list(label: &str, items: &[String], format: &OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Table => {
            for item in items {
                println!("  • {}", item.white());
            }
            println!();
            println!("{} {}", items.len().to_string().cyan(), label);
        }
    }
}

fn format_output(rows: &[Row], format: &OutputFormat) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            let objects: Vec<serde_json::Map<String, serde_json::Value>> = rows
                .iter()
                .map(|row| {
                    row.columns
                        .iter()
                        .cloned()
                        .zip(row.values.iter().map(|v| serde_json::to_value(v).unwrap_or_default()))
                        .collect()
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&objects).unwrap_or_default());
        }
        OutputFormat::Table => {
            let columns = &rows[0].columns;

            let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
            for row in rows {
                for (w, val) in widths.iter_mut().zip(&row.values) {
                    *w = (*w).max(val.to_string().len());
                }
            }

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = *w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in rows {
                let cells: Vec<String> = row
                    .values
                    .iter()
                    .zip(&widths)
                    .map(|(v, w)| format!("{:width$}", v.to_string(), width = *w))
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use connect_sql::driver::Driver;

    /// Accepts everything but fails to close.
    struct StuckDriver;

    #[async_trait]
    impl Driver for StuckDriver {
        async fn execute(&mut self, _sql: &str, _params: &[Value]) -> SqlResult<u64> {
            Ok(0)
        }

        async fn fetch_all(&mut self, _sql: &str, _params: &[Value]) -> SqlResult<Vec<Row>> {
            Ok(Vec::new())
        }

        async fn commit(&mut self) -> SqlResult<()> {
            Ok(())
        }

        async fn rollback(&mut self) -> SqlResult<()> {
            Ok(())
        }

        async fn close(&mut self) -> SqlResult<()> {
            Err(SqlError::Connection("close failed".to_string()))
        }
    }

    fn stuck_session() -> Session {
        Session::with_driver(Box::new(StuckDriver), CatalogMode::Local)
    }

    #[tokio::test]
    async fn test_finish_keeps_command_error() {
        let result: Result<()> = Err(SqlError::TableNotFound("orders".to_string()).into());
        let err = finish(stuck_session(), result).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<SqlError>(), Some(SqlError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_finish_reports_close_error() {
        let err = finish(stuck_session(), Ok(3)).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<SqlError>(), Some(SqlError::Connection(_))));
    }
}
