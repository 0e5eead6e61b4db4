//! Database session for connect-sql.
//!
//! A [`Session`] owns one connection (through a [`Driver`]), one cursor and the
//! session's [`Catalog`] mirror. Every operation is `&mut self`, so a session
//! runs at most one statement at a time and is meant to stay on one task.
//!
//! Writes are not committed implicitly: helpers that take `auto_commit`
//! commit after all of their statements succeed, and a failure leaves the
//! pending work for the caller to [`Session::rollback`] or [`Session::commit`].

use std::path::Path;

use tracing::{debug, info, warn};

use crate::ast::{Assignment, Columns, Condition, JoinType};
use crate::catalog::{column_specs, Catalog, CatalogMode, ColumnSpec};
use crate::config::Credentials;
use crate::csv_loader::{describe_mapping, read_csv};
use crate::driver::{Driver, MySqlDriver};
use crate::error::{SqlError, SqlResult};
use crate::parser::{identifier, split_statements};
use crate::schema::TableDefinition;
use crate::transpiler::{self, Statement};
use crate::value::{Row, Value};

/// Statement-execution handle: buffers the rows of the last select.
#[derive(Debug, Default)]
pub struct Cursor {
    rows: Vec<Row>,
    affected: u64,
}

/// Everything [`Session::open`] needs.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub credentials: Credentials,
    /// Database to select (or create) once connected.
    pub database: Option<String>,
    /// Create `database` if it does not exist.
    pub create_database: bool,
    /// Drop and recreate `database` (implies `create_database`).
    pub reset_database: bool,
    pub catalog: CatalogMode,
}

impl SessionOptions {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            database: None,
            create_database: false,
            reset_database: false,
            catalog: CatalogMode::default(),
        }
    }
}

pub struct Session {
    driver: Option<Box<dyn Driver>>,
    cursor: Option<Cursor>,
    catalog: Catalog,
    mode: CatalogMode,
    database: Option<String>,
}

impl Session {
    /// A session with no connection yet.
    pub fn new(mode: CatalogMode) -> Self {
        Self {
            driver: None,
            cursor: None,
            catalog: Catalog::new(),
            mode,
            database: None,
        }
    }

    /// A session on top of an already-connected driver. No cursor is created.
    pub fn with_driver(driver: Box<dyn Driver>, mode: CatalogMode) -> Self {
        Self {
            driver: Some(driver),
            ..Self::new(mode)
        }
    }

    /// Connect, create the cursor, then select or create the configured database.
    pub async fn open(options: SessionOptions) -> SqlResult<Self> {
        let mut session = Self::new(options.catalog);
        session.connect(&options.credentials).await?;
        session.create_cursor()?;

        if let Some(database) = options.database.as_deref() {
            if options.create_database || options.reset_database {
                session
                    .create_database(database, true, options.reset_database)
                    .await?;
            } else {
                session.use_database(database).await?;
            }
        }
        Ok(session)
    }

    /// Open a MySQL connection. An existing connection is closed first.
    pub async fn connect(&mut self, creds: &Credentials) -> SqlResult<()> {
        self.close().await?;

        match MySqlDriver::connect(creds).await {
            Ok(driver) => {
                info!(host = %creds.host, port = creds.port, user = %creds.user, "connected");
                self.driver = Some(Box::new(driver));
                if creds.database != self.database {
                    self.catalog.clear();
                    self.database = creds.database.clone();
                }
                Ok(())
            }
            Err(e) => {
                warn!(host = %creds.host, port = creds.port, error = %e, "error creating connection");
                Err(e)
            }
        }
    }

    pub fn create_cursor(&mut self) -> SqlResult<()> {
        if self.driver.is_none() {
            warn!("error creating cursor: no connection");
            return Err(SqlError::NotConnected);
        }
        self.cursor = Some(Cursor::default());
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    pub fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mode(&self) -> CatalogMode {
        self.mode
    }

    pub fn current_database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Affected-row count of the last executed statement.
    pub fn last_affected(&self) -> Option<u64> {
        self.cursor.as_ref().map(|c| c.affected)
    }

    /// Release the cursor, then the connection. Safe to call repeatedly.
    pub async fn close(&mut self) -> SqlResult<()> {
        self.cursor = None;
        if let Some(mut driver) = self.driver.take() {
            driver.close().await?;
            info!("session closed");
        }
        Ok(())
    }

    fn driver(&mut self) -> SqlResult<&mut Box<dyn Driver>> {
        self.driver.as_mut().ok_or(SqlError::NotConnected)
    }

    fn handle(&mut self) -> SqlResult<(&mut Box<dyn Driver>, &mut Cursor)> {
        let driver = self.driver.as_mut().ok_or(SqlError::NotConnected)?;
        let cursor = self.cursor.as_mut().ok_or(SqlError::NoCursor)?;
        Ok((driver, cursor))
    }

    async fn exec(&mut self, sql: &str, params: &[Value]) -> SqlResult<u64> {
        let (driver, cursor) = self.handle()?;
        debug!(sql, params = params.len(), "execute");
        match driver.execute(sql, params).await {
            Ok(affected) => {
                cursor.affected = affected;
                Ok(affected)
            }
            Err(e) => {
                warn!(sql, error = %e, "error executing statement");
                Err(e)
            }
        }
    }

    /// Run a query without touching the cursor's buffered rows.
    async fn query(&mut self, sql: &str) -> SqlResult<Vec<Row>> {
        let (driver, _) = self.handle()?;
        debug!(sql, "query");
        driver.fetch_all(sql, &[]).await.inspect_err(|e| {
            warn!(sql, error = %e, "error executing query");
        })
    }

    pub async fn commit(&mut self) -> SqlResult<()> {
        self.driver()?.commit().await.inspect_err(|e| {
            warn!(error = %e, "error committing");
        })
    }

    pub async fn rollback(&mut self) -> SqlResult<()> {
        self.driver()?.rollback().await.inspect_err(|e| {
            warn!(error = %e, "error rolling back");
        })
    }

    /// Run one or more `;`-separated statements in order.
    ///
    /// Splitting understands quoted literals, quoted identifiers and comments,
    /// so `;` inside them does not end a statement. Text with an unterminated
    /// quote is rejected before anything runs. The first failing statement
    /// aborts the rest; with `auto_commit` a commit follows only if all of
    /// them succeeded. Returns the total affected-row count.
    pub async fn run_statement(&mut self, text: &str, auto_commit: bool) -> SqlResult<u64> {
        let statements = split_statements(text)?;
        self.handle()?;

        let mut affected = 0;
        for statement in &statements {
            affected += self.exec(statement, &[]).await?;
        }
        if auto_commit && !statements.is_empty() {
            self.commit().await?;
        }
        Ok(affected)
    }

    /// Run one parameterized statement once per row.
    ///
    /// `text` must hold exactly one statement. Same abort/commit policy as
    /// [`Session::run_statement`]; an empty row set runs nothing.
    pub async fn run_batch(&mut self, text: &str, rows: &[Vec<Value>], auto_commit: bool) -> SqlResult<u64> {
        let statements = split_statements(text)?;
        let [sql] = statements.as_slice() else {
            return Err(SqlError::invalid(format!(
                "batch needs exactly one statement, got {}",
                statements.len()
            )));
        };
        self.handle()?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut affected = 0;
        for (i, row) in rows.iter().enumerate() {
            affected += self.exec(sql, row).await.inspect_err(|_| {
                warn!(row = i, "batch aborted");
            })?;
        }
        if auto_commit {
            self.commit().await?;
        }
        Ok(affected)
    }

    async fn run_bound(&mut self, statement: &Statement, auto_commit: bool) -> SqlResult<u64> {
        let affected = self.exec(&statement.sql, &statement.params).await?;
        if auto_commit {
            self.commit().await?;
        }
        Ok(affected)
    }

    /// Take the rows buffered by the last [`Session::select`].
    pub fn fetch_all(&mut self) -> SqlResult<Vec<Row>> {
        let cursor = self.cursor.as_mut().ok_or(SqlError::NoCursor)?;
        Ok(std::mem::take(&mut cursor.rows))
    }

    // ------------------------------------------------------------------
    // Databases
    // ------------------------------------------------------------------

    pub async fn create_database(&mut self, name: &str, use_it: bool, overwrite: bool) -> SqlResult<()> {
        let create = transpiler::create_database(name)?;
        if overwrite {
            self.drop_database(name).await?;
        }
        self.exec(&create, &[]).await?;
        info!(database = name, "database created");

        if use_it {
            self.use_database(name).await?;
        }
        Ok(())
    }

    pub async fn use_database(&mut self, name: &str) -> SqlResult<()> {
        self.exec(&transpiler::use_database(name)?, &[]).await?;
        if self.database.as_deref() != Some(name) {
            self.catalog.clear();
            self.database = Some(name.to_string());
        }
        Ok(())
    }

    pub async fn drop_database(&mut self, name: &str) -> SqlResult<()> {
        self.exec(&transpiler::drop_database(name)?, &[]).await?;
        if self.database.as_deref() == Some(name) {
            self.catalog.clear();
            self.database = None;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tables and the catalog
    // ------------------------------------------------------------------

    /// Create a table from column specifications and record it in the catalog.
    ///
    /// With `overwrite` the table is dropped first. The catalog entry is only
    /// written once `CREATE TABLE` has succeeded.
    pub async fn create_table<I, S>(&mut self, name: &str, columns: I, overwrite: bool) -> SqlResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare_table(name, column_specs(columns)?, overwrite).await
    }

    async fn declare_table(&mut self, name: &str, columns: Vec<ColumnSpec>, overwrite: bool) -> SqlResult<()> {
        let create = transpiler::create_table(name, &columns)?;
        if overwrite {
            self.drop_table(name).await?;
        }
        self.exec(&create, &[]).await?;

        info!(table = name, columns = columns.len(), "table declared");
        self.catalog.declare(name, columns);
        Ok(())
    }

    pub async fn drop_table(&mut self, name: &str) -> SqlResult<()> {
        self.exec(&transpiler::drop_table(name)?, &[]).await?;
        self.catalog.remove(name);
        Ok(())
    }

    /// Declare every table, then load each one that names a CSV fixture.
    /// Returns the number of rows loaded.
    pub async fn create_tables(&mut self, definitions: &[TableDefinition]) -> SqlResult<u64> {
        for def in definitions {
            self.declare_table(&def.name, def.columns.clone(), false).await?;
        }

        let mut loaded = 0;
        for def in definitions {
            if let Some(csv) = &def.csv {
                loaded += self.load_csv(&def.name, csv, true).await?;
            }
        }
        Ok(loaded)
    }

    /// Column names of a table, in declaration order.
    pub async fn columns(&mut self, table: &str) -> SqlResult<Vec<String>> {
        match self.mode {
            CatalogMode::Local => match self.catalog.columns(table) {
                Some(cols) => Ok(cols.into_iter().map(String::from).collect()),
                None => {
                    warn!(table, "error getting columns: table not declared");
                    Err(SqlError::TableNotFound(table.to_string()))
                }
            },
            CatalogMode::Live => {
                self.ensure_table(table).await?;
                let rows = self
                    .query(&format!("SHOW COLUMNS FROM {}", identifier(table)?))
                    .await?;
                Ok(rows.iter().filter_map(|r| r.get_string(0)).collect())
            }
        }
    }

    /// Tables of the current database: declaration order (local) or server order (live).
    pub async fn tables(&mut self) -> SqlResult<Vec<String>> {
        match self.mode {
            CatalogMode::Local => Ok(self.catalog.tables().into_iter().map(String::from).collect()),
            CatalogMode::Live => {
                let rows = self.query("SHOW TABLES").await?;
                Ok(rows.iter().filter_map(|r| r.get_string(0)).collect())
            }
        }
    }

    pub async fn table_exists(&mut self, table: &str) -> SqlResult<bool> {
        match self.mode {
            CatalogMode::Local => Ok(self.catalog.contains(table)),
            CatalogMode::Live => Ok(self.tables().await?.iter().any(|t| t == table)),
        }
    }

    async fn ensure_table(&mut self, table: &str) -> SqlResult<()> {
        if self.table_exists(table).await? {
            Ok(())
        } else {
            warn!(table, "table does not exist");
            Err(SqlError::TableNotFound(table.to_string()))
        }
    }

    // ------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------

    /// Insert in-memory rows. Destination columns default to the catalog's.
    pub async fn insert_rows(
        &mut self,
        table: &str,
        rows: &[Vec<Value>],
        columns: Option<&[&str]>,
        auto_commit: bool,
    ) -> SqlResult<u64> {
        let destination: Vec<String> = match columns {
            Some(cols) => cols.iter().map(|c| c.to_string()).collect(),
            None => self.columns(table).await?,
        };

        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != destination.len()) {
            return Err(SqlError::invalid(format!(
                "row {} has {} values but {} has {} columns",
                i,
                row.len(),
                table,
                destination.len()
            )));
        }

        let refs: Vec<&str> = destination.iter().map(String::as_str).collect();
        let sql = transpiler::insert(table, &refs)?;
        self.run_batch(&sql, rows, auto_commit).await
    }

    /// Bulk-insert a CSV fixture into a declared table.
    ///
    /// The header row only feeds the logged `source -> destination` mapping;
    /// values are matched to the table's columns by position.
    pub async fn load_csv(&mut self, table: &str, path: impl AsRef<Path>, auto_commit: bool) -> SqlResult<u64> {
        let path = path.as_ref();
        let fixture = read_csv(path)?;
        let destination = self.columns(table).await?;
        let refs: Vec<&str> = destination.iter().map(String::as_str).collect();

        info!(
            table,
            path = %path.display(),
            "mapping columns with following conventions: {}",
            describe_mapping(&fixture.mapping(&refs))
        );

        let inserted = self
            .insert_rows(table, &fixture.value_rows(), Some(&refs), auto_commit)
            .await?;
        info!(table, rows = inserted, "csv loaded");
        Ok(inserted)
    }

    // ------------------------------------------------------------------
    // Query builders
    // ------------------------------------------------------------------

    /// Run `SELECT cols FROM source` and buffer the rows for [`Session::fetch_all`].
    ///
    /// `source` may be a table or a clause built by [`Session::join`].
    /// Returns the number of buffered rows.
    pub async fn select(&mut self, source: &str, columns: impl Into<Columns>) -> SqlResult<usize> {
        let sql = transpiler::select(source, &columns.into())?;
        let (driver, cursor) = self.handle()?;
        debug!(sql, "select");
        let rows = driver.fetch_all(&sql, &[]).await.inspect_err(|e| {
            warn!(sql, error = %e, "error selecting");
        })?;
        cursor.rows = rows;
        Ok(cursor.rows.len())
    }

    pub async fn update(
        &mut self,
        table: &str,
        assignments: &[Assignment],
        conditions: &[Condition],
        auto_commit: bool,
    ) -> SqlResult<u64> {
        self.ensure_table(table).await?;
        let statement = transpiler::update(table, assignments, conditions)?;
        self.run_bound(&statement, auto_commit).await
    }

    pub async fn delete(&mut self, table: &str, conditions: &[Condition], auto_commit: bool) -> SqlResult<u64> {
        self.ensure_table(table).await?;
        let statement = transpiler::delete(table, conditions)?;
        self.run_bound(&statement, auto_commit).await
    }

    /// Add a primary key on `primary_table(primary_column)` and, with a
    /// foreign table, a foreign key on `foreign_table(foreign_column)`
    /// referencing it. `foreign_column` defaults to `primary_column`.
    ///
    /// Both tables are checked before anything runs. Each key is committed
    /// as it is added.
    pub async fn add_key(
        &mut self,
        primary_table: &str,
        primary_column: &str,
        foreign_table: Option<&str>,
        foreign_column: Option<&str>,
    ) -> SqlResult<()> {
        self.ensure_table(primary_table).await?;
        if let Some(foreign) = foreign_table {
            self.ensure_table(foreign).await?;
        }

        let primary = transpiler::add_primary_key(primary_table, primary_column)?;
        let foreign = foreign_table
            .map(|table| {
                transpiler::add_foreign_key(
                    table,
                    foreign_column.unwrap_or(primary_column),
                    primary_table,
                    primary_column,
                )
            })
            .transpose()?;

        self.run_bound(&Statement::new(primary), true).await?;
        if let Some(foreign) = foreign {
            self.run_bound(&Statement::new(foreign), true).await?;
        }
        Ok(())
    }

    /// Build (without running) a star join anchored on the first table.
    pub async fn join(&mut self, tables: &[&str], join_type: JoinType, columns: &[&str]) -> SqlResult<String> {
        for table in tables {
            self.ensure_table(table).await?;
        }
        transpiler::join(tables, join_type, columns)
    }
}
