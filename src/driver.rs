//! Server drivers.
//!
//! [`Driver`] is the seam between the session and the wire. [`MySqlDriver`]
//! speaks to MySQL-compatible servers through sqlx. Unparameterized statements
//! go over the text protocol (so `USE`, DDL and `SHOW` work); statements with
//! bound values are prepared.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::error::ErrorKind;
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Connection, Executor, Row as _, TypeInfo};

use crate::config::Credentials;
use crate::error::{SqlError, SqlResult};
use crate::value::{Row, Value};

/// Statement execution against one server connection.
#[async_trait]
pub trait Driver: Send {
    /// Run a statement, returning the number of affected rows.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> SqlResult<u64>;

    /// Run a query and collect every row.
    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> SqlResult<Vec<Row>>;

    async fn commit(&mut self) -> SqlResult<()>;

    async fn rollback(&mut self) -> SqlResult<()>;

    /// Close the connection. Later calls fail with `NotConnected`.
    async fn close(&mut self) -> SqlResult<()>;
}

/// A single MySQL connection with autocommit disabled.
pub struct MySqlDriver {
    conn: Option<MySqlConnection>,
}

impl MySqlDriver {
    /// Connect and switch the connection to manual commit.
    pub async fn connect(creds: &Credentials) -> SqlResult<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(&creds.host)
            .port(creds.port)
            .username(&creds.user);
        if let Some(password) = &creds.password {
            options = options.password(password);
        }
        if let Some(database) = creds.database.as_deref().filter(|d| !d.trim().is_empty()) {
            options = options.database(database);
        }

        let mut conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| SqlError::Connection(e.to_string()))?;

        conn.execute("SET autocommit = 0")
            .await
            .map_err(|e| SqlError::Connection(e.to_string()))?;

        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> SqlResult<&mut MySqlConnection> {
        self.conn.as_mut().ok_or(SqlError::NotConnected)
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn execute(&mut self, sql: &str, params: &[Value]) -> SqlResult<u64> {
        let conn = self.conn()?;
        let result = if params.is_empty() {
            conn.execute(sql).await
        } else {
            bind_all(sqlx::query(sql), params).execute(&mut *conn).await
        };
        result
            .map(|r| r.rows_affected())
            .map_err(|e| classify(sql, e))
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> SqlResult<Vec<Row>> {
        let conn = self.conn()?;
        let rows = if params.is_empty() {
            conn.fetch_all(sql).await
        } else {
            bind_all(sqlx::query(sql), params).fetch_all(&mut *conn).await
        };
        rows.map(|rows| rows.iter().map(convert_row).collect())
            .map_err(|e| classify(sql, e))
    }

    async fn commit(&mut self) -> SqlResult<()> {
        self.execute("COMMIT", &[]).await.map(|_| ())
    }

    async fn rollback(&mut self) -> SqlResult<()> {
        self.execute("ROLLBACK", &[]).await.map(|_| ())
    }

    async fn close(&mut self) -> SqlResult<()> {
        match self.conn.take() {
            Some(conn) => conn
                .close()
                .await
                .map_err(|e| SqlError::Connection(e.to_string())),
            None => Ok(()),
        }
    }
}

/// Helper to bind values to a MySQL query
fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[Value],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Value::Null => query.bind(Option::<String>::None),
            Value::Bool(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::Float(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.clone()),
            Value::DateTime(v) => query.bind(*v),
        };
    }
    query
}

/// Map a sqlx failure onto the error taxonomy.
fn classify(sql: &str, err: sqlx::Error) -> SqlError {
    match err {
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => SqlError::constraint(sql, db.message()),
            _ => SqlError::statement(sql, db.message()),
        },
        sqlx::Error::Io(e) => SqlError::Connection(e.to_string()),
        sqlx::Error::Tls(e) => SqlError::Connection(e.to_string()),
        sqlx::Error::Protocol(msg) => SqlError::Connection(msg),
        sqlx::Error::WorkerCrashed => SqlError::Connection("connection worker crashed".to_string()),
        other => SqlError::statement(sql, other.to_string()),
    }
}

/// Convert a MySqlRow to a Row.
fn convert_row(row: &MySqlRow) -> Row {
    let columns = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..row.columns().len()).map(|i| convert_cell(row, i)).collect();
    Row::new(columns, values)
}

fn convert_cell(row: &MySqlRow, i: usize) -> Value {
    let type_name = row.columns()[i].type_info().name().to_ascii_uppercase();

    if type_name == "NULL" {
        return Value::Null;
    }
    if type_name.contains("UNSIGNED") {
        return row
            .try_get::<Option<u64>, _>(i)
            .ok()
            .flatten()
            .map(|v| i64::try_from(v).map(Value::Int).unwrap_or_else(|_| Value::Text(v.to_string())))
            .unwrap_or(Value::Null);
    }

    match type_name.as_str() {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(i)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
            .try_get::<Option<i64>, _>(i)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(i)
            .ok()
            .flatten()
            .map(|v| Value::Float(v as f64))
            .unwrap_or(Value::Null),
        "DOUBLE" => row
            .try_get::<Option<f64>, _>(i)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "DATETIME" | "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(i)
            .ok()
            .flatten()
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(i)
            .ok()
            .flatten()
            .map(|d| Value::Text(d.to_string()))
            .unwrap_or(Value::Null),
        // DECIMAL, TIME, JSON, text and binary types arrive as text on the wire.
        _ => row
            .try_get_unchecked::<Option<String>, _>(i)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}
