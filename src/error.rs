//! Error types for connect-sql.

use thiserror::Error;

/// The main error type for session, catalog and loader operations.
#[derive(Debug, Error)]
pub enum SqlError {
    /// Failed to open (or lost) the connection to the server.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The operation needs a connection and the session has none.
    #[error("No open connection")]
    NotConnected,

    /// The operation needs a cursor and the session has none.
    #[error("No cursor; call create_cursor() first")]
    NoCursor,

    /// The server rejected a statement.
    #[error("Error executing statement '{sql}': {message}")]
    Statement { sql: String, message: String },

    /// Unique, foreign key, not-null or check violation.
    #[error("Constraint violation in '{sql}': {message}")]
    Constraint { sql: String, message: String },

    /// Table is not known to the catalog.
    #[error("Table {0} does not exist")]
    TableNotFound(String),

    /// Table or column name that cannot be placed in statement text.
    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Malformed helper input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failed to parse statement text or a credential string.
    #[error("Parse error at position {position}: {message}")]
    Parse { position: usize, message: String },

    /// Missing or malformed credentials.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unreadable or malformed CSV fixture.
    #[error("CSV error: {0}")]
    Csv(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlError {
    /// Create a parse error at the given position.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a statement error for the given SQL text.
    pub fn statement(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Statement {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create a constraint violation error for the given SQL text.
    pub fn constraint(sql: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Constraint {
            sql: sql.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// True for the not-found family (unknown table).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound(_))
    }
}

impl From<csv::Error> for SqlError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

/// Result type alias for connect-sql operations.
pub type SqlResult<T> = Result<T, SqlError>;
