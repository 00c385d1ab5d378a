//! Error types for the query session and its connection helpers.
//!
//! Every variant that wraps a driver failure keeps the driver's message
//! verbatim; nothing is retried or recovered locally.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RdbError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RdbError {
    /// The driver rejected the statement text.
    #[error("Prepare failed: {message}")]
    StatementPrepare { sql: String, message: String },

    /// Binding or stepping the prepared statement failed.
    #[error("Execute failed: {message}")]
    StatementExecute { sql: String, message: String },

    /// BEGIN, COMMIT or ROLLBACK was refused by the connection.
    #[error("Transaction {operation} failed: {message}")]
    Transaction {
        operation: &'static str,
        message: String,
    },

    /// A materialized row could not be deserialized into the requested type.
    #[error("Row projection failed: {0}")]
    Projection(String),

    /// The database file could not be opened or configured.
    #[error("Failed to open database '{path}': {message}")]
    Open { path: String, message: String },

    /// Schema bootstrap failed for a table.
    #[error("Schema setup failed for table '{table}': {message}")]
    Schema { table: String, message: String },
}

impl RdbError {
    pub(crate) fn prepare(sql: &str, err: &rusqlite::Error) -> Self {
        Self::StatementPrepare {
            sql: sql.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn execute(sql: &str, err: &rusqlite::Error) -> Self {
        Self::StatementExecute {
            sql: sql.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn transaction(operation: &'static str, err: &rusqlite::Error) -> Self {
        Self::Transaction {
            operation,
            message: err.to_string(),
        }
    }

    pub(crate) fn open(path: &str, err: &rusqlite::Error) -> Self {
        Self::Open {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn schema(table: &str, err: &rusqlite::Error) -> Self {
        Self::Schema {
            table: table.to_string(),
            message: err.to_string(),
        }
    }

    /// The driver text carried by this error, without the prefix added by `Display`.
    pub fn driver_message(&self) -> &str {
        match self {
            Self::StatementPrepare { message, .. }
            | Self::StatementExecute { message, .. }
            | Self::Transaction { message, .. }
            | Self::Open { message, .. }
            | Self::Schema { message, .. } => message,
            Self::Projection(message) => message,
        }
    }
}
