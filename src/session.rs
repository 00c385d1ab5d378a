//! Query session: execute one statement, keep its rows, serve accessors.

use rusqlite::{params_from_iter, Connection, Statement, ToSql};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{RdbError, Result};
use crate::params::Params;
use crate::row::Row;
use crate::value::Value;

/// Executes statements against a borrowed connection and caches the rows of
/// the most recent one.
///
/// The session never opens or closes the connection. Dropping the session
/// releases the cached rows and the held statement.
pub struct QuerySession<'conn> {
    conn: &'conn Connection,
    statement: Option<Statement<'conn>>,
    results: Option<Vec<Row>>,
    affected: u64,
}

impl<'conn> QuerySession<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            statement: None,
            results: None,
            affected: 0,
        }
    }

    /// Prepare, bind and run `sql`, then materialize every resulting row.
    ///
    /// State from the previous call is discarded before preparing, so a
    /// failed call leaves no results behind. Failures are returned as
    /// errors; `Ok(false)` is never produced.
    ///
    /// Text holding no statement (empty, whitespace, comments, bare `;`)
    /// succeeds as a no-op: `rows()` is empty and `affected_rows()` is 0.
    pub fn execute(&mut self, sql: &str, params: impl Into<Params>) -> Result<bool> {
        self.reset();
        let params = params.into();

        let mut statement = self.conn.prepare(sql).map_err(|err| {
            warn!(sql, error = %err, "statement prepare failed");
            RdbError::prepare(sql, &err)
        })?;

        if contains_no_sql(sql) {
            if !params.is_empty() {
                let err = rusqlite::Error::InvalidParameterCount(params.len(), 0);
                warn!(sql, error = %err, "parameters given for empty statement");
                return Err(RdbError::execute(sql, &err));
            }
            debug!(sql, "empty statement");
            self.results = Some(Vec::new());
            return Ok(true);
        }

        if params.is_mixed() {
            warn!(sql, "positional and named parameters mixed");
            return Err(RdbError::StatementExecute {
                sql: sql.to_string(),
                message: "cannot mix positional and named parameters".to_string(),
            });
        }

        let readonly = statement.readonly();
        let rows = materialize(&mut statement, &params).map_err(|err| {
            warn!(sql, error = %err, "statement execute failed");
            RdbError::execute(sql, &err)
        })?;
        let affected = if readonly { 0 } else { self.conn.changes() as u64 };

        debug!(
            sql,
            params = params.len(),
            rows = rows.len(),
            affected,
            "statement executed"
        );
        self.statement = Some(statement);
        self.results = Some(rows);
        self.affected = affected;
        Ok(true)
    }

    /// Rows of the last successful execution, `None` if there is none.
    pub fn rows(&self) -> Option<&[Row]> {
        self.results.as_deref()
    }

    pub fn row_count(&self) -> usize {
        self.results.as_ref().map_or(0, Vec::len)
    }

    /// Rows changed by the last executed statement; 0 for read-only statements.
    ///
    /// Other statements report SQLite's `changes()` counter, which only
    /// INSERT, UPDATE and DELETE update. DDL such as `CREATE TABLE` therefore
    /// reports the count left by the last data-changing statement.
    pub fn affected_rows(&self) -> u64 {
        self.affected
    }

    /// Row at `index`, or `None` when the index is negative, out of range, or
    /// there are no results.
    pub fn fetch_row(&self, index: i64) -> Option<&Row> {
        let index = usize::try_from(index).ok()?;
        self.results.as_ref()?.get(index)
    }

    pub fn fetch_first(&self) -> Option<&Row> {
        self.fetch_row(0)
    }

    /// Same lookup as [`fetch_row`](Self::fetch_row), as a dynamically keyed object.
    pub fn fetch_row_as_object(
        &self,
        index: i64,
    ) -> Option<serde_json::Map<String, serde_json::Value>> {
        self.fetch_row(index).map(Row::to_object)
    }

    /// Same lookup as [`fetch_row`](Self::fetch_row), deserialized into `T`.
    pub fn fetch_row_as<T: DeserializeOwned>(&self, index: i64) -> Result<Option<T>> {
        let Some(object) = self.fetch_row_as_object(index) else {
            return Ok(None);
        };
        serde_json::from_value(serde_json::Value::Object(object))
            .map(Some)
            .map_err(|err| RdbError::Projection(err.to_string()))
    }

    /// Column names of the held statement.
    pub fn column_names(&self) -> Vec<String> {
        self.statement.as_ref().map_or_else(Vec::new, |stmt| {
            stmt.column_names().into_iter().map(String::from).collect()
        })
    }

    pub fn last_insert_id(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    pub fn begin_transaction(&self) -> Result<()> {
        self.transaction_control("begin", "BEGIN")
    }

    pub fn commit(&self) -> Result<()> {
        self.transaction_control("commit", "COMMIT")
    }

    pub fn rollback(&self) -> Result<()> {
        self.transaction_control("rollback", "ROLLBACK")
    }

    fn transaction_control(&self, operation: &'static str, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(|err| {
            warn!(operation, error = %err, "transaction control failed");
            RdbError::transaction(operation, &err)
        })?;
        debug!(operation, "transaction control");
        Ok(())
    }

    fn reset(&mut self) {
        self.statement = None;
        self.results = None;
        self.affected = 0;
    }
}

impl Drop for QuerySession<'_> {
    fn drop(&mut self) {
        self.reset();
        debug!("query session released");
    }
}

/// True when `sql` holds only whitespace, comments and semicolons, which
/// SQLite prepares into a null statement.
fn contains_no_sql(sql: &str) -> bool {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ';');
        if let Some(comment) = rest.strip_prefix("--") {
            rest = comment.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(comment) = rest.strip_prefix("/*") {
            // unterminated block comments run to the end of input
            rest = comment.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            return rest.is_empty();
        }
    }
}

fn materialize(statement: &mut Statement<'_>, params: &Params) -> rusqlite::Result<Vec<Row>> {
    let columns: Vec<String> = statement
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = if params.named.is_empty() {
        statement.query(params_from_iter(params.positional.iter()))?
    } else {
        let named: Vec<(&str, &dyn ToSql)> = params
            .named
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();
        statement.query(named.as_slice())?
    };

    let mut materialized = Vec::new();
    while let Some(row) = rows.next()? {
        let mut out = Row::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            out.insert(column.as_str(), Value::from(row.get_ref(idx)?));
        }
        materialized.push(out);
    }
    Ok(materialized)
}
