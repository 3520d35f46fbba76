//! Synchronous handle passed to migration step bodies.

use rusqlite::{OptionalExtension, Params};
use tracing::trace;

use crate::error::SqliteResult;
use crate::row::{FromSqliteRow, Row};

/// A borrowed view of the connection while a transaction is open.
///
/// Everything executed through a `StepContext` participates in the
/// enclosing transaction; the context cannot commit or roll back itself.
pub struct StepContext<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> StepContext<'a> {
    /// Wrap a connection (typically a `rusqlite::Transaction` via deref).
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Execute a statement without parameters, returning affected rows.
    pub fn execute(&self, sql: &str) -> SqliteResult<usize> {
        trace!(sql = %sql, "Executing statement");
        Ok(self.conn.execute(sql, [])?)
    }

    /// Execute a statement with bound parameters, returning affected rows.
    pub fn execute_params<P: Params>(&self, sql: &str, params: P) -> SqliteResult<usize> {
        trace!(sql = %sql, "Executing statement");
        Ok(self.conn.execute(sql, params)?)
    }

    /// Execute several `;`-separated statements.
    pub fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        trace!(sql = %sql, "Executing batch");
        Ok(self.conn.execute_batch(sql)?)
    }

    /// Run a query and return every row keyed by column name.
    pub fn query(&self, sql: &str) -> SqliteResult<Vec<Row>> {
        self.query_as(sql, [])
    }

    /// Run a query with bound parameters and decode each row as `T`.
    pub fn query_as<T: FromSqliteRow, P: Params>(&self, sql: &str, params: P) -> SqliteResult<Vec<T>> {
        trace!(sql = %sql, "Executing query");
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(T::from_row(row)?);
        }
        Ok(out)
    }

    /// Run a query and decode at most one row.
    pub fn query_optional<T: FromSqliteRow, P: Params>(&self, sql: &str, params: P) -> SqliteResult<Option<T>> {
        trace!(sql = %sql, "Executing query");
        let decoded = self
            .conn
            .query_row(sql, params, |row| Ok(T::from_row(row)))
            .optional()?;
        Ok(decoded.transpose()?)
    }

    /// Whether a table with this name exists.
    pub fn table_exists(&self, table: &str) -> SqliteResult<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            [table],
            |row| row.get(0),
        )?)
    }

    /// Whether `table` has a column named `column`.
    ///
    /// A missing table reports `false` rather than an error.
    pub fn column_exists(&self, table: &str, column: &str) -> SqliteResult<bool> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info(?1) WHERE name = ?2",
            [table, column],
            |row| row.get(0),
        )?)
    }

    /// Whether an index with this name exists.
    pub fn index_exists(&self, index: &str) -> SqliteResult<bool> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'index' AND name = ?1)",
            [index],
            |row| row.get(0),
        )?)
    }
}
