//! SQLite connection wrapper.

use rusqlite::types::Value;
use rusqlite::TransactionBehavior;
use tokio_rusqlite::Connection;
use tracing::{debug, info, trace, warn};

use crate::config::{DatabasePath, SqliteConfig};
use crate::context::StepContext;
use crate::error::{SqliteError, SqliteResult};
use crate::row::Row;

/// A handle to an open SQLite database.
///
/// Cloning is cheap; every clone talks to the same background connection,
/// so statements issued through any clone are serialized.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: Connection,
    path: DatabasePath,
}

impl SqliteConnection {
    /// Open a connection and apply the configured PRAGMAs.
    ///
    /// Opening a file path that does not exist creates it. Callers that must
    /// not create a database check [`DatabasePath::exists`] first.
    pub async fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await?,
            DatabasePath::File(path) => Connection::open(path).await.map_err(|e| {
                SqliteError::connection(format!("failed to open {}: {e}", path.display()))
            })?,
        };

        let init_sql = config.init_sql();
        conn.call(move |conn| {
            conn.execute_batch(&init_sql)?;
            Ok(())
        })
        .await?;

        info!(path = %config.path, "SQLite connection opened");

        Ok(Self {
            conn,
            path: config.path.clone(),
        })
    }

    /// The path this connection was opened from.
    pub fn path(&self) -> &DatabasePath {
        &self.path
    }

    /// Execute a statement, returning the number of affected rows.
    pub async fn execute(&self, sql: &str) -> SqliteResult<usize> {
        self.execute_params(sql, Vec::new()).await
    }

    /// Execute a statement with positional parameters.
    pub async fn execute_params(&self, sql: &str, params: Vec<Value>) -> SqliteResult<usize> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing statement");

        self.conn
            .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?))
            .await
            .map_err(SqliteError::from)
    }

    /// Execute several `;`-separated statements.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing batch");

        self.conn
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .map_err(SqliteError::from)
    }

    /// Execute a query and return all rows keyed by column name.
    pub async fn query(&self, sql: &str) -> SqliteResult<Vec<Row>> {
        self.query_params(sql, Vec::new()).await
    }

    /// Execute a query with positional parameters.
    pub async fn query_params(&self, sql: &str, params: Vec<Value>) -> SqliteResult<Vec<Row>> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing query");

        self.conn
            .call(move |conn| {
                StepContext::new(conn)
                    .query_as(&sql, rusqlite::params_from_iter(params))
                    .map_err(into_call_error)
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Execute a query and return the first row, if any.
    pub async fn query_optional(&self, sql: &str, params: Vec<Value>) -> SqliteResult<Option<Row>> {
        Ok(self.query_params(sql, params).await?.into_iter().next())
    }

    /// Whether a table with this name exists.
    pub async fn table_exists(&self, table: &str) -> SqliteResult<bool> {
        let table = table.to_string();
        self.inspect(move |ctx| ctx.table_exists(&table)).await
    }

    /// Whether `table` has a column named `column`.
    pub async fn column_exists(&self, table: &str, column: &str) -> SqliteResult<bool> {
        let (table, column) = (table.to_string(), column.to_string());
        self.inspect(move |ctx| ctx.column_exists(&table, &column)).await
    }

    /// Whether an index with this name exists.
    pub async fn index_exists(&self, index: &str) -> SqliteResult<bool> {
        let index = index.to_string();
        self.inspect(move |ctx| ctx.index_exists(&index)).await
    }

    /// Run `body` inside exactly one transaction.
    ///
    /// The transaction is taken with `BEGIN IMMEDIATE` so a concurrent writer
    /// fails fast instead of deadlocking mid-step. `Ok` commits and `Err`
    /// rolls back; the body's error is returned unchanged. The body runs on
    /// the connection thread and must not block on async work.
    pub async fn with_transaction<F, T, E>(&self, body: F) -> Result<T, E>
    where
        F: FnOnce(&StepContext<'_>) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<SqliteError> + Send + 'static,
    {
        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                trace!("Transaction started");
                let result = body(&StepContext::new(&tx));
                match result {
                    Ok(value) => {
                        tx.commit()?;
                        trace!("Transaction committed");
                        Ok(Ok(value))
                    }
                    Err(err) => {
                        if let Err(rollback_err) = tx.rollback() {
                            warn!(error = %rollback_err, "Rollback failed");
                        } else {
                            trace!("Transaction rolled back");
                        }
                        Ok(Err(err))
                    }
                }
            })
            .await;

        match outcome {
            Ok(result) => result,
            Err(err) => Err(E::from(SqliteError::from(err))),
        }
    }

    /// Close the underlying connection.
    pub async fn close(self) -> SqliteResult<()> {
        self.conn.close().await?;
        debug!(path = %self.path, "SQLite connection closed");
        Ok(())
    }

    async fn inspect<F>(&self, probe: F) -> SqliteResult<bool>
    where
        F: FnOnce(&StepContext<'_>) -> SqliteResult<bool> + Send + 'static,
    {
        self.conn
            .call(move |conn| probe(&StepContext::new(conn)).map_err(into_call_error))
            .await
            .map_err(SqliteError::from)
    }
}

/// Hand an error raised on the connection thread back through `call`.
fn into_call_error(err: SqliteError) -> tokio_rusqlite::Error {
    match err {
        SqliteError::Sqlite(inner) => inner,
        other => tokio_rusqlite::Error::Other(Box::new(other)),
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection").field("path", &self.path).finish()
    }
}
