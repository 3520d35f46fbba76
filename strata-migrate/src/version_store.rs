//! Persistence of the schema version marker.

use std::collections::HashMap;

use parking_lot::RwLock;
use strata_sqlite::{SqliteConnection, SqliteError, StepContext, Value};
use tracing::{debug, warn};

use crate::error::MigrateResult;

/// Default key/value table holding the marker.
pub const DEFAULT_CONFIG_TABLE: &str = "configurations";

/// Key/value storage for the schema version marker.
#[async_trait::async_trait]
pub trait VersionStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `None` when the key, or the storage backing it, is absent.
    async fn get(&self, key: &str) -> MigrateResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> MigrateResult<()>;
}

/// A version store backed by a `(key, value)` table in the migrated database.
#[derive(Debug, Clone)]
pub struct ConfigTableStore {
    conn: SqliteConnection,
    table: String,
}

impl ConfigTableStore {
    /// Use the default `configurations` table.
    pub fn new(conn: SqliteConnection) -> Self {
        Self::with_table(conn, DEFAULT_CONFIG_TABLE)
    }

    /// Use a custom table name.
    pub fn with_table(conn: SqliteConnection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
        }
    }

    /// The table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn quoted_table(&self) -> String {
        format!("\"{}\"", self.table.replace('"', "\"\""))
    }
}

#[async_trait::async_trait]
impl VersionStore for ConfigTableStore {
    async fn get(&self, key: &str) -> MigrateResult<Option<String>> {
        if !self.conn.table_exists(&self.table).await? {
            warn!(table = %self.table, "Version table not found");
            return Ok(None);
        }

        let sql = format!("SELECT value FROM {} WHERE key = ?1", self.quoted_table());
        let row = self
            .conn
            .query_optional(&sql, vec![Value::Text(key.to_string())])
            .await?;

        let value = row.and_then(|mut row| match row.remove("value") {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        });

        debug!(key = %key, value = ?value, "Read version marker");
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> MigrateResult<()> {
        let table = self.quoted_table();
        let (key, value) = (key.to_string(), value.to_string());
        debug!(key = %key, value = %value, "Writing version marker");

        self.conn
            .with_transaction(move |ctx: &StepContext<'_>| {
                ctx.execute(&format!(
                    "CREATE TABLE IF NOT EXISTS {table} (key VARCHAR(255) NOT NULL PRIMARY KEY, value TEXT)"
                ))?;
                // Application-owned tables may lack a unique key, so no upsert.
                let updated = ctx.execute_params(
                    &format!("UPDATE {table} SET value = ?2 WHERE key = ?1"),
                    [&key, &value],
                )?;
                if updated == 0 {
                    ctx.execute_params(
                        &format!("INSERT INTO {table} (key, value) VALUES (?1, ?2)"),
                        [&key, &value],
                    )?;
                }
                Ok::<_, SqliteError>(())
            })
            .await?;

        Ok(())
    }
}

/// An in-memory version store.
#[derive(Debug, Default)]
pub struct MemoryVersionStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryVersionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one marker.
    pub fn with_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let store = Self::new();
        store.values.write().insert(key.into(), value.into());
        store
    }
}

#[async_trait::async_trait]
impl VersionStore for MemoryVersionStore {
    async fn get(&self, key: &str) -> MigrateResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> MigrateResult<()> {
        self.values.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
