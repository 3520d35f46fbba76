//! Row deserialization traits for SQLite.

use serde_json::Value as JsonValue;

/// A result row keyed by column name.
pub type Row = serde_json::Map<String, JsonValue>;

/// Trait for converting a SQLite row to a Rust type.
///
/// Step bodies implement this for the records they read back before
/// rewriting a table.
pub trait FromSqliteRow: Sized {
    /// Convert a SQLite row to this type.
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, FromSqliteRowError>;
}

/// Error type for row deserialization.
#[derive(Debug)]
pub struct FromSqliteRowError {
    /// The error message.
    pub message: String,
    /// The column that caused the error, if known.
    pub column: Option<String>,
}

impl FromSqliteRowError {
    /// Create a new error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            column: None,
        }
    }

    /// Create a new error with a column name.
    pub fn with_column(message: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            column: Some(column.into()),
        }
    }
}

impl std::fmt::Display for FromSqliteRowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.column {
            Some(ref column) => write!(f, "column '{}': {}", column, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for FromSqliteRowError {}

impl From<rusqlite::Error> for FromSqliteRowError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::InvalidColumnType(_, column, ty) => {
                Self::with_column(format!("unexpected type {ty}"), column)
            }
            rusqlite::Error::InvalidColumnName(column) => {
                Self::with_column("no such column", column)
            }
            other => Self::new(other.to_string()),
        }
    }
}

impl FromSqliteRow for Row {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, FromSqliteRowError> {
        let stmt = row.as_ref();
        let mut map = Row::new();

        for i in 0..stmt.column_count() {
            let name = stmt.column_name(i)?.to_string();
            map.insert(name, crate::types::get_value_at_index(row, i));
        }

        Ok(map)
    }
}

impl FromSqliteRow for JsonValue {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, FromSqliteRowError> {
        Row::from_row(row).map(JsonValue::Object)
    }
}
