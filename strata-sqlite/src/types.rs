//! Type conversion utilities for SQLite.

use rusqlite::types::ValueRef;
use serde_json::Value as JsonValue;

/// Convert a SQLite ValueRef to a JSON Value.
///
/// Text is always surfaced as a string; schema migrations read values back
/// verbatim and must not reinterpret stored JSON. Blobs become an array of
/// byte values.
pub fn from_sqlite_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            JsonValue::Array(bytes.iter().map(|b| JsonValue::Number((*b).into())).collect())
        }
    }
}

/// Get a JSON value from a row at the given column index.
pub fn get_value_at_index(row: &rusqlite::Row<'_>, index: usize) -> JsonValue {
    match row.get_ref(index) {
        Ok(v) => from_sqlite_value(v),
        Err(_) => JsonValue::Null,
    }
}
