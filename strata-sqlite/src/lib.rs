//! SQLite connection layer for strata.
//!
//! This crate owns everything the migration engine needs from the database:
//! opening a connection from a URL-like locator, running statements and
//! queries, executing a body inside exactly one transaction, and answering
//! capability questions about the schema (`table_exists`, `column_exists`,
//! `index_exists`) without parsing driver error messages.
//!
//! All database work happens on a single background thread owned by
//! `tokio-rusqlite`; async callers only suspend at the call boundary.
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_sqlite::{SqliteConfig, SqliteConnection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SqliteConfig::from_url("sqlite://data/db/db.sqlite3")?;
//!     if !config.path.exists() {
//!         return Ok(());
//!     }
//!
//!     let conn = SqliteConnection::open(&config).await?;
//!     let added = conn
//!         .with_transaction(|ctx| {
//!             if ctx.column_exists("plugins", "open_app")? {
//!                 return Ok(false);
//!             }
//!             ctx.execute("ALTER TABLE plugins ADD COLUMN open_app BOOLEAN NOT NULL DEFAULT 0")?;
//!             Ok::<_, strata_sqlite::SqliteError>(true)
//!         })
//!         .await?;
//!     println!("column added: {added}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod context;
pub mod error;
pub mod row;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use connection::SqliteConnection;
pub use context::StepContext;
pub use error::{SqliteError, SqliteResult};
pub use row::{FromSqliteRow, FromSqliteRowError, Row};

// Step bodies bind parameters with the driver's own macros and traits.
pub use rusqlite::{params, types::Value, ToSql};
