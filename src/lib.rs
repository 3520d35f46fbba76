//! # Strata
//!
//! Versioned schema migrations for embedded SQLite databases.
//!
//! Strata keeps an application's database in step with its code. Each
//! release that changes the schema ships a migration step keyed by the
//! version it starts from; at startup the engine reads the stored version
//! marker and walks the steps forward until the schema is current.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strata::MigrationError> {
//!     let sqlite = SqliteConfig::from_url("sqlite://data/db/db.sqlite3")?;
//!
//!     match run_migrations(&sqlite, MigrationConfig::new(), &MigrationRegistry::bundled()).await? {
//!         RunOutcome::NoDatastore => println!("fresh install, nothing to migrate"),
//!         RunOutcome::Completed(report) => println!("{}", report.summary()),
//!     }
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// SQLite connection layer.
pub mod sqlite {
    pub use strata_sqlite::*;
}

/// Migration engine, steps, and version store.
pub mod migrate {
    pub use strata_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        MigrateResult, MigrationConfig, MigrationEngine, MigrationRegistry, MigrationReport,
        RunOutcome, StepDescriptor, StepOutcome, Version, migration_status, run_migrations,
    };
    pub use crate::sqlite::{SqliteConfig, SqliteConnection, StepContext};
}

// Re-export key types at the crate root
pub use migrate::{MigrationError, Version};
pub use sqlite::SqliteError;
