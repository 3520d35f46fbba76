//! # strata-migrate
//!
//! Version-walking migration engine for embedded SQLite databases.
//!
//! A database carries a version marker (`APP_VERSION` in a `configurations`
//! table by default). Each migration step declares the version it migrates
//! *from* and the version it migrates *to*. On every run the engine:
//!
//! 1. reads the marker, assuming `v1.0.0` when it is absent,
//! 2. picks the first step whose source version is at or above the marker,
//! 3. runs that step inside one transaction,
//! 4. advances the marker to the step's target after the commit,
//!
//! and repeats until no step is left. Releases without schema changes need
//! no step of their own; the engine simply moves on to the next declared one.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐  discover  ┌──────────────┐
//! │ MigrationRegistry │───────────▶│ MigrationSet │
//! └───────────────────┘            └──────────────┘
//!                                         │ select
//!                                         ▼
//! ┌──────────────┐   get / set   ┌─────────────────┐  with_transaction  ┌────────┐
//! │ VersionStore │◀─────────────▶│ MigrationEngine │───────────────────▶│ SQLite │
//! └──────────────┘               └─────────────────┘                    └────────┘
//! ```
//!
//! ## Writing a step
//!
//! Steps must be idempotent: they probe the schema first and report
//! [`StepOutcome::AlreadyApplied`] when the work is already done, so a run
//! interrupted between commit and marker update can simply be repeated.
//!
//! ```rust,ignore
//! use strata_migrate::{MigrateResult, StepDescriptor, StepOutcome, Version};
//! use strata_sqlite::StepContext;
//!
//! fn add_theme(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
//!     if ctx.column_exists("users", "theme")? {
//!         return Ok(StepOutcome::already_applied("users.theme exists"));
//!     }
//!     ctx.execute("ALTER TABLE users ADD COLUMN theme TEXT")?;
//!     Ok(StepOutcome::Applied)
//! }
//!
//! const ADD_THEME: StepDescriptor =
//!     StepDescriptor::new(Version::new(1, 6, 0), Version::new(1, 7, 0), "Add users.theme", add_theme);
//! ```
//!
//! ## Running
//!
//! ```rust,ignore
//! use strata_migrate::{run_migrations, MigrationConfig, MigrationRegistry, RunOutcome};
//! use strata_sqlite::SqliteConfig;
//!
//! let sqlite = SqliteConfig::from_url("sqlite://data/db/db.sqlite3")?;
//! match run_migrations(&sqlite, MigrationConfig::new(), &MigrationRegistry::bundled()).await? {
//!     RunOutcome::NoDatastore => println!("no database yet"),
//!     RunOutcome::Completed(report) => println!("{}", report.summary()),
//! }
//! ```

pub mod engine;
pub mod error;
pub mod registry;
pub mod step;
pub mod steps;
pub mod version;
pub mod version_store;

pub use engine::{
    AppliedStep, DEFAULT_VERSION_KEY, MigrationConfig, MigrationEngine, MigrationReport,
    MigrationStatus, PendingStep, RunOutcome, migration_status, run_migrations,
};
pub use error::{MigrateResult, MigrationError};
pub use registry::{MigrationRegistry, MigrationSet};
pub use step::{MigrationStep, StepDescriptor, StepFn, StepOutcome};
pub use version::{Version, VersionParseError};
pub use version_store::{ConfigTableStore, DEFAULT_CONFIG_TABLE, MemoryVersionStore, VersionStore};
