//! Error types for the migration engine.

use strata_sqlite::SqliteError;
use thiserror::Error;

use crate::version::{Version, VersionParseError};

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// SQLite layer error.
    #[error(transparent)]
    Sqlite(#[from] SqliteError),

    /// A version string (stored marker or step identifier) did not parse.
    #[error("Invalid version: {0}")]
    InvalidVersion(#[from] VersionParseError),

    /// Two registered steps start from the same version.
    #[error("Duplicate migration steps from {version}: '{first}' and '{second}'")]
    DuplicateFromVersion {
        /// The shared starting version.
        version: Version,
        /// ID of the first step.
        first: String,
        /// ID of the second step.
        second: String,
    },

    /// A step whose target does not advance past its source.
    #[error("Migration step '{step}' does not move forward ({from} -> {to})")]
    NonForwardStep {
        /// Step ID.
        step: String,
        /// Declared source version.
        from: Version,
        /// Declared target version.
        to: Version,
    },

    /// A step failed; its transaction was rolled back.
    #[error("Migration step '{step}' failed: {source}")]
    StepFailed {
        /// Step ID.
        step: String,
        /// Underlying failure.
        #[source]
        source: Box<MigrationError>,
    },

    /// Reading or writing the version marker failed.
    #[error("Version store error: {0}")]
    VersionStore(String),
}

impl MigrationError {
    /// Create a version store error.
    pub fn version_store(msg: impl Into<String>) -> Self {
        Self::VersionStore(msg.into())
    }

    /// Wrap a failure raised while running `step`.
    pub fn step_failed(step: impl Into<String>, source: MigrationError) -> Self {
        Self::StepFailed {
            step: step.into(),
            source: Box::new(source),
        }
    }
}

impl From<strata_sqlite::FromSqliteRowError> for MigrationError {
    fn from(err: strata_sqlite::FromSqliteRowError) -> Self {
        Self::Sqlite(err.into())
    }
}
