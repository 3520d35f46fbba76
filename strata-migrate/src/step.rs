//! The migration step contract.

use std::fmt;

use serde::Serialize;
use strata_sqlite::StepContext;

use crate::error::MigrateResult;
use crate::version::{Version, VersionParseError};

/// Entry point of a migration step.
///
/// The function runs inside the step's transaction; returning `Err` rolls
/// everything it did back. It must be safe to call again on a schema it has
/// already migrated.
pub type StepFn = fn(&StepContext<'_>) -> MigrateResult<StepOutcome>;

/// What a step did when it ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step changed the schema.
    Applied,
    /// The step found its work already done (or nothing to act on) and
    /// changed nothing.
    AlreadyApplied(String),
    /// The step would run; reported by dry runs, which execute nothing.
    Planned,
}

impl StepOutcome {
    /// Report prior completion.
    pub fn already_applied(reason: impl Into<String>) -> Self {
        Self::AlreadyApplied(reason.into())
    }

    /// Whether the step made changes.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::AlreadyApplied(reason) => write!(f, "already applied ({reason})"),
            Self::Planned => f.write_str("planned"),
        }
    }
}

/// A statically registered step definition.
///
/// A descriptor without a `run` function is a placeholder and is ignored by
/// discovery.
#[derive(Debug, Clone, Copy)]
pub struct StepDescriptor {
    /// Version the step migrates from.
    pub from: Version,
    /// Version the step migrates to.
    pub to: Version,
    /// One-line description.
    pub description: &'static str,
    /// Entry point.
    pub run: Option<StepFn>,
}

impl StepDescriptor {
    /// Create a descriptor with an entry point.
    pub const fn new(from: Version, to: Version, description: &'static str, run: StepFn) -> Self {
        Self {
            from,
            to,
            description,
            run: Some(run),
        }
    }

    /// Conventional identifier, `from_vX.Y.Z_to_vX.Y.Z`.
    pub fn id(&self) -> String {
        step_id(self.from, self.to)
    }

    /// Parse a conventional identifier back into its `(from, to)` pair.
    pub fn parse_id(id: &str) -> Result<(Version, Version), VersionParseError> {
        let (from, to) = id
            .strip_prefix("from_")
            .and_then(|rest| rest.split_once("_to_"))
            .ok_or_else(|| VersionParseError::new(id))?;
        Ok((from.parse()?, to.parse()?))
    }
}

fn step_id(from: Version, to: Version) -> String {
    format!("from_{from}_to_{to}")
}

/// A discovered, runnable step.
#[derive(Clone)]
pub struct MigrationStep {
    from: Version,
    to: Version,
    description: &'static str,
    run: StepFn,
}

impl MigrationStep {
    /// Create a runnable step.
    pub fn new(from: Version, to: Version, description: &'static str, run: StepFn) -> Self {
        Self {
            from,
            to,
            description,
            run,
        }
    }

    /// Build from a descriptor, if it has an entry point.
    pub fn from_descriptor(descriptor: &StepDescriptor) -> Option<Self> {
        descriptor
            .run
            .map(|run| Self::new(descriptor.from, descriptor.to, descriptor.description, run))
    }

    /// Version the step migrates from.
    pub fn from(&self) -> Version {
        self.from
    }

    /// Version the step migrates to.
    pub fn to(&self) -> Version {
        self.to
    }

    /// Conventional identifier.
    pub fn id(&self) -> String {
        step_id(self.from, self.to)
    }

    /// One-line description.
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Run the step body synchronously against a caller-owned connection or
    /// transaction.
    ///
    /// This is the entry point for embedders driving `rusqlite` directly and
    /// for exercising a step in isolation. It does not open a transaction or
    /// touch the version marker; [`crate::MigrationEngine`] does both.
    pub fn run(&self, ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
        (self.run)(ctx)
    }

    /// The raw entry point, for moving onto the connection thread.
    pub(crate) fn entry_point(&self) -> StepFn {
        self.run
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}
