//! Step discovery and ordering.

use tracing::{debug, trace};

use crate::error::{MigrateResult, MigrationError};
use crate::step::{MigrationStep, StepDescriptor};
use crate::version::Version;

/// The collection of step definitions known to this build.
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    descriptors: Vec<StepDescriptor>,
}

impl MigrationRegistry {
    /// Create a registry from explicit descriptors.
    pub fn new(descriptors: impl IntoIterator<Item = StepDescriptor>) -> Self {
        Self {
            descriptors: descriptors.into_iter().collect(),
        }
    }

    /// The registry of steps shipped with this crate.
    pub fn bundled() -> Self {
        Self::new(crate::steps::bundled().iter().copied())
    }

    /// Add a descriptor.
    pub fn register(mut self, descriptor: StepDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// All registered descriptors, in registration order.
    pub fn descriptors(&self) -> &[StepDescriptor] {
        &self.descriptors
    }

    /// Build the ordered step list.
    ///
    /// Descriptors without an entry point are skipped. The result is sorted
    /// ascending by source version; ties keep registration order. No
    /// validation happens here, see [`MigrationSet::validate`].
    pub fn discover(&self) -> MigrationSet {
        let mut steps: Vec<MigrationStep> = self
            .descriptors
            .iter()
            .filter_map(|descriptor| {
                let step = MigrationStep::from_descriptor(descriptor);
                if step.is_none() {
                    trace!(step = %descriptor.id(), "Skipping step without entry point");
                }
                step
            })
            .collect();

        steps.sort_by_key(|step| step.from());
        debug!(count = steps.len(), "Discovered migration steps");

        MigrationSet { steps }
    }
}

/// An ordered, immutable sequence of steps.
#[derive(Debug, Clone, Default)]
pub struct MigrationSet {
    steps: Vec<MigrationStep>,
}

impl MigrationSet {
    /// The steps in ascending source-version order.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the set has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over the steps in order.
    pub fn iter(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps.iter()
    }

    /// Reject sets the engine cannot walk safely.
    ///
    /// Two steps sharing a source version are ambiguous, and a step that does
    /// not advance the version would be selected forever.
    pub fn validate(&self) -> MigrateResult<()> {
        for step in &self.steps {
            if step.to() <= step.from() {
                return Err(MigrationError::NonForwardStep {
                    step: step.id(),
                    from: step.from(),
                    to: step.to(),
                });
            }
        }

        for pair in self.steps.windows(2) {
            if pair[0].from() == pair[1].from() {
                return Err(MigrationError::DuplicateFromVersion {
                    version: pair[0].from(),
                    first: pair[0].id(),
                    second: pair[1].id(),
                });
            }
        }

        Ok(())
    }

    /// The first step whose source version is at or above `current`.
    pub fn select(&self, current: Version) -> Option<&MigrationStep> {
        self.steps.iter().find(|step| step.from() >= current)
    }

    /// The steps a run starting at `current` would apply, in order.
    ///
    /// Stops if a step fails to advance the version, so an unvalidated set
    /// still yields a finite plan.
    pub fn plan(&self, current: Version) -> Vec<&MigrationStep> {
        let mut planned = Vec::new();
        let mut version = current;

        while let Some(step) = self.select(version) {
            if step.to() <= step.from() || step.to() <= version {
                break;
            }
            planned.push(step);
            version = step.to();
        }

        planned
    }

    /// The version a run starting at `current` would end on.
    pub fn target(&self, current: Version) -> Version {
        self.plan(current).last().map_or(current, |step| step.to())
    }
}

impl<'a> IntoIterator for &'a MigrationSet {
    type Item = &'a MigrationStep;
    type IntoIter = std::slice::Iter<'a, MigrationStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
