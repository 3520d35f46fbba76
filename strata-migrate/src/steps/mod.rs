//! Migration steps shipped with strata.
//!
//! Every step is registered here in one static list. Adding a step means
//! writing its module and appending a descriptor; discovery sorts the list,
//! so registration order does not matter.

mod v1_0_0_to_v1_1_0;
mod v1_4_0_to_v1_5_0;
mod v1_5_5_to_v1_6_0;

use crate::step::StepDescriptor;
use crate::version::Version;

static BUNDLED: [StepDescriptor; 3] = [
    StepDescriptor::new(
        Version::new(1, 0, 0),
        Version::new(1, 1, 0),
        "Merge mounts into storage_adapters",
        v1_0_0_to_v1_1_0::run,
    ),
    StepDescriptor::new(
        Version::new(1, 4, 0),
        Version::new(1, 5, 0),
        "Add plugins.open_app",
        v1_4_0_to_v1_5_0::run,
    ),
    StepDescriptor::new(
        Version::new(1, 5, 5),
        Version::new(1, 6, 0),
        "Rebuild plugins for the new plugin system",
        v1_5_5_to_v1_6_0::run,
    ),
];

/// The bundled step descriptors.
pub fn bundled() -> &'static [StepDescriptor] {
    &BUNDLED
}

pub use v1_5_5_to_v1_6_0::PLUGINS_TABLE_SQL;
