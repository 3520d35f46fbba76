//! `strata version` command - Display version information.

use strata_migrate::{MigrationRegistry, Version};

use crate::error::CliResult;
use crate::output::{self, kv};

/// Package version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name
const NAME: &str = "strata";

/// Run the version command
pub async fn run() -> CliResult<()> {
    output::header("strata");

    kv("Version", VERSION);
    kv("Binary", NAME);

    #[cfg(debug_assertions)]
    let build_mode = "debug";
    #[cfg(not(debug_assertions))]
    let build_mode = "release";

    kv("Build", build_mode);

    let set = MigrationRegistry::bundled().discover();
    kv("Schema", &set.target(Version::BASELINE).to_string());
    kv("Steps", &set.len().to_string());

    output::newline();

    output::section("Components");
    kv("strata-cli", VERSION);
    kv("strata-migrate", VERSION);
    kv("strata-sqlite", VERSION);

    Ok(())
}
