//! v1.5.5 -> v1.6.0: rebuild `plugins` for the reworked plugin system.
//!
//! Plugins installed by older releases are incompatible, so the table is
//! dropped and recreated and its rows are discarded. `url` and `enabled` go
//! away, `key` becomes required and unique, and `license`, `manifest`,
//! `loaded_routes` and `loaded_processors` are added.

use strata_sqlite::StepContext;
use tracing::{info, warn};

use crate::error::MigrateResult;
use crate::step::StepOutcome;

/// Definition of the `plugins` table from v1.6.0 on.
pub const PLUGINS_TABLE_SQL: &str = "CREATE TABLE plugins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key VARCHAR(100) NOT NULL UNIQUE,
    name VARCHAR(255),
    version VARCHAR(50),
    description TEXT,
    author VARCHAR(255),
    website VARCHAR(2048),
    github VARCHAR(2048),
    license VARCHAR(100),
    manifest TEXT,
    open_app BOOLEAN NOT NULL DEFAULT 0,
    supported_exts TEXT,
    default_bounds TEXT,
    default_maximized BOOLEAN,
    icon VARCHAR(2048),
    loaded_routes TEXT,
    loaded_processors TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

pub(super) fn run(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
    if !ctx.table_exists("plugins")? {
        info!("Table `plugins` not found, skipping");
        return Ok(StepOutcome::already_applied("table `plugins` does not exist"));
    }

    // The new shape is the only one with `manifest`; rebuilding it again would
    // throw away plugins installed since.
    if ctx.column_exists("plugins", "manifest")? {
        warn!("Table `plugins` already has the v1.6.0 shape");
        return Ok(StepOutcome::already_applied("table `plugins` already rebuilt"));
    }

    ctx.execute("DROP TABLE plugins")?;
    info!("Dropped legacy table `plugins`");

    ctx.execute(PLUGINS_TABLE_SQL)?;
    info!("Created table `plugins`");

    Ok(StepOutcome::Applied)
}
