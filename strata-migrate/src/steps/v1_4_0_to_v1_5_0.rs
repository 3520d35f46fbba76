//! v1.4.0 -> v1.5.0: plugins declare whether they can open as a standalone app.

use strata_sqlite::StepContext;
use tracing::{info, warn};

use crate::error::MigrateResult;
use crate::step::StepOutcome;

pub(super) fn run(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
    if !ctx.table_exists("plugins")? {
        info!("Table `plugins` not found, skipping");
        return Ok(StepOutcome::already_applied("table `plugins` does not exist"));
    }

    if ctx.column_exists("plugins", "open_app")? {
        warn!("Column `plugins.open_app` already exists");
        return Ok(StepOutcome::already_applied("column `plugins.open_app` exists"));
    }

    ctx.execute("ALTER TABLE plugins ADD COLUMN open_app BOOLEAN NOT NULL DEFAULT 0")?;
    info!("Added column `plugins.open_app`");

    Ok(StepOutcome::Applied)
}
