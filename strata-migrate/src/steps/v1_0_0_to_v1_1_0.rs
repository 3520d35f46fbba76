//! v1.0.0 -> v1.1.0: fold the `mounts` table into `storage_adapters`.
//!
//! Each mount carries the path of exactly one adapter. The path columns move
//! onto the adapter row, `mounts` is dropped, and adapter paths become unique.

use strata_sqlite::{FromSqliteRow, FromSqliteRowError, StepContext, params};
use tracing::{debug, info, warn};

use crate::error::MigrateResult;
use crate::step::StepOutcome;

const PATH_INDEX: &str = "uix_storage_adapters_path";

/// A row of the legacy `mounts` table.
#[derive(Debug)]
struct Mount {
    id: i64,
    path: Option<String>,
    sub_path: Option<String>,
    adapter_id: Option<i64>,
}

impl FromSqliteRow for Mount {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, FromSqliteRowError> {
        Ok(Self {
            id: row.get("id")?,
            path: row.get("path")?,
            sub_path: row.get("sub_path")?,
            adapter_id: row.get("adapter_id")?,
        })
    }
}

pub(super) fn run(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
    if !ctx.table_exists("mounts")? {
        info!("Table `mounts` not found, skipping");
        return Ok(StepOutcome::already_applied("table `mounts` does not exist"));
    }

    info!("Found table `mounts`, merging into `storage_adapters`");

    for (column, ty) in [("path", "VARCHAR(255)"), ("sub_path", "VARCHAR(1024)")] {
        if ctx.column_exists("storage_adapters", column)? {
            warn!(column, "Column already exists on `storage_adapters`");
        } else {
            ctx.execute(&format!("ALTER TABLE storage_adapters ADD COLUMN {column} {ty}"))?;
            debug!(column, "Added column to `storage_adapters`");
        }
    }

    let mounts: Vec<Mount> = ctx.query_as("SELECT id, path, sub_path, adapter_id FROM mounts", [])?;
    if mounts.is_empty() {
        info!("No rows in `mounts`, nothing to transfer");
    }

    for mount in &mounts {
        debug!(
            mount = mount.id,
            path = ?mount.path,
            adapter = ?mount.adapter_id,
            "Moving mount onto adapter"
        );
        ctx.execute_params(
            "UPDATE storage_adapters SET path = ?1, sub_path = ?2 WHERE id = ?3",
            params![mount.path, mount.sub_path, mount.adapter_id],
        )?;
    }

    ctx.execute("DROP TABLE mounts")?;
    info!(rows = mounts.len(), "Dropped table `mounts`");

    if ctx.index_exists(PATH_INDEX)? {
        warn!(index = PATH_INDEX, "Index already exists");
    } else {
        ctx.execute(&format!("CREATE UNIQUE INDEX {PATH_INDEX} ON storage_adapters (path)"))?;
        debug!(index = PATH_INDEX, "Created unique index");
    }

    Ok(StepOutcome::Applied)
}
