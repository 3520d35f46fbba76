//! `strata migrate` commands - Schema version upgrades.

use std::path::Path;

use serde::Serialize;
use strata_migrate::{
    MigrationConfig, MigrationRegistry, MigrationStatus, PendingStep, RunOutcome, StepOutcome,
    migration_status, run_migrations,
};
use strata_sqlite::SqliteConfig;

use crate::cli::{MigrateArgs, MigrateListArgs, MigrateRunArgs, MigrateStatusArgs, MigrateSubcommand};
use crate::config::Config;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run the migrate command
pub async fn run(args: MigrateArgs, config_path: &Path) -> CliResult<()> {
    match args.command {
        MigrateSubcommand::Run(run_args) => run_upgrade(run_args, config_path).await,
        MigrateSubcommand::Status(status_args) => run_status(status_args, config_path).await,
        MigrateSubcommand::List(list_args) => run_list(list_args),
    }
}

/// Everything a command needs to reach the database.
struct Target {
    url: String,
    sqlite: SqliteConfig,
    migrations: MigrationConfig,
}

fn resolve_target(config_path: &Path, database_url: Option<&str>, dry_run: bool) -> CliResult<Target> {
    let config = Config::load_or_default(config_path)?;
    let url = config.database_url(database_url)?;
    let sqlite = SqliteConfig::from_url(&url)?;
    let migrations = config.migration_config(dry_run)?;

    Ok(Target {
        url,
        sqlite,
        migrations,
    })
}

/// Run `strata migrate run`
async fn run_upgrade(args: MigrateRunArgs, config_path: &Path) -> CliResult<()> {
    let target = resolve_target(config_path, args.database_url.as_deref(), args.dry_run)?;

    output::header(if args.dry_run { "Migrate Run (dry run)" } else { "Migrate Run" });
    output::kv("Database", &target.url);
    output::newline();

    let registry = MigrationRegistry::bundled();
    let report = match run_migrations(&target.sqlite, target.migrations, &registry).await? {
        RunOutcome::NoDatastore => {
            output::info("No database found, nothing to migrate");
            success("Done");
            return Ok(());
        }
        RunOutcome::Completed(report) => report,
    };

    let total = report.applied.len();
    for (index, step) in report.applied.iter().enumerate() {
        let mut line = format!("{} → {}", step.from, step.to);
        if step.skipped_forward {
            line.push_str(" (skipped forward)");
        }
        let outcome = match &step.outcome {
            StepOutcome::Applied => output::style_success(&step.outcome.to_string()),
            StepOutcome::AlreadyApplied(_) => step.outcome.to_string(),
            StepOutcome::Planned => output::style_pending(&step.outcome.to_string()),
        };
        output::step(index + 1, total, &format!("{}: {}", line, outcome));
    }

    if total > 0 {
        output::newline();
    }

    output::kv("Schema version", &report.final_version.to_string());
    output::newline();
    success(&report.summary());

    Ok(())
}

/// JSON shape of `strata migrate status --json`
#[derive(Debug, Serialize)]
struct StatusOutput<'a> {
    database: &'a str,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a MigrationStatus>,
}

/// Run `strata migrate status`
async fn run_status(args: MigrateStatusArgs, config_path: &Path) -> CliResult<()> {
    let target = resolve_target(config_path, args.database_url.as_deref(), false)?;
    let registry = MigrationRegistry::bundled();
    let status = migration_status(&target.sqlite, target.migrations, &registry).await?;

    if args.json {
        return output::json(&StatusOutput {
            database: &target.url,
            exists: status.is_some(),
            status: status.as_ref(),
        });
    }

    output::header("Migration Status");
    output::kv("Database", &target.url);

    let Some(status) = status else {
        output::newline();
        output::info("No database found");
        return Ok(());
    };

    let current = if status.marker_present {
        status.current_version.to_string()
    } else {
        format!("{} (no marker stored)", status.current_version)
    };
    output::kv("Schema version", &current);
    output::kv("Target version", &status.target_version().to_string());
    output::newline();

    if status.is_up_to_date() {
        success("Schema is up to date");
        return Ok(());
    }

    output::section(&format!("{} pending steps", status.pending.len()));
    for step in &status.pending {
        output::list_item(&format!(
            "{} {}",
            output::style_pending(&step.id),
            step.description
        ));
    }
    output::newline();
    output::dim("Run `strata migrate run` to apply them");

    Ok(())
}

/// Run `strata migrate list`
fn run_list(args: MigrateListArgs) -> CliResult<()> {
    let set = MigrationRegistry::bundled().discover();
    let steps: Vec<PendingStep> = set.iter().map(PendingStep::from).collect();

    if args.json {
        return output::json(&steps);
    }

    output::header("Migration Steps");
    for step in &steps {
        output::list_item(&format!("{} {}", step.id, step.description));
    }
    output::newline();
    output::kv("Latest schema version", &set.target(strata_migrate::Version::BASELINE).to_string());

    Ok(())
}
