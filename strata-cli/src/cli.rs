//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE_NAME;

/// strata - schema migrations for embedded SQLite databases
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "strata - schema migrations for embedded SQLite databases", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Log each migration step as it runs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Database migration commands
    Migrate(MigrateArgs),

    /// Display version information
    Version,
}

// =============================================================================
// Migrate Command
// =============================================================================

/// Arguments for the `migrate` command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateSubcommand,
}

/// Migration subcommands
#[derive(Subcommand, Debug)]
pub enum MigrateSubcommand {
    /// Upgrade the database to the newest schema version
    Run(MigrateRunArgs),

    /// Show the stored schema version and pending steps
    Status(MigrateStatusArgs),

    /// List the migration steps known to this build
    List(MigrateListArgs),
}

/// Arguments for `migrate run`
#[derive(Args, Debug)]
pub struct MigrateRunArgs {
    /// Database URL (overrides the configuration file)
    #[arg(long, env = "STRATA_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Show the steps that would run without executing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for `migrate status`
#[derive(Args, Debug)]
pub struct MigrateStatusArgs {
    /// Database URL (overrides the configuration file)
    #[arg(long, env = "STRATA_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `migrate list`
#[derive(Args, Debug)]
pub struct MigrateListArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}
