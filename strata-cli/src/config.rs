//! CLI configuration handling.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use strata_migrate::{DEFAULT_CONFIG_TABLE, DEFAULT_VERSION_KEY, MigrationConfig, Version};

use crate::error::{CliError, CliResult};

/// Default config file name (lives in the working directory)
pub const CONFIG_FILE_NAME: &str = "strata.toml";

/// Database URL used when neither the command line nor the config names one
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/db/db.sqlite3";

/// strata CLI configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Migration configuration
    pub migrations: MigrationsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the database URL.
    ///
    /// An explicit URL (flag or `STRATA_DATABASE_URL`) wins over the config
    /// file, which wins over [`DEFAULT_DATABASE_URL`].
    pub fn database_url(&self, explicit: Option<&str>) -> CliResult<String> {
        if let Some(url) = explicit.filter(|url| !url.trim().is_empty()) {
            return Ok(url.to_string());
        }

        if let Some(ref url) = self.database.url {
            let expanded = expand_env_var(url)?;
            if expanded.contains("${") {
                return Err(CliError::Config(format!(
                    "database.url references an unset environment variable: {}",
                    url
                )));
            }
            if !expanded.is_empty() {
                return Ok(expanded);
            }
        }

        Ok(DEFAULT_DATABASE_URL.to_string())
    }

    /// Build the engine configuration.
    pub fn migration_config(&self, dry_run: bool) -> CliResult<MigrationConfig> {
        let baseline: Version = self.migrations.baseline_version.parse().map_err(|e| {
            CliError::Config(format!("migrations.baseline_version: {}", e))
        })?;

        let mut config = MigrationConfig::new()
            .version_key(&self.migrations.version_key)
            .baseline_version(baseline)
            .config_table(&self.migrations.config_table)
            .dry_run(dry_run);

        if let Some(secs) = self.migrations.stall_warning_secs.filter(|secs| *secs > 0) {
            config = config.stall_warning(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

/// Database configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL (`${VAR}` is expanded)
    pub url: Option<String>,
}

/// Migration configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    /// Key of the schema version marker
    pub version_key: String,

    /// Version assumed when no marker is stored
    pub baseline_version: String,

    /// Table holding the version marker
    pub config_table: String,

    /// Warn when one step runs longer than this many seconds (0 disables)
    pub stall_warning_secs: Option<u64>,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            version_key: DEFAULT_VERSION_KEY.to_string(),
            baseline_version: Version::BASELINE.to_string(),
            config_table: DEFAULT_CONFIG_TABLE.to_string(),
            stall_warning_secs: Some(60),
        }
    }
}

/// Expand `${VAR}` and `$VAR` references from the environment.
///
/// Unset variables are left in place.
fn expand_env_var(s: &str) -> CliResult<String> {
    let braced = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| CliError::Config(format!("invalid pattern: {}", e)))?;
    let bare = regex_lite::Regex::new(r"\$([A-Z_][A-Z0-9_]*)")
        .map_err(|e| CliError::Config(format!("invalid pattern: {}", e)))?;

    let mut result = s.to_string();
    for cap in braced.captures_iter(s) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    for cap in bare.captures_iter(&result.clone()) {
        if let Ok(value) = std::env::var(&cap[1]) {
            result = result.replace(&cap[0], &value);
        }
    }

    Ok(result)
}
