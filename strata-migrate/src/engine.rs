//! Migration engine implementation.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use strata_sqlite::{SqliteConfig, SqliteConnection};
use tracing::{debug, info, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::registry::{MigrationRegistry, MigrationSet};
use crate::step::{MigrationStep, StepOutcome};
use crate::version::Version;
use crate::version_store::{ConfigTableStore, DEFAULT_CONFIG_TABLE, VersionStore};

/// Key under which the schema version marker is stored.
pub const DEFAULT_VERSION_KEY: &str = "APP_VERSION";

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Key of the version marker in the version store.
    pub version_key: String,
    /// Version assumed when no marker is stored.
    pub baseline_version: Version,
    /// Table backing the marker when the engine builds its own store.
    pub config_table: String,
    /// Whether to run in dry-run mode.
    pub dry_run: bool,
    /// Log a warning each time this much time passes while one step is
    /// still running. Steps are never cancelled.
    pub stall_warning: Option<Duration>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            version_key: DEFAULT_VERSION_KEY.to_string(),
            baseline_version: Version::BASELINE,
            config_table: DEFAULT_CONFIG_TABLE.to_string(),
            dry_run: false,
            stall_warning: None,
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the version marker key.
    pub fn version_key(mut self, key: impl Into<String>) -> Self {
        self.version_key = key.into();
        self
    }

    /// Set the version assumed when no marker exists.
    pub fn baseline_version(mut self, version: Version) -> Self {
        self.baseline_version = version;
        self
    }

    /// Set the table holding the version marker.
    pub fn config_table(mut self, table: impl Into<String>) -> Self {
        self.config_table = table.into();
        self
    }

    /// Enable dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Warn periodically about long-running steps.
    pub fn stall_warning(mut self, interval: Duration) -> Self {
        self.stall_warning = Some(interval);
        self
    }
}

/// One step executed (or planned, in a dry run) by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedStep {
    /// Step ID.
    pub id: String,
    /// Source version.
    pub from: Version,
    /// Target version.
    pub to: Version,
    /// What the step reported.
    pub outcome: StepOutcome,
    /// Whether the step was selected past a version gap.
    pub skipped_forward: bool,
    /// Duration of the step in milliseconds.
    pub duration_ms: i64,
    /// When the step finished.
    pub applied_at: DateTime<Utc>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Marker value when the run started.
    pub initial_version: Version,
    /// Marker value when the run ended.
    pub final_version: Version,
    /// Steps in execution order.
    pub applied: Vec<AppliedStep>,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl MigrationReport {
    /// Check if the stored version moved.
    pub fn has_changes(&self) -> bool {
        self.initial_version != self.final_version
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        if self.applied.is_empty() {
            return format!("Schema is up to date at {}", self.final_version);
        }

        if self.dry_run {
            let target = self.applied.last().map_or(self.final_version, |s| s.to);
            return format!(
                "{} steps would migrate {} to {}",
                self.applied.len(),
                self.initial_version,
                target
            );
        }

        let changed = self.applied.iter().filter(|s| s.outcome.is_applied()).count();
        format!(
            "Migrated {} to {} ({} steps, {} changed schema) in {}ms",
            self.initial_version,
            self.final_version,
            self.applied.len(),
            changed,
            self.duration_ms
        )
    }
}

/// A step that a run would apply.
#[derive(Debug, Clone, Serialize)]
pub struct PendingStep {
    /// Step ID.
    pub id: String,
    /// Source version.
    pub from: Version,
    /// Target version.
    pub to: Version,
    /// One-line description.
    pub description: String,
}

impl From<&MigrationStep> for PendingStep {
    fn from(step: &MigrationStep) -> Self {
        Self {
            id: step.id(),
            from: step.from(),
            to: step.to(),
            description: step.description().to_string(),
        }
    }
}

/// Where the schema stands relative to the known steps.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatus {
    /// Current version (the baseline if no marker is stored).
    pub current_version: Version,
    /// Whether a marker is stored.
    pub marker_present: bool,
    /// Steps a run would apply, in order.
    pub pending: Vec<PendingStep>,
}

impl MigrationStatus {
    /// Check if no steps are pending.
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    /// The version a run would end on.
    pub fn target_version(&self) -> Version {
        self.pending.last().map_or(self.current_version, |s| s.to)
    }
}

/// Result of [`run_migrations`].
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The database does not exist; nothing was opened or created.
    NoDatastore,
    /// The engine ran to completion.
    Completed(MigrationReport),
}

/// The main migration engine.
pub struct MigrationEngine<S: VersionStore> {
    config: MigrationConfig,
    store: S,
}

impl<S: VersionStore> MigrationEngine<S> {
    /// Create a new migration engine.
    pub fn new(config: MigrationConfig, store: S) -> Self {
        Self { config, store }
    }

    /// The engine configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// The version store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the current version, falling back to the baseline.
    ///
    /// The flag reports whether a marker was actually stored.
    pub async fn current_version(&self) -> MigrateResult<(Version, bool)> {
        match self.store.get(&self.config.version_key).await? {
            Some(raw) => Ok((raw.parse()?, true)),
            None => {
                debug!(baseline = %self.config.baseline_version, "No version marker, assuming baseline");
                Ok((self.config.baseline_version, false))
            }
        }
    }

    /// Report the current version and pending steps without running anything.
    pub async fn status(&self, set: &MigrationSet) -> MigrateResult<MigrationStatus> {
        set.validate()?;
        let (current_version, marker_present) = self.current_version().await?;

        Ok(MigrationStatus {
            current_version,
            marker_present,
            pending: set.plan(current_version).into_iter().map(PendingStep::from).collect(),
        })
    }

    /// Walk the schema forward until no step applies.
    ///
    /// Each step runs in its own transaction. The marker is advanced to the
    /// step's target only after that transaction commits. The first failure
    /// stops the run and leaves the marker at its last committed value.
    pub async fn apply(&self, conn: &SqliteConnection, set: &MigrationSet) -> MigrateResult<MigrationReport> {
        set.validate()?;

        let start = Instant::now();
        let (initial_version, _) = self.current_version().await?;
        info!(version = %initial_version, "Current schema version");

        if self.config.dry_run {
            return Ok(self.dry_run_report(set, initial_version, start));
        }

        let mut applied = Vec::new();
        let mut expected: Option<Version> = None;

        loop {
            let (current, _) = self.current_version().await?;

            if let Some(expected) = expected.filter(|expected| current < *expected) {
                return Err(MigrationError::version_store(format!(
                    "marker reads {current} after writing {expected}"
                )));
            }

            let Some(step) = set.select(current) else {
                debug!(version = %current, "No further migration steps");
                break;
            };

            let skipped_forward = step.from() > current;
            if skipped_forward {
                warn!(
                    current = %current,
                    from = %step.from(),
                    "No step starts at the current version, skipping forward"
                );
            }

            info!(step = %step.id(), description = step.description(), "Applying migration step");
            let step_start = Instant::now();
            let outcome = self
                .run_step(conn, step)
                .await
                .map_err(|e| MigrationError::step_failed(step.id(), e))?;

            self.store
                .set(&self.config.version_key, &step.to().to_string())
                .await?;
            expected = Some(step.to());

            let duration_ms = step_start.elapsed().as_millis() as i64;
            match &outcome {
                StepOutcome::Applied => {
                    info!(step = %step.id(), to = %step.to(), duration_ms, "Migration step applied")
                }
                StepOutcome::AlreadyApplied(reason) => {
                    info!(step = %step.id(), to = %step.to(), reason = %reason, "Migration step already applied")
                }
                StepOutcome::Planned => {}
            }

            applied.push(AppliedStep {
                id: step.id(),
                from: step.from(),
                to: step.to(),
                outcome,
                skipped_forward,
                duration_ms,
                applied_at: Utc::now(),
            });
        }

        let (final_version, _) = self.current_version().await?;
        info!(version = %final_version, steps = applied.len(), "Migration check complete");

        Ok(MigrationReport {
            initial_version,
            final_version,
            applied,
            dry_run: false,
            duration_ms: start.elapsed().as_millis() as i64,
        })
    }

    fn dry_run_report(&self, set: &MigrationSet, initial_version: Version, start: Instant) -> MigrationReport {
        let mut version = initial_version;
        let applied = set
            .plan(initial_version)
            .into_iter()
            .map(|step| {
                let skipped_forward = step.from() > version;
                version = step.to();
                info!(step = %step.id(), "[DRY RUN] Would apply migration step");
                AppliedStep {
                    id: step.id(),
                    from: step.from(),
                    to: step.to(),
                    outcome: StepOutcome::Planned,
                    skipped_forward,
                    duration_ms: 0,
                    applied_at: Utc::now(),
                }
            })
            .collect();

        MigrationReport {
            initial_version,
            final_version: initial_version,
            applied,
            dry_run: true,
            duration_ms: start.elapsed().as_millis() as i64,
        }
    }

    async fn run_step(&self, conn: &SqliteConnection, step: &MigrationStep) -> MigrateResult<StepOutcome> {
        let run = step.entry_point();
        let transaction = conn.with_transaction(move |ctx| run(ctx));

        let Some(interval) = self.config.stall_warning else {
            return transaction.await;
        };

        tokio::pin!(transaction);
        let started = Instant::now();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

        loop {
            tokio::select! {
                result = &mut transaction => return result,
                _ = ticker.tick() => {
                    warn!(
                        step = %step.id(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Migration step is still running"
                    );
                }
            }
        }
    }
}

/// Migrate the database described by `sqlite` using the steps in `registry`.
///
/// A database that does not exist is left alone: nothing is opened or
/// created and [`RunOutcome::NoDatastore`] is returned.
pub async fn run_migrations(
    sqlite: &SqliteConfig,
    config: MigrationConfig,
    registry: &MigrationRegistry,
) -> MigrateResult<RunOutcome> {
    if !sqlite.path.exists() {
        info!(path = %sqlite.path, "Database not found, nothing to migrate");
        return Ok(RunOutcome::NoDatastore);
    }

    let set = registry.discover();
    set.validate()?;

    let conn = SqliteConnection::open(sqlite).await?;
    let store = ConfigTableStore::with_table(conn.clone(), config.config_table.clone());
    let engine = MigrationEngine::new(config, store);

    let result = engine.apply(&conn, &set).await;

    if let Err(err) = conn.close().await {
        warn!(error = %err, "Failed to close database connection");
    }

    result.map(RunOutcome::Completed)
}

/// Read the migration status of the database described by `sqlite`.
///
/// Returns `None` when the database does not exist.
pub async fn migration_status(
    sqlite: &SqliteConfig,
    config: MigrationConfig,
    registry: &MigrationRegistry,
) -> MigrateResult<Option<MigrationStatus>> {
    if !sqlite.path.exists() {
        return Ok(None);
    }

    let conn = SqliteConnection::open(sqlite).await?;
    let store = ConfigTableStore::with_table(conn.clone(), config.config_table.clone());
    let status = MigrationEngine::new(config, store).status(&registry.discover()).await;

    if let Err(err) = conn.close().await {
        warn!(error = %err, "Failed to close database connection");
    }

    status.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepDescriptor;
    use crate::version_store::MemoryVersionStore;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use strata_sqlite::StepContext;

    fn log_step(ctx: &StepContext<'_>, id: &str) -> MigrateResult<()> {
        ctx.execute("CREATE TABLE IF NOT EXISTS step_log (id TEXT NOT NULL)")?;
        ctx.execute_params("INSERT INTO step_log (id) VALUES (?1)", [id])?;
        Ok(())
    }

    fn create_widgets(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
        log_step(ctx, "widgets")?;
        if ctx.table_exists("widgets")? {
            return Ok(StepOutcome::already_applied("widgets exists"));
        }
        ctx.execute("CREATE TABLE widgets (id INTEGER PRIMARY KEY)")?;
        Ok(StepOutcome::Applied)
    }

    fn add_widget_name(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
        log_step(ctx, "widget_name")?;
        if ctx.column_exists("widgets", "name")? {
            return Ok(StepOutcome::already_applied("widgets.name exists"));
        }
        ctx.execute("ALTER TABLE widgets ADD COLUMN name TEXT")?;
        Ok(StepOutcome::Applied)
    }

    fn index_widget_name(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
        log_step(ctx, "widget_index")?;
        if ctx.index_exists("uix_widgets_name")? {
            return Ok(StepOutcome::already_applied("index exists"));
        }
        ctx.execute("CREATE UNIQUE INDEX uix_widgets_name ON widgets (name)")?;
        Ok(StepOutcome::Applied)
    }

    fn broken(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
        ctx.execute("CREATE TABLE half_done (id INTEGER)")?;
        ctx.execute("INSERT INTO no_such_table VALUES (1)")?;
        Ok(StepOutcome::Applied)
    }

    fn slow(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
        std::thread::sleep(Duration::from_millis(60));
        log_step(ctx, "slow")?;
        Ok(StepOutcome::Applied)
    }

    fn v(major: u32, minor: u32, patch: u32) -> Version {
        Version::new(major, minor, patch)
    }

    fn widget_set() -> MigrationSet {
        MigrationRegistry::new([
            StepDescriptor::new(v(1, 5, 5), v(1, 6, 0), "index widget names", index_widget_name),
            StepDescriptor::new(v(1, 0, 0), v(1, 1, 0), "create widgets", create_widgets),
            StepDescriptor::new(v(1, 4, 0), v(1, 5, 0), "add widget name", add_widget_name),
        ])
        .discover()
    }

    async fn memory_conn() -> SqliteConnection {
        SqliteConnection::open(&SqliteConfig::memory()).await.unwrap()
    }

    async fn log_count(conn: &SqliteConnection, id: &str) -> usize {
        conn.query_params(
            "SELECT id FROM step_log WHERE id = ?1",
            vec![strata_sqlite::Value::Text(id.to_string())],
        )
        .await
        .unwrap()
        .len()
    }

    #[test]
    fn test_config_builder() {
        let config = MigrationConfig::new()
            .version_key("SCHEMA")
            .baseline_version(v(0, 9, 0))
            .config_table("settings")
            .dry_run(true)
            .stall_warning(Duration::from_secs(30));

        assert_eq!(config.version_key, "SCHEMA");
        assert_eq!(config.baseline_version, v(0, 9, 0));
        assert_eq!(config.config_table, "settings");
        assert!(config.dry_run);
        assert_eq!(config.stall_warning, Some(Duration::from_secs(30)));

        let defaults = MigrationConfig::default();
        assert_eq!(defaults.version_key, "APP_VERSION");
        assert_eq!(defaults.baseline_version, Version::BASELINE);
        assert!(defaults.stall_warning.is_none());
    }

    #[tokio::test]
    async fn test_full_sequence_applies_each_step_once() {
        let conn = memory_conn().await;
        let engine = MigrationEngine::new(MigrationConfig::default(), MemoryVersionStore::new());

        let report = engine.apply(&conn, &widget_set()).await.unwrap();

        assert_eq!(report.initial_version, v(1, 0, 0));
        assert_eq!(report.final_version, v(1, 6, 0));
        let ids: Vec<&str> = report.applied.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["from_v1.0.0_to_v1.1.0", "from_v1.4.0_to_v1.5.0", "from_v1.5.5_to_v1.6.0"]
        );
        assert!(report.applied.iter().all(|s| s.outcome == StepOutcome::Applied));
        assert!(!report.applied[0].skipped_forward);
        assert!(report.applied[1].skipped_forward);
        assert!(report.applied[2].skipped_forward);

        for id in ["widgets", "widget_name", "widget_index"] {
            assert_eq!(log_count(&conn, id).await, 1, "{id} ran more than once");
        }
        assert_eq!(
            engine.store().get("APP_VERSION").await.unwrap().as_deref(),
            Some("v1.6.0")
        );
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let conn = memory_conn().await;
        let engine = MigrationEngine::new(MigrationConfig::default(), MemoryVersionStore::new());
        let set = widget_set();

        engine.apply(&conn, &set).await.unwrap();
        let report = engine.apply(&conn, &set).await.unwrap();

        assert!(report.applied.is_empty());
        assert!(!report.has_changes());
        assert_eq!(report.final_version, v(1, 6, 0));
        assert_eq!(log_count(&conn, "widgets").await, 1);
    }

    #[tokio::test]
    async fn test_rerun_after_lost_marker_is_idempotent() {
        let conn = memory_conn().await;
        let set = widget_set();

        MigrationEngine::new(MigrationConfig::default(), MemoryVersionStore::new())
            .apply(&conn, &set)
            .await
            .unwrap();
        let schema_before = conn
            .query("SELECT type, name, sql FROM sqlite_master WHERE name != 'step_log' ORDER BY name")
            .await
            .unwrap();

        // Marker lost: every step runs again against the migrated schema.
        let report = MigrationEngine::new(MigrationConfig::default(), MemoryVersionStore::new())
            .apply(&conn, &set)
            .await
            .unwrap();
        let schema_after = conn
            .query("SELECT type, name, sql FROM sqlite_master WHERE name != 'step_log' ORDER BY name")
            .await
            .unwrap();

        assert_eq!(report.applied.len(), 3);
        assert!(report.applied.iter().all(|s| !s.outcome.is_applied()));
        assert_eq!(schema_before, schema_after);
        assert_eq!(report.final_version, v(1, 6, 0));
    }

    #[tokio::test]
    async fn test_starts_from_stored_marker() {
        let conn = memory_conn().await;
        conn.execute("CREATE TABLE widgets (id INTEGER PRIMARY KEY)").await.unwrap();
        let store = MemoryVersionStore::with_value("APP_VERSION", "v1.4.0");
        let engine = MigrationEngine::new(MigrationConfig::default(), store);

        let report = engine.apply(&conn, &widget_set()).await.unwrap();

        assert_eq!(report.initial_version, v(1, 4, 0));
        assert_eq!(report.applied.len(), 2);
        assert!(!report.applied[0].skipped_forward);
        assert_eq!(log_count(&conn, "widgets").await, 0);
    }

    #[tokio::test]
    async fn test_marker_beyond_all_steps_applies_nothing() {
        let conn = memory_conn().await;
        let engine = MigrationEngine::new(
            MigrationConfig::default(),
            MemoryVersionStore::with_value("APP_VERSION", "v2.0.0"),
        );

        let report = engine.apply(&conn, &widget_set()).await.unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(report.final_version, v(2, 0, 0));
    }

    #[tokio::test]
    async fn test_failed_step_rolls_back_and_keeps_marker() {
        let conn = memory_conn().await;
        let set = MigrationRegistry::new([
            StepDescriptor::new(v(1, 0, 0), v(1, 1, 0), "create widgets", create_widgets),
            StepDescriptor::new(v(1, 1, 0), v(1, 2, 0), "broken", broken),
            StepDescriptor::new(v(1, 2, 0), v(1, 3, 0), "add widget name", add_widget_name),
        ])
        .discover();
        let engine = MigrationEngine::new(MigrationConfig::default(), MemoryVersionStore::new());

        let err = engine.apply(&conn, &set).await.unwrap_err();

        match err {
            MigrationError::StepFailed { step, .. } => assert_eq!(step, "from_v1.1.0_to_v1.2.0"),
            other => panic!("expected step failure, got {other:?}"),
        }
        assert!(!conn.table_exists("half_done").await.unwrap());
        assert!(conn.table_exists("widgets").await.unwrap());
        assert!(!conn.column_exists("widgets", "name").await.unwrap());
        assert_eq!(
            engine.store().get("APP_VERSION").await.unwrap().as_deref(),
            Some("v1.1.0")
        );
    }

    #[tokio::test]
    async fn test_duplicate_from_version_is_rejected_before_running() {
        let conn = memory_conn().await;
        let set = MigrationRegistry::new([
            StepDescriptor::new(v(1, 0, 0), v(1, 1, 0), "create widgets", create_widgets),
            StepDescriptor::new(v(1, 0, 0), v(1, 2, 0), "add widget name", add_widget_name),
        ])
        .discover();
        let engine = MigrationEngine::new(MigrationConfig::default(), MemoryVersionStore::new());

        let err = engine.apply(&conn, &set).await.unwrap_err();

        assert!(matches!(err, MigrationError::DuplicateFromVersion { .. }));
        assert!(!conn.table_exists("widgets").await.unwrap());
        assert_eq!(engine.store().get("APP_VERSION").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_marker_is_an_error() {
        let conn = memory_conn().await;
        let engine = MigrationEngine::new(
            MigrationConfig::default(),
            MemoryVersionStore::with_value("APP_VERSION", "latest"),
        );

        let err = engine.apply(&conn, &widget_set()).await.unwrap_err();
        assert!(matches!(err, MigrationError::InvalidVersion(_)));
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let conn = memory_conn().await;
        let engine = MigrationEngine::new(MigrationConfig::new().dry_run(true), MemoryVersionStore::new());

        let report = engine.apply(&conn, &widget_set()).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.applied.len(), 3);
        assert!(report.applied.iter().all(|s| s.outcome == StepOutcome::Planned));
        assert_eq!(report.final_version, v(1, 0, 0));
        assert!(report.summary().contains("would migrate v1.0.0 to v1.6.0"));
        assert!(!conn.table_exists("widgets").await.unwrap());
        assert_eq!(engine.store().get("APP_VERSION").await.unwrap(), None);
    }

    /// Buffer receiving formatted log records for the current thread.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    fn capture_warnings() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    async fn run_slow_step(stall_warning: Option<Duration>) -> (MigrationReport, String, SqliteConnection) {
        let conn = memory_conn().await;
        let set = MigrationRegistry::new([StepDescriptor::new(v(1, 0, 0), v(1, 1, 0), "slow", slow)]).discover();
        let mut config = MigrationConfig::new();
        if let Some(interval) = stall_warning {
            config = config.stall_warning(interval);
        }
        let engine = MigrationEngine::new(config, MemoryVersionStore::new());

        let (logs, _guard) = capture_warnings();
        let report = engine.apply(&conn, &set).await.unwrap();

        (report, logs.contents(), conn)
    }

    #[tokio::test]
    async fn test_stall_warning_does_not_cancel_step() {
        let (report, logs, conn) = run_slow_step(Some(Duration::from_millis(10))).await;

        assert_eq!(report.final_version, v(1, 1, 0));
        assert_eq!(log_count(&conn, "slow").await, 1);
        assert!(logs.contains("Migration step is still running"), "logs: {logs}");
        assert!(logs.contains("from_v1.0.0_to_v1.1.0"), "logs: {logs}");
    }

    #[tokio::test]
    async fn test_no_stall_warning_when_disabled() {
        let (report, logs, conn) = run_slow_step(None).await;

        assert_eq!(report.final_version, v(1, 1, 0));
        assert_eq!(log_count(&conn, "slow").await, 1);
        assert!(!logs.contains("Migration step is still running"), "logs: {logs}");
    }

    #[tokio::test]
    async fn test_status_lists_pending_steps() {
        let engine = MigrationEngine::new(
            MigrationConfig::default(),
            MemoryVersionStore::with_value("APP_VERSION", "v1.1.0"),
        );

        let status = engine.status(&widget_set()).await.unwrap();

        assert_eq!(status.current_version, v(1, 1, 0));
        assert!(status.marker_present);
        assert_eq!(status.pending.len(), 2);
        assert_eq!(status.pending[0].id, "from_v1.4.0_to_v1.5.0");
        assert_eq!(status.target_version(), v(1, 6, 0));
        assert!(!status.is_up_to_date());
    }

    #[tokio::test]
    async fn test_status_without_marker_uses_baseline() {
        let engine = MigrationEngine::new(
            MigrationConfig::new().baseline_version(v(1, 5, 0)),
            MemoryVersionStore::new(),
        );

        let status = engine.status(&widget_set()).await.unwrap();
        assert_eq!(status.current_version, v(1, 5, 0));
        assert!(!status.marker_present);
        assert_eq!(status.pending.len(), 1);
    }

    #[tokio::test]
    async fn test_run_migrations_skips_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("db.sqlite3");

        let outcome = run_migrations(
            &SqliteConfig::file(&path),
            MigrationConfig::default(),
            &MigrationRegistry::bundled(),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, RunOutcome::NoDatastore));
        assert!(!path.exists());
        assert!(
            migration_status(&SqliteConfig::file(&path), MigrationConfig::default(), &MigrationRegistry::bundled())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_run_migrations_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite3");
        let seed = SqliteConnection::open(&SqliteConfig::file(&path)).await.unwrap();
        seed.execute("CREATE TABLE users (id INTEGER PRIMARY KEY)").await.unwrap();
        seed.close().await.unwrap();

        let config = SqliteConfig::file(&path);
        let outcome = run_migrations(&config, MigrationConfig::default(), &MigrationRegistry::bundled())
            .await
            .unwrap();

        let RunOutcome::Completed(report) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(report.final_version, v(1, 6, 0));

        let status = migration_status(&config, MigrationConfig::default(), &MigrationRegistry::bundled())
            .await
            .unwrap()
            .unwrap();
        assert!(status.is_up_to_date());
        assert_eq!(status.current_version, v(1, 6, 0));
    }
}
