//! End-to-end upgrade tests against file databases.
//!
//! These tests build databases in the shape of older releases and check
//! that a single run brings them to the newest schema.

use std::path::Path;

use pretty_assertions::assert_eq;
use strata::migrate::{MigrationStatus, StepDescriptor};
use strata::prelude::*;
use tempfile::TempDir;

fn v(major: u32, minor: u32, patch: u32) -> Version {
    Version::new(major, minor, patch)
}

/// Create a database as a v1.0.0 install left it.
fn v1_0_0_database(path: &Path) {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE storage_adapters (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE mounts (
             id INTEGER PRIMARY KEY,
             path VARCHAR(255) NOT NULL,
             sub_path VARCHAR(1024),
             adapter_id INTEGER NOT NULL
         );
         CREATE TABLE plugins (id INTEGER PRIMARY KEY, name TEXT);
         INSERT INTO storage_adapters (id, name) VALUES (1, 'local'), (2, 's3'), (3, 'spare');
         INSERT INTO mounts (id, path, sub_path, adapter_id) VALUES
             (1, '/media', '/photos', 1),
             (2, '/backup', NULL, 2);
         INSERT INTO plugins (name) VALUES ('viewer'), ('editor');",
    )
    .unwrap();
}

fn columns(path: &Path, table: &str) -> Vec<String> {
    let conn = rusqlite::Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .unwrap();
    let names = stmt
        .query_map([table], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();
    names
}

fn schema(path: &Path) -> Vec<(String, Option<String>)> {
    let conn = rusqlite::Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT name, sql FROM sqlite_master WHERE name <> 'configurations' ORDER BY name")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    rows
}

fn stored_version(path: &Path) -> Option<String> {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.query_row(
        "SELECT value FROM configurations WHERE key = 'APP_VERSION'",
        [],
        |row| row.get(0),
    )
    .ok()
}

async fn status(config: &SqliteConfig) -> MigrationStatus {
    migration_status(config, MigrationConfig::new(), &MigrationRegistry::bundled())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_upgrade_from_first_release() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");
    v1_0_0_database(&path);
    let config = SqliteConfig::file(&path);

    let outcome = run_migrations(&config, MigrationConfig::new(), &MigrationRegistry::bundled())
        .await
        .unwrap();
    let RunOutcome::Completed(report) = outcome else {
        panic!("expected a completed run");
    };

    assert_eq!(report.initial_version, v(1, 0, 0));
    assert_eq!(report.final_version, v(1, 6, 0));
    let ids: Vec<&str> = report.applied.iter().map(|step| step.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["from_v1.0.0_to_v1.1.0", "from_v1.4.0_to_v1.5.0", "from_v1.5.5_to_v1.6.0"]
    );
    let skipped: Vec<bool> = report.applied.iter().map(|step| step.skipped_forward).collect();
    assert_eq!(skipped, vec![false, true, true]);
    assert_eq!(stored_version(&path).as_deref(), Some("v1.6.0"));

    assert_eq!(
        columns(&path, "storage_adapters"),
        vec!["id", "name", "path", "sub_path"]
    );
    assert!(columns(&path, "mounts").is_empty());
    assert!(columns(&path, "plugins").contains(&"manifest".to_string()));
    assert!(columns(&path, "plugins").contains(&"open_app".to_string()));

    let conn = rusqlite::Connection::open(&path).unwrap();
    let moved: Vec<(i64, Option<String>, Option<String>)> = conn
        .prepare("SELECT id, path, sub_path FROM storage_adapters ORDER BY id")
        .unwrap()
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        moved,
        vec![
            (1, Some("/media".to_string()), Some("/photos".to_string())),
            (2, Some("/backup".to_string()), None),
            (3, None, None),
        ]
    );

    assert!(status(&config).await.is_up_to_date());
}

#[tokio::test]
async fn test_upgrade_from_intermediate_release() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE storage_adapters (id INTEGER PRIMARY KEY, name TEXT NOT NULL, path TEXT, sub_path TEXT);
             CREATE TABLE plugins (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE configurations (key VARCHAR(255) NOT NULL PRIMARY KEY, value TEXT);
             INSERT INTO configurations (key, value) VALUES ('APP_VERSION', 'v1.4.2');",
        )
        .unwrap();
    }
    let config = SqliteConfig::file(&path);

    let before = status(&config).await;
    assert!(before.marker_present);
    assert_eq!(before.current_version, v(1, 4, 2));
    let pending: Vec<&str> = before.pending.iter().map(|step| step.id.as_str()).collect();
    assert_eq!(pending, vec!["from_v1.5.5_to_v1.6.0"]);

    let RunOutcome::Completed(report) =
        run_migrations(&config, MigrationConfig::new(), &MigrationRegistry::bundled())
            .await
            .unwrap()
    else {
        panic!("expected a completed run");
    };

    assert_eq!(report.applied.len(), 1);
    assert_eq!(report.final_version, v(1, 6, 0));
    assert_eq!(columns(&path, "storage_adapters"), vec!["id", "name", "path", "sub_path"]);
    assert!(columns(&path, "plugins").contains(&"manifest".to_string()));
}

#[tokio::test]
async fn test_rerun_after_lost_marker_leaves_schema_unchanged() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");
    v1_0_0_database(&path);
    let config = SqliteConfig::file(&path);

    run_migrations(&config, MigrationConfig::new(), &MigrationRegistry::bundled())
        .await
        .unwrap();
    let migrated = schema(&path);

    // Simulate a crash between the last commit and the marker write
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute("DELETE FROM configurations", []).unwrap();
    }

    let RunOutcome::Completed(report) =
        run_migrations(&config, MigrationConfig::new(), &MigrationRegistry::bundled())
            .await
            .unwrap()
    else {
        panic!("expected a completed run");
    };

    assert_eq!(report.final_version, v(1, 6, 0));
    assert!(report.applied.iter().all(|step| !step.outcome.is_applied()));
    assert_eq!(schema(&path), migrated);
}

fn add_theme(ctx: &StepContext<'_>) -> MigrateResult<StepOutcome> {
    if ctx.column_exists("storage_adapters", "theme")? {
        return Ok(StepOutcome::already_applied("storage_adapters.theme exists"));
    }
    ctx.execute("ALTER TABLE storage_adapters ADD COLUMN theme TEXT")?;
    Ok(StepOutcome::Applied)
}

#[tokio::test]
async fn test_application_registered_step_runs_after_bundled_steps() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");
    v1_0_0_database(&path);
    let config = SqliteConfig::file(&path);

    let registry = MigrationRegistry::bundled().register(StepDescriptor::new(
        v(1, 7, 0),
        v(1, 8, 0),
        "Add storage_adapters.theme",
        add_theme,
    ));

    let RunOutcome::Completed(report) =
        run_migrations(&config, MigrationConfig::new(), &registry).await.unwrap()
    else {
        panic!("expected a completed run");
    };

    assert_eq!(report.final_version, v(1, 8, 0));
    assert_eq!(report.applied.len(), 4);
    assert_eq!(stored_version(&path).as_deref(), Some("v1.8.0"));
    assert!(columns(&path, "storage_adapters").contains(&"theme".to_string()));
}

#[tokio::test]
async fn test_missing_database_is_left_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("db.sqlite3");
    let config = SqliteConfig::file(&path);

    let outcome = run_migrations(&config, MigrationConfig::new(), &MigrationRegistry::bundled())
        .await
        .unwrap();

    assert!(matches!(outcome, RunOutcome::NoDatastore));
    assert!(!dir.path().join("nested").exists());
}
