//! Backup, reset and optional reload of the catalog database

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::config::Config;
use crate::database::{Database, SchemaStatement, schema_statements};
use crate::error::{CatalogError, Result};

/// What happens after the schema reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildMode {
    /// Leave the fresh schema empty
    Empty,
    /// Replay the given backup file into the fresh schema
    Reload(PathBuf),
}

/// Outcome of one run
#[derive(Debug, Default)]
pub struct RebuildReport {
    /// Backups that were written completely
    pub backups: Vec<PathBuf>,
    /// Schema statements executed (zero on a dry run)
    pub statements_applied: usize,
    /// Backup lines replayed, if a reload happened
    pub reloaded: Option<usize>,
}

/// Minute-granularity stamp used in the timestamped backup name
pub fn backup_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d%H%M").to_string()
}

/// Create the backup folder (and parents) if missing
pub fn ensure_backup_folder(folder: &Path) -> Result<()> {
    if !folder.exists() {
        fs::create_dir_all(folder).map_err(|e| CatalogError::io(folder, e))?;
        info!("Created backup folder {:?}", folder);
    }
    Ok(())
}

/// First 80 characters of the trimmed statement
fn summarize(statement: &SchemaStatement) -> String {
    statement.to_string().trim().chars().take(80).collect()
}

/// Run the whole sequence against the configured database.
///
/// The connection is closed on every path once it has been opened.
pub fn run(config: &Config, mode: &RebuildMode, dry_run: bool) -> Result<RebuildReport> {
    ensure_backup_folder(&config.backup.folder)?;

    let mut db = Database::open(&config.database_path())?;
    let result = run_with(&mut db, config, mode, dry_run, Local::now());
    db.close();
    result
}

fn run_with(
    db: &mut Database,
    config: &Config,
    mode: &RebuildMode,
    dry_run: bool,
    now: DateTime<Local>,
) -> Result<RebuildReport> {
    let mut report = RebuildReport::default();

    let stamp = backup_timestamp(now);
    for path in [config.backup_file(), config.timestamped_backup_file(&stamp)] {
        // Export failures are reported but never stop the reset
        match db.export_to(&path) {
            Ok(summary) => {
                info!(
                    "Data exported to {:?} ({} rows)",
                    path,
                    summary.total_rows()
                );
                report.backups.push(path);
            }
            Err(e) => error!("Error exporting data to {:?}: {}", path, e),
        }
    }

    let statements = schema_statements(&config.database.name);

    if dry_run {
        for statement in &statements {
            println!("Would execute: {}...", summarize(statement));
        }
        if let RebuildMode::Reload(path) = mode {
            println!("Would reload from {}", path.display());
        }
        info!("Dry run complete, database {:?} left untouched", db.path());
        return Ok(report);
    }

    for statement in &statements {
        db.apply(statement)?;
        println!("Executed: {}...", summarize(statement));
        println!("Executed: {}", statement);
        report.statements_applied += 1;
    }

    if let RebuildMode::Reload(path) = mode {
        let executed = db.reload_from(path)?;
        info!("Data reloaded from {:?}", path);
        report.reloaded = Some(executed);
    }

    println!("Database {} created successfully!", config.database.name);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{EXPORT_ORDER, catalog_db, count};
    use chrono::TimeZone;

    fn test_config(dir: &tempfile::TempDir) -> Config {
        let mut config = Config::default();
        config.config_path = dir.path().join("config.toml");
        config.database.path = Some(dir.path().join("catalog.db"));
        config.backup.folder = dir.path().join("backups").join("nested");
        config
    }

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 17, 9, 5, 42).unwrap()
    }

    #[test]
    fn test_timestamp_is_minute_granularity() {
        assert_eq!(backup_timestamp(fixed_now()), "202610170905");
    }

    #[test]
    fn test_backup_folder_created() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("a").join("b");
        ensure_backup_folder(&folder).unwrap();
        assert!(folder.is_dir());
        // Second call is a no-op
        ensure_backup_folder(&folder).unwrap();
    }

    #[test]
    fn test_empty_mode_backs_up_office_then_resets() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        {
            // catalog_db writes to <tmp>/catalog.db, same as the config
            let db = catalog_db(&dir);
            db.connection()
                .execute("INSERT INTO Locations (LocationName) VALUES ('Office')", [])
                .unwrap();
            db.close();
        }

        let report = run(&config, &RebuildMode::Empty, false).unwrap();
        assert_eq!(report.backups.len(), 2);
        assert_eq!(report.statements_applied, 6);
        assert!(report.reloaded.is_none());

        let content = fs::read_to_string(config.backup_file()).unwrap();
        let inserts: Vec<&str> = content.lines().filter(|l| l.starts_with("INSERT")).collect();
        assert_eq!(
            inserts,
            vec!["INSERT INTO Locations (LocationID, LocationName) VALUES ('1', 'Office');"]
        );
        for table in ["Authors", "Books", "Books_Authors"] {
            assert!(content.contains(&format!("-- No data in table {}\n", table)));
        }
        assert!(!content.contains("-- No data in table Locations"));

        let db = Database::open(&config.database_path()).unwrap();
        for table in EXPORT_ORDER {
            assert_eq!(count(&db, table), 0);
        }
    }

    #[test]
    fn test_reload_mode_restores_backup() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let saved = dir.path().join("saved.txt");
        {
            let db = catalog_db(&dir);
            db.connection()
                .execute_batch(
                    "INSERT INTO Locations (LocationName) VALUES ('Study');
                     INSERT INTO Authors (FirstName, LastName) VALUES ('Iain', 'Banks');
                     INSERT INTO Books (Title, Publisher, LocationID) VALUES ('Excession', 'Orbit', 1);
                     INSERT INTO Books_Authors (BookID, AuthorID) VALUES (1, 1);",
                )
                .unwrap();
            db.export_to(&saved).unwrap();
            db.close();
        }

        let report = run(&config, &RebuildMode::Reload(saved), false).unwrap();
        assert!(report.reloaded.is_some());

        let db = Database::open(&config.database_path()).unwrap();
        for table in EXPORT_ORDER {
            assert_eq!(count(&db, table), 1);
        }
    }

    #[test]
    fn test_first_run_without_tables_still_resets() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);

        // Export fails on the missing tables; the reset goes ahead anyway
        let report = run(&config, &RebuildMode::Empty, false).unwrap();
        assert!(report.backups.is_empty());
        assert!(config.backup_file().exists());
        assert_eq!(report.statements_applied, 6);

        let db = Database::open(&config.database_path()).unwrap();
        assert_eq!(count(&db, "Books"), 0);
    }

    #[test]
    fn test_dry_run_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        {
            let db = catalog_db(&dir);
            db.connection()
                .execute("INSERT INTO Locations (LocationName) VALUES ('Box 1')", [])
                .unwrap();
            db.close();
        }

        ensure_backup_folder(&config.backup.folder).unwrap();
        let mut db = Database::open(&config.database_path()).unwrap();
        let report = run_with(
            &mut db,
            &config,
            &RebuildMode::Reload(dir.path().join("never-read.txt")),
            true,
            fixed_now(),
        )
        .unwrap();

        assert_eq!(report.statements_applied, 0);
        assert_eq!(report.backups.len(), 2);
        assert!(config.timestamped_backup_file("202610170905").exists());
        assert_eq!(count(&db, "Locations"), 1);
    }

    #[test]
    fn test_missing_reload_file_propagates_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);

        let err = run(
            &config,
            &RebuildMode::Reload(dir.path().join("absent.txt")),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn test_unusable_database_path_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config.database.path = Some(dir.path().to_path_buf());

        let err = run(&config, &RebuildMode::Empty, false).unwrap_err();
        assert!(err.is_database());
        // Folder is created before the connection attempt
        assert!(config.backup.folder.is_dir());
    }
}
