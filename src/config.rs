//! Configuration management for the book catalog
//!
//! Loads database and backup settings from a TOML file, then applies
//! environment overrides on top.

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Env var naming an explicit config file
pub const CONFIG_ENV: &str = "BOOK_CATALOG_CONFIG";
pub const DB_NAME_ENV: &str = "BOOK_CATALOG_DB_NAME";
pub const DB_PATH_ENV: &str = "BOOK_CATALOG_DB_PATH";
pub const BACKUP_DIR_ENV: &str = "BOOK_CATALOG_BACKUP_DIR";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    /// Path the config was loaded from (not serialized)
    #[serde(skip)]
    pub config_path: PathBuf,
}

/// Database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Logical database name, echoed in the drop/create statements
    #[serde(default = "default_database_name")]
    pub name: String,

    /// Database file; defaults to `<data dir>/<name>.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Backup file placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_backup_folder")]
    pub folder: PathBuf,

    /// File name stem; the fixed copy is `<stem>.txt`
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

fn default_database_name() -> String {
    "BookDatabase".to_string()
}

fn default_backup_folder() -> PathBuf {
    PathBuf::from("./data_backups")
}

fn default_file_stem() -> String {
    "bookdatabase_load".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            name: default_database_name(),
            path: None,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            folder: default_backup_folder(),
            file_stem: default_file_stem(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            backup: BackupConfig::default(),
            config_path: default_config_path(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "bookcatalog", "book-catalog")
}

fn default_config_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("book-catalog.toml"),
    }
}

fn default_data_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => PathBuf::from("."),
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path (argument, then `BOOK_CATALOG_CONFIG`) must exist.
    /// Without one, the platform default is used and created on first run.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {:?}", path);
                }
                Self::load_from(&path)?
            }
            None => {
                let path = default_config_path();
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    info!("Config file not found, creating default at {:?}", path);
                    let config = Config {
                        config_path: path,
                        ..Config::default()
                    };
                    config.save()?;
                    config
                }
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without touching the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(&self.config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", self.config_path))?;

        info!("Configuration saved to {:?}", self.config_path);
        Ok(())
    }

    /// Layer environment values over the file settings
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup(DB_NAME_ENV) {
            self.database.name = name;
        }
        if let Some(path) = lookup(DB_PATH_ENV) {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(folder) = lookup(BACKUP_DIR_ENV) {
            self.backup.folder = PathBuf::from(folder);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.name.trim().is_empty() {
            bail!("database.name must not be empty");
        }
        if self.backup.file_stem.trim().is_empty() {
            bail!("backup.file_stem must not be empty");
        }
        Ok(())
    }

    /// Resolved database file
    pub fn database_path(&self) -> PathBuf {
        match &self.database.path {
            Some(path) => path.clone(),
            None => default_data_dir().join(format!("{}.db", self.database.name)),
        }
    }

    /// Fixed-name backup, overwritten on every run
    pub fn backup_file(&self) -> PathBuf {
        self.backup
            .folder
            .join(format!("{}.txt", self.backup.file_stem))
    }

    /// Timestamped backup for the given `YYYYMMDDHHMM` stamp
    pub fn timestamped_backup_file(&self, stamp: &str) -> PathBuf {
        self.backup
            .folder
            .join(format!("{}_{}.txt", self.backup.file_stem, stamp))
    }
}
