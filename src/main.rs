//! book-catalog CLI
//!
//! Every run exports the current rows to a fixed-name and a timestamped backup,
//! then drops and recreates the catalog schema, optionally replaying a backup.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use book_catalog::config::Config;
use book_catalog::error::Result as CatalogResult;
use book_catalog::rebuild::{self, RebuildMode, RebuildReport};

/// Manage the book catalog database
#[derive(Parser, Debug)]
#[command(name = "book-catalog")]
#[command(version = "0.1.0")]
#[command(about = "Manage BookDatabase", long_about = None)]
struct Cli {
    #[command(flatten)]
    mode: ModeArgs,

    /// Take the backups and print the reset plan without changing the database
    #[arg(long)]
    dry_run: bool,

    /// Config file (defaults to the platform config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct ModeArgs {
    /// Export data before recreating the database
    #[arg(long)]
    empty: bool,

    /// Reload the database from the specified file
    #[arg(long, value_name = "PATH")]
    reload: Option<PathBuf>,
}

impl ModeArgs {
    fn into_mode(self) -> RebuildMode {
        match self.reload {
            Some(path) => RebuildMode::Reload(path),
            None => RebuildMode::Empty,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::load(cli.config.as_deref())?;
    info!(
        "Configuration loaded: database={} path={:?} backups={:?}",
        config.database.name,
        config.database_path(),
        config.backup.folder
    );

    let mode = cli.mode.into_mode();
    let status = exit_status(rebuild::run(&config, &mode, cli.dry_run))?;
    Ok(ExitCode::from(status))
}

/// Database failures become status 1; anything else propagates out of `main`
fn exit_status(outcome: CatalogResult<RebuildReport>) -> Result<u8> {
    match outcome {
        Ok(report) => {
            info!(
                "Run finished: {} backups written, {} schema statements applied, {} lines reloaded",
                report.backups.len(),
                report.statements_applied,
                report.reloaded.unwrap_or(0)
            );
            Ok(0)
        }
        Err(e) if e.is_database() => {
            error!("Error connecting to database: {}", e);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}
