//! Error types for the catalog tool

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the database and rebuild layers
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// The database file could not be opened or is not a usable database
    #[error("failed to open database {path:?}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.into(),
            source,
        }
    }

    /// Connection and statement failures end the run with status 1;
    /// everything else is propagated as-is.
    pub fn is_database(&self) -> bool {
        matches!(
            self,
            CatalogError::Connection { .. } | CatalogError::Database(_)
        )
    }
}
