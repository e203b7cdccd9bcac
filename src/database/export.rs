//! Backup export: every catalog table as replayable single-line INSERTs

use rusqlite::types::ValueRef;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

use super::{Database, EXPORT_ORDER};
use crate::error::{CatalogError, Result};

/// Rows written per table, in export order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub tables: Vec<(String, usize)>,
}

impl ExportSummary {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }
}

impl Database {
    /// Dump all catalog tables to `path`, overwriting it.
    ///
    /// The file is created before the first query, so a failure part-way
    /// leaves whatever was written so far.
    pub fn export_to(&self, path: &Path) -> Result<ExportSummary> {
        let io_err = |e| CatalogError::io(path, e);
        let file = File::create(path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        let mut summary = ExportSummary::default();

        for table in EXPORT_ORDER {
            writeln!(out, "-- Data for table {}", table).map_err(io_err)?;
            let rows = self.export_table(table, &mut out).map_err(|e| match e {
                ExportError::Sql(e) => CatalogError::Database(e),
                ExportError::Io(e) => io_err(e),
            })?;
            if rows == 0 {
                writeln!(out, "-- No data in table {}", table).map_err(io_err)?;
            }
            debug!("Exported {} rows from {}", rows, table);
            summary.tables.push((table.to_string(), rows));
        }

        out.flush().map_err(io_err)?;
        Ok(summary)
    }

    fn export_table(&self, table: &str, out: &mut impl Write) -> std::result::Result<usize, ExportError> {
        let mut stmt = self.connection().prepare(&format!("SELECT * FROM {}", table))?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let column_count = stmt.column_count();

        let mut rows = stmt.query([])?;
        let mut written = 0;
        while let Some(row) = rows.next()? {
            let values = (0..column_count)
                .map(|i| row.get_ref(i).map(sql_literal))
                .collect::<rusqlite::Result<Vec<_>>>()?
                .join(", ");
            writeln!(out, "INSERT INTO {} ({}) VALUES ({});", table, columns, values)?;
            written += 1;
        }
        Ok(written)
    }
}

enum ExportError {
    Sql(rusqlite::Error),
    Io(std::io::Error),
}

impl From<rusqlite::Error> for ExportError {
    fn from(e: rusqlite::Error) -> Self {
        ExportError::Sql(e)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

/// Render a value as a quoted literal, or `NULL`.
///
/// Numbers are quoted too; the column affinity turns them back on reload.
/// Line breaks are spliced in with `char()` so the statement stays on one line.
pub fn sql_literal(value: ValueRef<'_>) -> String {
    let text = match value {
        ValueRef::Null => return "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    };

    let escaped = text
        .replace('\'', "''")
        .replace('\r', "' || char(13) || '")
        .replace('\n', "' || char(10) || '");
    format!("'{}'", escaped)
}
