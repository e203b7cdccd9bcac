//! Database handle and catalog schema

use rusqlite::Connection;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};

/// Tables in foreign-key dependency order.
/// Export walks this order so a reload never hits a missing parent row.
pub const EXPORT_ORDER: [&str; 4] = ["Locations", "Authors", "Books", "Books_Authors"];

/// One step of the destructive reset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatement {
    /// Remove every user table and view from the named database
    DropDatabase { name: String },
    /// Re-establish encoding and foreign-key enforcement
    CreateDatabase { name: String },
    /// Plain DDL executed as-is
    Ddl(&'static str),
}

impl fmt::Display for SchemaStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaStatement::DropDatabase { name } => {
                write!(f, "DROP DATABASE IF EXISTS {};", name)
            }
            SchemaStatement::CreateDatabase { name } => write!(
                f,
                "CREATE DATABASE {} ENCODING '{}' COLLATE {};",
                name, ENCODING, COLLATION
            ),
            SchemaStatement::Ddl(sql) => f.write_str(sql),
        }
    }
}

const ENCODING: &str = "UTF-8";
const COLLATION: &str = "NOCASE";

/// Ordered reset script for the catalog database
pub fn schema_statements(database_name: &str) -> Vec<SchemaStatement> {
    let mut statements = vec![
        SchemaStatement::DropDatabase {
            name: database_name.to_string(),
        },
        SchemaStatement::CreateDatabase {
            name: database_name.to_string(),
        },
    ];
    statements.extend(TABLE_DDL.iter().copied().map(SchemaStatement::Ddl));
    statements
}

/// Single connection to the catalog database
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl Database {
    /// Open (creating if needed) the database file and check it is usable
    pub fn open(path: &Path) -> Result<Self> {
        let connection_error = |source: Box<dyn std::error::Error + Send + Sync>| {
            CatalogError::Connection {
                path: path.to_path_buf(),
                source,
            }
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| connection_error(e.into()))?;
        }

        let conn = Connection::open(path).map_err(|e| connection_error(e.into()))?;

        // Touch the file so a bad path fails here rather than mid-run
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .and_then(|_| {
                conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                    row.get::<_, i64>(0)
                })
            })
            .map_err(|e| connection_error(e.into()))?;

        info!("Connected to database {:?}", path);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Execute one reset step
    pub fn apply(&self, statement: &SchemaStatement) -> Result<()> {
        match statement {
            SchemaStatement::DropDatabase { .. } => self.drop_all_objects(),
            SchemaStatement::CreateDatabase { .. } => {
                // Encoding only sticks on a file with no pages yet
                self.conn.execute_batch(&format!(
                    "PRAGMA encoding = '{}'; PRAGMA foreign_keys = ON;",
                    ENCODING
                ))?;
                Ok(())
            }
            SchemaStatement::Ddl(sql) => {
                self.conn.execute_batch(sql)?;
                Ok(())
            }
        }
    }

    fn drop_all_objects(&self) -> Result<()> {
        let objects: Vec<(String, String)> = {
            let mut stmt = self.conn.prepare(
                "SELECT type, name FROM sqlite_master
                 WHERE type IN ('table', 'view') AND substr(name, 1, 7) <> 'sqlite_'",
            )?;
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<_>>()?
        };

        self.conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        let dropped = objects.iter().try_for_each(|(kind, name)| {
            let sql = format!(
                "DROP {} IF EXISTS \"{}\";",
                kind.to_uppercase(),
                name.replace('"', "\"\"")
            );
            debug!("{}", sql);
            self.conn.execute_batch(&sql)
        });
        // Enforcement comes back on even when a drop failed
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        dropped?;
        self.conn.execute_batch("VACUUM;")?;

        info!("Dropped {} objects from {:?}", objects.len(), self.path);
        Ok(())
    }

    /// Close the connection, logging rather than failing
    pub fn close(self) {
        match self.conn.close() {
            Ok(()) => debug!("Closed database {:?}", self.path),
            Err((_, e)) => warn!("Failed to close database {:?}: {}", self.path, e),
        }
    }
}

/// Catalog tables; column notes kept as SQL comments so they land in sqlite_master
const TABLE_DDL: [&str; 4] = [
    r#"
    CREATE TABLE Locations (
        LocationID INTEGER PRIMARY KEY AUTOINCREMENT, -- Location Identifier
        LocationName VARCHAR(50) NOT NULL COLLATE NOCASE
            CHECK (length(LocationName) <= 50), -- Location Name (e.g., Office, Study, Box X)
        UNIQUE (LocationName)
    );
    "#,
    r#"
    CREATE TABLE Authors (
        AuthorID INTEGER PRIMARY KEY AUTOINCREMENT, -- Author Identifier
        Prefix VARCHAR(10) NULL COLLATE NOCASE
            CHECK (length(Prefix) <= 10), -- Author Prefix (e.g., Dr.)
        FirstName VARCHAR(50) NOT NULL COLLATE NOCASE
            CHECK (length(FirstName) <= 50), -- Author First Name
        MiddleInitial VARCHAR(5) NULL COLLATE NOCASE
            CHECK (length(MiddleInitial) <= 5), -- Author Middle Initial
        LastName VARCHAR(50) NOT NULL COLLATE NOCASE
            CHECK (length(LastName) <= 50), -- Author Last Name
        Suffix VARCHAR(10) NULL COLLATE NOCASE
            CHECK (length(Suffix) <= 10) -- Author Suffix (e.g., Jr.)
    );
    "#,
    r#"
    CREATE TABLE Books (
        BookID INTEGER PRIMARY KEY AUTOINCREMENT, -- Book Identifier
        ISBN VARCHAR(17) NULL COLLATE NOCASE
            CHECK (length(ISBN) <= 17), -- ISBN 10 or ISBN 13 without dashes
        Title VARCHAR(255) NOT NULL COLLATE NOCASE
            CHECK (length(Title) <= 255), -- Book Title
        Publisher VARCHAR(100) NOT NULL COLLATE NOCASE
            CHECK (length(Publisher) <= 100), -- Book Publisher
        Edition VARCHAR(25) NULL COLLATE NOCASE
            CHECK (length(Edition) <= 25), -- Edition
        PublicationDate DATE NULL, -- Date of Publication
        LocationID INTEGER NOT NULL, -- Location Identifier
        IsRead BOOLEAN NOT NULL DEFAULT FALSE, -- Read Status
        ReadDate DATE NULL, -- Date the Book was Read
        DateEntered TIMESTAMP DEFAULT CURRENT_TIMESTAMP, -- Date Entered into Database
        CONSTRAINT FK_Location FOREIGN KEY (LocationID)
            REFERENCES Locations(LocationID)
            ON DELETE RESTRICT
            ON UPDATE RESTRICT
    );
    "#,
    r#"
    CREATE TABLE Books_Authors (
        BookID INTEGER NOT NULL, -- Book Identifier
        AuthorID INTEGER NOT NULL, -- Author Identifier
        PRIMARY KEY (BookID, AuthorID),
        CONSTRAINT FK_BookID FOREIGN KEY (BookID) REFERENCES Books(BookID) ON DELETE CASCADE ON UPDATE CASCADE,
        CONSTRAINT FK_AuthorID FOREIGN KEY (AuthorID) REFERENCES Authors(AuthorID) ON DELETE CASCADE ON UPDATE CASCADE
    );
    "#,
];
