//! Backup reload: replay a backup file one line per statement

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use super::Database;
use crate::error::{CatalogError, Result};

impl Database {
    /// Execute every non-blank line of `path`, committing once at the end.
    ///
    /// Returns the number of lines executed. Comment lines run as no-ops.
    /// Any failing line rolls back the whole file.
    pub fn reload_from(&mut self, path: &Path) -> Result<usize> {
        let file = File::open(path).map_err(|e| CatalogError::io(path, e))?;
        let reader = BufReader::new(file);

        let tx = self.connection_mut().transaction()?;
        let mut executed = 0;
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| CatalogError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            debug!("{}:{}: {}", path.display(), index + 1, line);
            tx.execute_batch(&line)?;
            executed += 1;
        }
        tx.commit()?;

        info!("Executed {} statements from {:?}", executed, path);
        Ok(executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{EXPORT_ORDER, catalog_db, count, schema_statements};
    use std::fs;

    #[test]
    fn test_comments_and_blanks_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = catalog_db(&dir);
        let path = dir.path().join("empty.txt");
        fs::write(
            &path,
            "\n-- Data for table Locations\n   \n-- No data in table Locations\n\n",
        )
        .unwrap();

        let executed = db.reload_from(&path).unwrap();
        assert_eq!(executed, 2);
        for table in EXPORT_ORDER {
            assert_eq!(count(&db, table), 0);
        }
    }

    #[test]
    fn test_round_trip_preserves_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = catalog_db(&dir);
        db.connection()
            .execute_batch(
                "INSERT INTO Locations (LocationName) VALUES ('Office'), ('Box 3');
                 INSERT INTO Authors (FirstName, MiddleInitial, LastName, Suffix)
                     VALUES ('Martin', 'L', 'King', 'Jr.'), ('Flannery', NULL, 'O''Connor', NULL);
                 INSERT INTO Books (Title, Publisher, Edition, PublicationDate, LocationID, IsRead, ReadDate)
                     VALUES ('Why We Can''t Wait', 'Harper', '1st', '1964-01-01', 1, TRUE, '2025-06-01'),
                            ('Wise Blood', 'Farrar', NULL, NULL, 2, FALSE, NULL),
                            ('Notes' || char(10) || 'and Letters', 'Library of America', NULL, NULL, 2, FALSE, NULL);
                 INSERT INTO Books_Authors (BookID, AuthorID) VALUES (1, 1), (2, 2), (3, 2);",
            )
            .unwrap();
        let backup = dir.path().join("backup.txt");
        db.export_to(&backup).unwrap();

        for statement in schema_statements("BookDatabase") {
            db.apply(&statement).unwrap();
        }
        db.reload_from(&backup).unwrap();

        assert_eq!(count(&db, "Locations"), 2);
        assert_eq!(count(&db, "Authors"), 2);
        assert_eq!(count(&db, "Books"), 3);
        assert_eq!(count(&db, "Books_Authors"), 3);

        let (title, location): (String, i64) = db
            .connection()
            .query_row(
                "SELECT Title, LocationID FROM Books WHERE BookID = 3",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(title, "Notes\nand Letters");
        assert_eq!(location, 2);

        let last: String = db
            .connection()
            .query_row("SELECT LastName FROM Authors WHERE AuthorID = 2", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(last, "O'Connor");
    }

    #[test]
    fn test_failing_line_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = catalog_db(&dir);
        let path = dir.path().join("bad.txt");
        fs::write(
            &path,
            "INSERT INTO Locations (LocationID, LocationName) VALUES ('1', 'Office');\n\
             INSERT INTO Books (BookID, Title, Publisher, LocationID) VALUES ('1', 'Dune', 'Chilton', '7');\n",
        )
        .unwrap();

        let err = db.reload_from(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Database(_)));
        assert_eq!(count(&db, "Locations"), 0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = catalog_db(&dir);
        let err = db.reload_from(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
        assert!(!err.is_database());
    }
}
