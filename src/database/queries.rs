//! Catalog query operations
//! Manual entry path: books, authors and the links between them

use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::Database;
use crate::error::Result;

/// Book fields supplied at entry time; `BookID` and `DateEntered` come from the database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBook {
    pub isbn: Option<String>,
    pub title: String,
    pub edition: Option<String>,
    pub publisher: String,
    pub publication_date: Option<String>,
    pub location_id: i64,
    pub is_read: bool,
    pub read_date: Option<String>,
}

/// Stored book row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: i64,
    pub isbn: Option<String>,
    pub title: String,
    pub edition: Option<String>,
    pub publisher: String,
    pub publication_date: Option<String>,
    pub location_id: i64,
    pub is_read: bool,
    pub read_date: Option<String>,
    pub date_entered: Option<String>,
}

/// First/last split of an author's display name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub first_name: String,
    pub last_name: String,
}

impl AuthorName {
    /// Split "Ursula K. Le Guin" style names on the last word.
    /// A blank name becomes "Unknown Author".
    pub fn parse(full_name: &str) -> Self {
        let mut words: Vec<&str> = full_name.split_whitespace().collect();
        let Some(last) = words.pop() else {
            return Self {
                first_name: "Unknown".to_string(),
                last_name: "Author".to_string(),
            };
        };
        Self {
            first_name: words.join(" "),
            last_name: last.to_string(),
        }
    }
}

fn insert_book(conn: &Connection, book: &NewBook) -> rusqlite::Result<i64> {
    conn.execute(
        r#"
        INSERT INTO Books (ISBN, Title, Edition, Publisher, PublicationDate, LocationID, IsRead, ReadDate)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            book.isbn,
            book.title,
            book.edition,
            book.publisher,
            book.publication_date,
            book.location_id,
            book.is_read,
            book.read_date,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_author_if_not_exists(conn: &Connection, name: &AuthorName) -> rusqlite::Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT AuthorID FROM Authors WHERE FirstName = ?1 AND LastName = ?2 ORDER BY AuthorID LIMIT 1",
            params![name.first_name, name.last_name],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO Authors (FirstName, LastName) VALUES (?1, ?2)",
        params![name.first_name, name.last_name],
    )?;
    Ok(conn.last_insert_rowid())
}

fn associate_book_with_author(conn: &Connection, book_id: i64, author_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO Books_Authors (BookID, AuthorID) VALUES (?1, ?2)",
        params![book_id, author_id],
    )?;
    Ok(())
}

impl Database {
    /// Location id by name, inserting the location if it is new
    pub fn location_id_or_insert(&self, name: &str) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            "INSERT OR IGNORE INTO Locations (LocationName) VALUES (?1)",
            params![name],
        )?;
        let id = conn.query_row(
            "SELECT LocationID FROM Locations WHERE LocationName = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Insert a single book and return its BookID
    pub fn insert_book(&self, book: &NewBook) -> Result<i64> {
        Ok(insert_book(self.connection(), book)?)
    }

    /// Author id matching first and last name, inserting the author if absent
    pub fn insert_author_if_not_exists(&self, name: &AuthorName) -> Result<i64> {
        Ok(insert_author_if_not_exists(self.connection(), name)?)
    }

    pub fn associate_book_with_author(&self, book_id: i64, author_id: i64) -> Result<()> {
        Ok(associate_book_with_author(self.connection(), book_id, author_id)?)
    }

    /// Insert a book, its authors and the link rows in one transaction.
    /// Nothing is kept if any step fails.
    pub fn insert_book_with_authors(&mut self, book: &NewBook, authors: &[AuthorName]) -> Result<i64> {
        let tx = self.connection_mut().transaction()?;

        let book_id = insert_book(&tx, book)?;
        let mut linked = Vec::with_capacity(authors.len());
        for name in authors {
            let author_id = insert_author_if_not_exists(&tx, name)?;
            // The same author listed twice links once
            if !linked.contains(&author_id) {
                associate_book_with_author(&tx, book_id, author_id)?;
                linked.push(author_id);
            }
        }

        tx.commit()?;
        info!(
            "Book inserted with {} authors: {} (BookID {})",
            linked.len(),
            book.title,
            book_id
        );
        Ok(book_id)
    }

    /// BookID for an ISBN, if the catalog has it
    pub fn book_id_by_isbn(&self, isbn: &str) -> Result<Option<i64>> {
        let id = self
            .connection()
            .query_row(
                "SELECT BookID FROM Books WHERE ISBN = ?1 ORDER BY BookID LIMIT 1",
                params![isbn],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Every book, in BookID order
    pub fn all_books(&self) -> Result<Vec<BookRecord>> {
        fn row_to_book(row: &rusqlite::Row) -> rusqlite::Result<BookRecord> {
            Ok(BookRecord {
                id: row.get(0)?,
                isbn: row.get(1)?,
                title: row.get(2)?,
                edition: row.get(3)?,
                publisher: row.get(4)?,
                publication_date: row.get(5)?,
                location_id: row.get(6)?,
                is_read: row.get(7)?,
                read_date: row.get(8)?,
                date_entered: row.get(9)?,
            })
        }

        let mut stmt = self.connection().prepare(
            r#"
            SELECT BookID, ISBN, Title, Edition, Publisher, PublicationDate,
                   LocationID, IsRead, ReadDate, DateEntered
            FROM Books
            ORDER BY BookID
            "#,
        )?;
        let books = stmt
            .query_map([], row_to_book)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(books)
    }
}
