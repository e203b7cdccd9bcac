//! book-catalog - schema reset, backup and reload for a personal book catalog
//!
//! The catalog lives in a single SQLite file. Every reset first exports the
//! current rows to replayable backups; `database` also carries the manual
//! entry queries for books and authors.

pub mod config;
pub mod database;
pub mod error;
pub mod rebuild;
