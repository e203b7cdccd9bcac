//! Database module for the book catalog
//!
//! Schema reset, backup export/reload and catalog entry over a single SQLite connection.

mod export;
mod queries;
mod reload;
mod schema;

pub use export::*;
pub use queries::{AuthorName, BookRecord, NewBook};
pub use schema::{Database, EXPORT_ORDER, SchemaStatement, schema_statements};

#[cfg(test)]
pub(crate) use schema::tests::{catalog_db, count};
