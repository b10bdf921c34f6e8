//! # xmltab-adapter-db
//!
//! SQLite output for transformed tables.
//!
//! Tables are created from the schema's column layouts (or widened when they
//! already exist), and each flush inserts its records in multi-row batches
//! inside a single exclusive transaction.

pub mod connection;
mod sql;
pub mod store;

pub use connection::{ConnectionConfig, SQLITE_MAX_COLUMN, SQLITE_MAX_VARIABLE_NUMBER};
pub use store::{ColumnInfo, ColumnType, SqliteStore};

use thiserror::Error;

/// Errors that can occur when writing to the database.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {details}")]
    Config { details: String },

    #[error("Libsql error during {context}: {source}")]
    Libsql {
        context: String,
        #[source]
        source: libsql::Error,
    },

    #[error("SQL error executing `{statement}`: {source}")]
    Sql {
        statement: String,
        #[source]
        source: libsql::Error,
    },

    #[error("Query error on `{table}`: {details}")]
    Query { table: String, details: String },

    #[error("Schema error: {details}")]
    Schema { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
