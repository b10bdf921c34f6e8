//! Error types for CSV output

use thiserror::Error;

/// Errors that can occur when writing table files
#[derive(Error, Debug)]
pub enum CsvError {
    #[error("CSV write error for {path}: {message}")]
    Write { path: String, message: String },

    #[error("IO error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A table has rows but no layout to project them onto
    #[error("No column layout for table '{0}'")]
    UnknownTable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CsvError {
    pub(crate) fn write(path: &std::path::Path, e: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

pub type CsvResult<T> = std::result::Result<T, CsvError>;
