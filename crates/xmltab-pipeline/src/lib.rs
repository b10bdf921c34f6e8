//! # xmltab-pipeline
//!
//! Collection-level orchestration: expand input paths, split files into
//! documents, transform documents on a worker pool, merge the per-document
//! tables and flush them to CSV or SQLite, one input file at a time.

pub mod discovery;
pub mod documents;
pub mod pipeline;
pub mod pool;

pub use discovery::{discover_inputs, expand_input};
pub use documents::{RawDocument, read_documents, split_documents};
pub use pipeline::{DB_FILE_NAME, FileSummary, OutputTarget, Pipeline, PipelineConfig, RunSummary};
pub use pool::WorkerPool;
pub use xmltab_adapter_db::SQLITE_MAX_VARIABLE_NUMBER;

use thiserror::Error;

/// Errors that end a conversion run
#[derive(Error, Debug)]
pub enum Error {
    /// An input path, directory or pattern that matches nothing
    #[error("Invalid input '{input}': {message}")]
    Input { input: String, message: String },

    #[error("Pipeline error during {operation} for '{path}': {message}")]
    Pipeline {
        operation: String,
        path: String,
        message: String,
    },

    #[error("IO error during {operation} for '{path}': {source}")]
    Io {
        operation: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Schema(#[from] xmltab_schema::Error),

    #[error(transparent)]
    Transform(#[from] xmltab_mapping::Error),

    #[error(transparent)]
    Csv(#[from] xmltab_adapter_csv::Error),

    #[error(transparent)]
    Db(#[from] xmltab_adapter_db::Error),
}

impl Error {
    pub fn input(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Input {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a structured pipeline error with operation/path context.
    pub fn pipeline(
        operation: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Pipeline {
            operation: operation.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(operation: impl Into<String>, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
