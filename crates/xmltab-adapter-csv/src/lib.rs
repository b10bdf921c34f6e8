//! # xmltab-adapter-csv
//!
//! CSV output for transformed tables: one file per table, header row on
//! creation, plain appends afterwards.
//!
//! ```rust,no_run
//! use xmltab_adapter_csv::{CsvConfig, CsvTableWriter, RecordTerminator};
//!
//! let config = CsvConfig::new().record_terminator(RecordTerminator::LF);
//! let _writer = CsvTableWriter::new("out", config)?;
//! # Ok::<(), xmltab_adapter_csv::Error>(())
//! ```

pub mod config;
pub mod errors;
pub mod writer;

pub use config::{CsvConfig, NullRepresentation, RecordTerminator};
pub use errors::{CsvError, CsvResult};
pub use writer::CsvTableWriter;

pub use errors::CsvError as Error;
pub type Result<T> = CsvResult<T>;
