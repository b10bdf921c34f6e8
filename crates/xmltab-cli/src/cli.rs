use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use xmltab_adapter_csv::{CsvConfig, NullRepresentation, RecordTerminator};
use xmltab_mapping::TransformOptions;
use xmltab_pipeline::{OutputTarget, PipelineConfig};

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputType {
    /// One CSV file per table
    Csv,
    /// A `db.sqlite` database in the output directory
    Sqlite,
}

/// Line endings of CSV output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LineEnding {
    Crlf,
    Lf,
}

impl From<LineEnding> for RecordTerminator {
    fn from(ending: LineEnding) -> Self {
        match ending {
            LineEnding::Crlf => RecordTerminator::CRLF,
            LineEnding::Lf => RecordTerminator::LF,
        }
    }
}

/// Convert XML documents to CSV or SQLite tables according to a YAML mapping
#[derive(Parser, Debug, Clone)]
#[command(name = "xmltab")]
#[command(version)]
pub struct Cli {
    /// Input files, directories or glob patterns
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Mapping configuration (YAML or JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory output is written to
    #[arg(short = 'o', long = "output-path", default_value = "output")]
    pub output_path: PathBuf,

    #[arg(short = 't', long = "output-type", value_enum, default_value_t = OutputType::Csv)]
    pub output_type: OutputType,

    /// Directory external DTDs are resolved against
    #[arg(short = 'd', long = "dtd-path")]
    pub dtd_path: Option<PathBuf>,

    /// Descend into subdirectories of directory inputs
    #[arg(short, long)]
    pub recurse: bool,

    /// Require each document's DOCTYPE to name its document element
    #[arg(long)]
    pub validate: bool,

    /// Skip documents whose DOCTYPE is not the configured <root_element>
    #[arg(long = "check-doctype")]
    pub check_doctype: bool,

    /// Worker count (default: available cores minus one)
    #[arg(short, long)]
    pub processes: Option<usize>,

    /// Log failing documents and carry on instead of stopping
    #[arg(long = "continue-on-error")]
    pub continue_on_error: bool,

    /// CSV field delimiter
    #[arg(long = "csv-delimiter", default_value_t = ',')]
    pub csv_delimiter: char,

    /// Text written for CSV columns without a value
    #[arg(long = "csv-null", default_value = "")]
    pub csv_null: String,

    #[arg(long = "csv-line-ending", value_enum, default_value_t = LineEnding::Crlf)]
    pub csv_line_ending: LineEnding,

    /// Bound variables per SQLite statement
    #[arg(long = "sqlite-max-vars", default_value_t = xmltab_pipeline::SQLITE_MAX_VARIABLE_NUMBER)]
    pub sqlite_max_vars: usize,

    /// Print a JSON run summary to stdout
    #[arg(long)]
    pub summary: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Warnings and errors only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    pub fn validate_args(&self) -> Result<(), String> {
        if self.processes == Some(0) {
            return Err("--processes must be greater than 0".to_string());
        }
        if self.sqlite_max_vars == 0 {
            return Err("--sqlite-max-vars must be greater than 0".to_string());
        }
        if self.csv_config().delimiter_u8().is_none() {
            return Err(format!("--csv-delimiter must be an ASCII character, got {:?}", self.csv_delimiter));
        }
        if let Some(dtd_path) = &self.dtd_path {
            if !dtd_path.is_dir() {
                return Err(format!("DTD path is not a directory: {}", dtd_path.display()));
            }
        }
        Ok(())
    }

    pub fn csv_config(&self) -> CsvConfig {
        CsvConfig::new()
            .delimiter(self.csv_delimiter)
            .null_representation(NullRepresentation::from(self.csv_null.as_str()))
            .record_terminator(self.csv_line_ending.into())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut transform = TransformOptions::new()
            .check_doctype(self.check_doctype)
            .validate(self.validate)
            .continue_on_error(self.continue_on_error);
        if let Some(dtd_path) = &self.dtd_path {
            transform = transform.dtd_path(dtd_path);
        }

        let output = match self.output_type {
            OutputType::Csv => OutputTarget::csv(&self.output_path),
            OutputType::Sqlite => OutputTarget::sqlite_in(&self.output_path),
        };

        PipelineConfig::new()
            .inputs(self.inputs.iter().cloned())
            .recurse(self.recurse)
            .output(output)
            .workers(self.processes)
            .transform(transform)
            .csv(self.csv_config())
            .max_vars(self.sqlite_max_vars)
    }
}
