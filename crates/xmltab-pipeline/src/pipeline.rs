//! Pipeline orchestration
//!
//! Input files are processed one after another. The documents of a file are
//! transformed on the worker pool, merged, and flushed to the output before
//! the next file starts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use xmltab_adapter_csv::{CsvConfig, CsvTableWriter};
use xmltab_adapter_db::{ConnectionConfig, SQLITE_MAX_VARIABLE_NUMBER, SqliteStore};
use xmltab_mapping::{DocTransformer, Tables, TransformOptions, record_count};
use xmltab_schema::{Schema, TableLayout};

use crate::discovery::discover_inputs;
use crate::documents::read_documents;
use crate::pool::WorkerPool;
use crate::Result;

/// Database file created inside the output directory for SQLite output.
pub const DB_FILE_NAME: &str = "db.sqlite";

/// Where merged tables are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// One `<table>.csv` per table in `dir`
    Csv { dir: PathBuf },
    /// One SQLite database holding every table
    Sqlite { path: PathBuf },
}

impl OutputTarget {
    pub fn csv(dir: impl Into<PathBuf>) -> Self {
        OutputTarget::Csv { dir: dir.into() }
    }

    /// SQLite output at `<dir>/db.sqlite`.
    pub fn sqlite_in(dir: impl AsRef<Path>) -> Self {
        OutputTarget::Sqlite {
            path: dir.as_ref().join(DB_FILE_NAME),
        }
    }

    pub fn location(&self) -> &Path {
        match self {
            OutputTarget::Csv { dir } => dir,
            OutputTarget::Sqlite { path } => path,
        }
    }
}

/// Configuration for a conversion run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Files, directories or glob patterns
    pub inputs: Vec<String>,
    /// Descend into subdirectories of directory inputs
    pub recurse: bool,
    pub output: OutputTarget,
    /// Worker count; `None` uses one less than the available cores
    pub workers: Option<usize>,
    pub transform: TransformOptions,
    pub csv: CsvConfig,
    /// Bound variables per SQLite statement
    pub max_vars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            recurse: false,
            output: OutputTarget::csv("."),
            workers: None,
            transform: TransformOptions::default(),
            csv: CsvConfig::default(),
            max_vars: SQLITE_MAX_VARIABLE_NUMBER,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.inputs.push(input.into());
        self
    }

    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    pub fn workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn transform(mut self, transform: TransformOptions) -> Self {
        self.transform = transform;
        self
    }

    pub fn csv(mut self, csv: CsvConfig) -> Self {
        self.csv = csv;
        self
    }

    pub fn max_vars(mut self, max_vars: usize) -> Self {
        self.max_vars = max_vars;
        self
    }
}

/// What one input file produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub documents: usize,
    /// Records per table
    pub records: BTreeMap<String, usize>,
}

impl FileSummary {
    pub fn record_count(&self) -> usize {
        self.records.values().sum()
    }
}

/// What a whole run produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileSummary>,
}

impl RunSummary {
    pub fn documents(&self) -> usize {
        self.files.iter().map(|f| f.documents).sum()
    }

    /// Records per table across all files
    pub fn records(&self) -> BTreeMap<String, usize> {
        let mut totals = BTreeMap::new();
        for file in &self.files {
            for (table, count) in &file.records {
                *totals.entry(table.clone()).or_insert(0) += count;
            }
        }
        totals
    }
}

enum Sink {
    Csv(CsvTableWriter),
    Sqlite(SqliteStore),
}

/// Converts a collection of XML files into tables
pub struct Pipeline {
    config: PipelineConfig,
    schema: Arc<Schema>,
    layouts: Vec<TableLayout>,
    files: Vec<PathBuf>,
    pool: WorkerPool,
    sink: Sink,
}

impl Pipeline {
    /// Resolve inputs and prepare the output before any document is read,
    /// so configuration problems surface first.
    pub async fn new(schema: Schema, config: PipelineConfig) -> Result<Self> {
        let layouts = schema.table_layouts()?;
        let schema = Arc::new(schema);
        DocTransformer::new(Arc::clone(&schema), config.transform.clone())?;

        let files = discover_inputs(&config.inputs, config.recurse)?;
        let sink = open_sink(&config, &layouts).await?;
        let pool = WorkerPool::new(config.workers.unwrap_or_else(WorkerPool::default_workers));

        info!(
            file_count = files.len(),
            table_count = layouts.len(),
            workers = pool.workers(),
            output = %config.output.location().display(),
            "Pipeline ready"
        );
        Ok(Self {
            config,
            schema,
            layouts,
            files,
            pool,
            sink,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Input files in processing order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn layouts(&self) -> &[TableLayout] {
        &self.layouts
    }

    /// Process every input file in turn.
    pub async fn convert(&self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for path in &self.files {
            summary.files.push(self.convert_file(path).await?);
        }
        info!(
            documents = summary.documents(),
            records = ?summary.records(),
            "Conversion finished"
        );
        Ok(summary)
    }

    /// Transform all documents of one file and flush the merged tables.
    pub async fn convert_file(&self, path: &Path) -> Result<FileSummary> {
        info!("Processing {}...", path.display());
        let documents = read_documents(path)?;
        let (tables, processed) = self
            .pool
            .transform_all(&self.schema, &self.config.transform, documents)
            .await?;

        let summary = FileSummary {
            path: path.to_path_buf(),
            documents: processed,
            records: tables
                .iter()
                .map(|(table, rows)| (table.clone(), rows.len()))
                .collect(),
        };

        if record_count(&tables) == 0 {
            warn!("No records found! (config file error?)");
        } else {
            info!("...{processed} documents processed!");
            self.flush(&tables).await?;
        }
        Ok(summary)
    }

    async fn flush(&self, tables: &Tables) -> Result<()> {
        match &self.sink {
            Sink::Csv(writer) => {
                writer.write_tables(&self.layouts, tables)?;
            }
            Sink::Sqlite(store) => {
                store.write_tables(tables).await?;
            }
        }
        Ok(())
    }
}

async fn open_sink(config: &PipelineConfig, layouts: &[TableLayout]) -> Result<Sink> {
    match &config.output {
        OutputTarget::Csv { dir } => Ok(Sink::Csv(CsvTableWriter::new(dir, config.csv.clone())?)),
        OutputTarget::Sqlite { path } => {
            if path.exists() {
                warn!("Sqlite database {} exists; records will be appended.", path.display());
            }
            let store =
                SqliteStore::open(ConnectionConfig::local(path).max_vars(config.max_vars)).await?;
            store.prepare(layouts).await?;
            Ok(Sink::Sqlite(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = PipelineConfig::new()
            .input("a.xml")
            .inputs(["b/*.xml", "c"])
            .recurse(true)
            .workers(Some(2))
            .output(OutputTarget::sqlite_in("out"));

        assert_eq!(config.inputs, vec!["a.xml", "b/*.xml", "c"]);
        assert!(config.recurse);
        assert_eq!(config.workers, Some(2));
        assert_eq!(config.output.location(), Path::new("out").join(DB_FILE_NAME));
        assert_eq!(config.max_vars, SQLITE_MAX_VARIABLE_NUMBER);
    }

    #[test]
    fn test_run_summary_totals() {
        let summary = RunSummary {
            files: vec![
                FileSummary {
                    path: "a.xml".into(),
                    documents: 2,
                    records: BTreeMap::from([("album".to_string(), 2), ("track".to_string(), 5)]),
                },
                FileSummary {
                    path: "b.xml".into(),
                    documents: 1,
                    records: BTreeMap::from([("album".to_string(), 1)]),
                },
            ],
        };
        assert_eq!(summary.documents(), 3);
        assert_eq!(summary.records()["album"], 3);
        assert_eq!(summary.records()["track"], 5);
        assert_eq!(summary.files[0].record_count(), 7);
    }
}
