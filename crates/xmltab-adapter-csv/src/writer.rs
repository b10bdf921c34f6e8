//! Per-table CSV files

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};
use xmltab_mapping::{Record, Tables};
use xmltab_schema::TableLayout;

use crate::config::CsvConfig;
use crate::{Error, Result};

/// Writes each table to `<dir>/<table>.csv`, creating the file with a header
/// row or appending to it when it already exists.
#[derive(Debug, Clone)]
pub struct CsvTableWriter {
    dir: PathBuf,
    config: CsvConfig,
    delimiter: u8,
    quote: u8,
}

impl CsvTableWriter {
    /// Create a writer for `dir`, creating the directory when missing.
    pub fn new(dir: impl Into<PathBuf>, config: CsvConfig) -> Result<Self> {
        let dir = dir.into();
        let delimiter = config
            .delimiter_u8()
            .ok_or_else(|| Error::Config(format!("delimiter {:?} is not ASCII", config.delimiter)))?;
        let quote = config
            .quote_char_u8()
            .ok_or_else(|| Error::Config(format!("quote character {:?} is not ASCII", config.quote_char)))?;
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        Ok(Self {
            dir,
            config,
            delimiter,
            quote,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a table is written to.
    pub fn path_for(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.csv"))
    }

    /// Write every table that has a layout. Returns the number of rows written.
    pub fn write_tables(&self, layouts: &[TableLayout], tables: &Tables) -> Result<usize> {
        info!("Writing csv files to {} ...", self.dir.display());
        let mut written = 0;
        for (table, rows) in tables {
            let layout = layouts
                .iter()
                .find(|layout| &layout.name == table)
                .ok_or_else(|| Error::UnknownTable(table.clone()))?;
            written += self.write_table(layout, rows)?;
        }
        Ok(written)
    }

    /// Append `rows` to the table's file, projected onto the layout columns.
    /// Record keys outside the layout are dropped.
    pub fn write_table(&self, layout: &TableLayout, rows: &[Record]) -> Result<usize> {
        let path = self.path_for(&layout.name);
        let exists = path.exists();
        if exists {
            debug!("CSV file {} exists; records will be appended.", path.display());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .terminator(self.config.terminator())
            .has_headers(false)
            .from_writer(file);

        if !exists {
            writer
                .write_record(&layout.columns)
                .map_err(|e| Error::write(&path, e))?;
        }

        let null = self.config.null_representation.as_str();
        for record in rows {
            let row = project(layout, record, null);
            writer.write_record(&row).map_err(|e| Error::write(&path, e))?;
            trace!(?row, "Wrote CSV row");
        }

        writer.flush().map_err(|e| Error::io(&path, e))?;
        debug!(table = %layout.name, record_count = rows.len(), "Finished writing CSV");
        Ok(rows.len())
    }
}

fn project<'r>(layout: &TableLayout, record: &'r Record, null: &'r str) -> Vec<&'r str> {
    layout
        .columns
        .iter()
        .map(|column| record.get(column).and_then(|v| v.as_deref()).unwrap_or(null))
        .collect()
}
