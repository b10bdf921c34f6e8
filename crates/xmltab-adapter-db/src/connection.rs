//! Database location and limits.

use std::path::Path;

use libsql::{Builder, Database};

use crate::{Error, Result};

/// Conservative default for the number of bound variables per statement
/// (SQLite builds before 3.32.0).
pub const SQLITE_MAX_VARIABLE_NUMBER: usize = 999;

/// Maximum number of columns in a table.
pub const SQLITE_MAX_COLUMN: usize = 2000;

/// Where the store lives and how large its statements may get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// File path, or `:memory:`
    pub database_url: String,
    /// Bound variables allowed per statement. Inserts are batched so that
    /// `rows * columns` never exceeds this.
    pub max_vars: usize,
}

impl ConnectionConfig {
    pub fn in_memory() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            max_vars: SQLITE_MAX_VARIABLE_NUMBER,
        }
    }

    pub fn local(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: path.as_ref().display().to_string(),
            max_vars: SQLITE_MAX_VARIABLE_NUMBER,
        }
    }

    /// Raise (or lower) the bound-variable limit, e.g. for SQLite builds
    /// compiled with a larger `SQLITE_MAX_VARIABLE_NUMBER`.
    pub fn max_vars(mut self, max_vars: usize) -> Self {
        self.max_vars = max_vars;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        is_in_memory_url(&self.database_url)
    }

    /// Widest table the store accepts.
    pub fn max_columns(&self) -> usize {
        self.max_vars.min(SQLITE_MAX_COLUMN)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

pub(crate) async fn build_database(config: &ConnectionConfig) -> Result<Database> {
    let url = config.database_url.trim();
    if url.is_empty() {
        return Err(Error::Config {
            details: "database_url must be provided".to_string(),
        });
    }
    if config.max_vars == 0 {
        return Err(Error::Config {
            details: "max_vars must be greater than zero".to_string(),
        });
    }

    let path = url.strip_prefix("file:").unwrap_or(url);
    if !is_in_memory_url(url) {
        if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    Builder::new_local(path)
        .build()
        .await
        .map_err(|source| Error::Libsql {
            context: "open local database".to_string(),
            source,
        })
}

fn is_in_memory_url(url: &str) -> bool {
    let url = url.trim();
    url == ":memory:" || url.starts_with("file::memory:") || url.contains("mode=memory")
}
