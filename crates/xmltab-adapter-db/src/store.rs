//! SQLite table store: creation, widening, batched inserts.

use libsql::{Connection, Database, TransactionBehavior, Value, params_from_iter};
use tracing::{debug, info, warn};
use xmltab_mapping::{Record, Tables};
use xmltab_schema::TableLayout;

use crate::connection::{ConnectionConfig, build_database};
use crate::sql::{create_table_sql, insert_sql, quote_identifier};
use crate::{Error, Result};

/// Declared column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Blob,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Blob => "BLOB",
        }
    }
}

/// One row of `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub primary_key: bool,
}

/// A SQLite database holding the output tables.
pub struct SqliteStore {
    // Keeps the database alive for the lifetime of the connection.
    _database: Database,
    connection: Connection,
    config: ConnectionConfig,
}

impl SqliteStore {
    /// Open (or create) the database and apply the bulk-load pragmas.
    pub async fn open(config: ConnectionConfig) -> Result<Self> {
        let database = build_database(&config).await?;
        let connection = database.connect().map_err(|source| Error::Libsql {
            context: "connect database".to_string(),
            source,
        })?;

        for pragma in ["PRAGMA synchronous = OFF", "PRAGMA journal_mode = MEMORY"] {
            // journal_mode reports the new mode as a row, so drain as a query
            let mut rows = connection
                .query(pragma, ())
                .await
                .map_err(|source| Error::Sql {
                    statement: pragma.to_string(),
                    source,
                })?;
            while rows
                .next()
                .await
                .map_err(|source| Error::Sql {
                    statement: pragma.to_string(),
                    source,
                })?
                .is_some()
            {}
        }

        debug!(database = %config.database_url, "Opened SQLite store");
        Ok(Self {
            _database: database,
            connection,
            config,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub async fn table_names(&self) -> Result<Vec<String>> {
        let sql = "SELECT name FROM sqlite_master WHERE type = 'table'";
        let mut rows = self
            .connection
            .query(sql, ())
            .await
            .map_err(|source| sql_error(sql, source))?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().await.map_err(|source| sql_error(sql, source))? {
            names.push(row.get::<String>(0).map_err(|source| sql_error(sql, source))?);
        }
        Ok(names)
    }

    pub async fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.table_names().await?.iter().any(|name| name == table))
    }

    /// Columns of `table` in declaration order. Empty when the table is missing.
    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        table_info(&self.connection, table).await
    }

    /// Create `name` with `columns`. `column_order` reorders the columns it
    /// names; the rest follow in their given order.
    pub async fn create_table(
        &self,
        name: &str,
        columns: &[(String, ColumnType)],
        primary_key: Option<&str>,
        column_order: Option<&[String]>,
    ) -> Result<()> {
        let max_columns = self.config.max_columns();
        if columns.is_empty() {
            return Err(Error::Schema {
                details: format!("table `{name}` has no columns"),
            });
        }
        if columns.len() > max_columns {
            return Err(Error::Schema {
                details: format!(
                    "table `{name}` has {} columns; tables can have a maximum of {max_columns} columns",
                    columns.len()
                ),
            });
        }
        if let Some(pk) = primary_key {
            if !columns.iter().any(|(column, _)| column == pk) {
                return Err(Error::Schema {
                    details: format!("primary key `{pk}` is not a column of `{name}`"),
                });
            }
        }

        let sql = create_table_sql(name, columns, primary_key, column_order);
        self.connection
            .execute(&sql, ())
            .await
            .map_err(|source| Error::Sql {
                statement: sql.clone(),
                source,
            })?;
        debug!(table = name, column_count = columns.len(), "Created table");
        Ok(())
    }

    pub async fn add_column(&self, table: &str, column: &str, column_type: ColumnType) -> Result<()> {
        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {} {}",
            quote_identifier(table),
            quote_identifier(column),
            column_type.as_sql()
        );
        self.connection
            .execute(&sql, ())
            .await
            .map_err(|source| Error::Sql {
                statement: sql.clone(),
                source,
            })?;
        debug!(table, column, "Added column");
        Ok(())
    }

    /// Make the database match `layouts`: create missing tables (all TEXT,
    /// layout order, `primary_key` as declared) and add missing columns to
    /// tables that already exist.
    pub async fn prepare(&self, layouts: &[TableLayout]) -> Result<()> {
        let existing = self.table_names().await?;
        for layout in layouts {
            if existing.contains(&layout.name) {
                let present = self.columns(&layout.name).await?;
                for column in &layout.columns {
                    if !present.iter().any(|info| &info.name == column) {
                        self.add_column(&layout.name, column, ColumnType::Text).await?;
                    }
                }
                continue;
            }

            let columns: Vec<(String, ColumnType)> = layout
                .columns
                .iter()
                .map(|c| (c.clone(), ColumnType::Text))
                .collect();
            self.create_table(
                &layout.name,
                &columns,
                layout.primary_key.as_deref(),
                Some(&layout.columns),
            )
            .await?;
        }
        Ok(())
    }

    /// Insert `records` into `table` outside an explicit transaction.
    pub async fn insert_all(&self, table: &str, records: &[Record]) -> Result<usize> {
        insert_batches(&self.connection, table, records, self.config.max_vars).await
    }

    /// Insert every table's records in one exclusive transaction.
    /// Returns the number of rows written.
    pub async fn write_tables(&self, tables: &Tables) -> Result<usize> {
        info!("Writing records to {} ...", self.config.database_url);
        let tx = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Exclusive)
            .await
            .map_err(|source| Error::Libsql {
                context: "begin exclusive transaction".to_string(),
                source,
            })?;

        let mut written = 0;
        for (table, rows) in tables {
            info!("Writing {} records to `{}`...", rows.len(), table);
            match insert_batches(&tx, table, rows, self.config.max_vars).await {
                Ok(count) => written += count,
                Err(err) => {
                    warn!(table = %table, error = %err, "Rolling back flush");
                    tx.rollback().await.map_err(|source| Error::Libsql {
                        context: "rollback transaction".to_string(),
                        source,
                    })?;
                    return Err(err);
                }
            }
        }

        tx.commit().await.map_err(|source| Error::Libsql {
            context: "commit transaction".to_string(),
            source,
        })?;
        Ok(written)
    }

    pub async fn row_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let mut rows = self
            .connection
            .query(&sql, ())
            .await
            .map_err(|source| sql_error(&sql, source))?;
        let row = rows
            .next()
            .await
            .map_err(|source| sql_error(&sql, source))?
            .ok_or_else(|| Error::Query {
                table: table.to_string(),
                details: "COUNT(*) returned no rows".to_string(),
            })?;
        let count = row.get::<i64>(0).map_err(|source| sql_error(&sql, source))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// All rows of `table` in insertion order.
    pub async fn select_all(&self, table: &str) -> Result<Vec<Record>> {
        let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_identifier(table));
        let mut rows = self
            .connection
            .query(&sql, ())
            .await
            .map_err(|source| sql_error(&sql, source))?;

        let mut output = Vec::new();
        while let Some(row) = rows.next().await.map_err(|source| sql_error(&sql, source))? {
            let mut record = Record::new();
            for idx in 0..row.column_count() {
                let column = row.column_name(idx).ok_or_else(|| Error::Query {
                    table: table.to_string(),
                    details: format!("Missing column name for index {idx}"),
                })?;
                let value = row.get_value(idx).map_err(|source| sql_error(&sql, source))?;
                record.insert(column.to_string(), value_to_text(value));
            }
            output.push(record);
        }
        Ok(output)
    }
}

async fn table_info(connection: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut rows = connection
        .query(&sql, ())
        .await
        .map_err(|source| sql_error(&sql, source))?;

    let mut columns = Vec::new();
    while let Some(row) = rows.next().await.map_err(|source| sql_error(&sql, source))? {
        columns.push(ColumnInfo {
            name: row.get::<String>(1).map_err(|source| sql_error(&sql, source))?,
            declared_type: row.get::<String>(2).map_err(|source| sql_error(&sql, source))?,
            primary_key: row.get::<i64>(5).map_err(|source| sql_error(&sql, source))? > 0,
        });
    }
    Ok(columns)
}

/// Insert in multi-row batches of `max_vars / column_count` records. Values
/// are taken by the table's current columns: absent keys become NULL and
/// keys the table lacks are ignored.
async fn insert_batches(
    connection: &Connection,
    table: &str,
    records: &[Record],
    max_vars: usize,
) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let columns: Vec<String> = table_info(connection, table)
        .await?
        .into_iter()
        .map(|info| info.name)
        .collect();
    if columns.is_empty() {
        return Err(Error::Query {
            table: table.to_string(),
            details: "table does not exist".to_string(),
        });
    }
    if columns.len() > max_vars {
        return Err(Error::Schema {
            details: format!(
                "table `{table}` has {} columns, more than the {max_vars} bound variables allowed per statement",
                columns.len()
            ),
        });
    }

    let batch_size = max_vars / columns.len();
    for batch in records.chunks(batch_size) {
        let sql = insert_sql(table, &columns, batch.len());
        let params: Vec<Value> = batch
            .iter()
            .flat_map(|record| {
                columns.iter().map(move |column| match record.get(column) {
                    Some(Some(value)) => Value::Text(value.clone()),
                    _ => Value::Null,
                })
            })
            .collect();
        connection
            .execute(&sql, params_from_iter(params))
            .await
            .map_err(|source| Error::Sql {
                statement: sql.clone(),
                source,
            })?;
    }
    debug!(table, record_count = records.len(), batch_size, "Inserted records");
    Ok(records.len())
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(text) => Some(text),
        Value::Integer(i) => Some(i.to_string()),
        Value::Real(f) => Some(f.to_string()),
        Value::Blob(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
    }
}

fn sql_error(statement: &str, source: libsql::Error) -> Error {
    Error::Sql {
        statement: statement.to_string(),
        source,
    }
}
