//! Records and table collections

use std::collections::BTreeMap;

/// One output row: column name to value. `None` marks a column that was
/// resolved but has no value (an enum lookup miss, an unknown filename).
pub type Record = BTreeMap<String, Option<String>>;

/// Rows per table name, in document traversal order within each table.
pub type Tables = BTreeMap<String, Vec<Record>>;

/// Append every table of `from` onto `into`, preserving row order.
pub fn merge_tables(into: &mut Tables, from: Tables) {
    for (table, rows) in from {
        into.entry(table).or_default().extend(rows);
    }
}

/// Total number of rows across all tables.
pub fn record_count(tables: &Tables) -> usize {
    tables.values().map(Vec::len).sum()
}
