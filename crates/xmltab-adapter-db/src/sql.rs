//! Statement text

use crate::store::ColumnType;

pub(crate) fn quote_identifier(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

/// `CREATE TABLE` for `columns`, reordered by `column_order` when given.
/// Columns missing from `column_order` keep their relative order at the end.
pub(crate) fn create_table_sql(
    name: &str,
    columns: &[(String, ColumnType)],
    primary_key: Option<&str>,
    column_order: Option<&[String]>,
) -> String {
    let mut items: Vec<&(String, ColumnType)> = columns.iter().collect();
    if let Some(order) = column_order {
        items.sort_by_key(|(column, _)| {
            order
                .iter()
                .position(|c| c == column)
                .unwrap_or(usize::MAX)
        });
    }

    let defs: Vec<String> = items
        .into_iter()
        .map(|(column, column_type)| {
            let mut def = format!("   {} {}", quote_identifier(column), column_type.as_sql());
            if primary_key == Some(column.as_str()) {
                def.push_str(" PRIMARY KEY");
            }
            def
        })
        .collect();

    format!(
        "CREATE TABLE {} (\n{}\n)",
        quote_identifier(name),
        defs.join(",\n")
    )
}

/// Multi-row `INSERT` with `rows` groups of placeholders.
pub(crate) fn insert_sql(table: &str, columns: &[String], rows: usize) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let values = vec![placeholders.as_str(); rows].join(", ");
    format!(
        "INSERT INTO {} ({column_list}) VALUES {values}",
        quote_identifier(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(names: &[&str]) -> Vec<(String, ColumnType)> {
        names
            .iter()
            .map(|n| (n.to_string(), ColumnType::Text))
            .collect()
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("album"), "\"album\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_create_table_with_pk() {
        let sql = create_table_sql("album", &text(&["id", "name"]), Some("id"), None);
        assert_eq!(
            sql,
            "CREATE TABLE \"album\" (\n   \"id\" TEXT PRIMARY KEY,\n   \"name\" TEXT\n)"
        );
    }

    #[test]
    fn test_create_table_column_order() {
        let order = vec!["genre".to_string(), "name".to_string()];
        let sql = create_table_sql("album", &text(&["name", "artist", "genre"]), None, Some(&order));
        let genre = sql.find("genre").unwrap();
        let name = sql.find("\"name\"").unwrap();
        let artist = sql.find("artist").unwrap();
        assert!(genre < name && name < artist);
    }

    #[test]
    fn test_insert_sql_rows() {
        let columns = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            insert_sql("t", &columns, 2),
            "INSERT INTO \"t\" (\"a\", \"b\") VALUES (?, ?), (?, ?)"
        );
    }
}
