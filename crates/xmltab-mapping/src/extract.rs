//! Field extraction
//!
//! Turns the matches of one path into a column value on the current record.

use xmltab_schema::FieldKind;
use xmltab_xml::XmlNode;

use crate::record::Record;

/// Apply `kind` for `column` to `record` given the path's matches.
///
/// - plain: the last match wins; no match leaves the column untouched
/// - joiner: every match is appended in document order, separated by the
///   joiner, onto whatever the column already holds
/// - enum map: the last match is looked up; a miss stores an empty value
/// - enum type: the constant is stored when the path matched at all
pub fn apply(record: &mut Record, column: &str, kind: &FieldKind, matches: &[XmlNode<'_, '_>]) {
    match kind {
        FieldKind::Plain => {
            if let Some(last) = matches.last() {
                record.insert(column.to_string(), Some(last.text()));
            }
        }
        FieldKind::Joiner(joiner) => {
            for found in matches {
                join(record, column, joiner, found.text());
            }
        }
        FieldKind::EnumMap(table) => {
            if let Some(last) = matches.last() {
                record.insert(column.to_string(), table.get(&last.text()).cloned());
            }
        }
        FieldKind::EnumType(constant) => {
            if !matches.is_empty() {
                record.insert(column.to_string(), Some(constant.clone()));
            }
        }
    }
}

fn join(record: &mut Record, column: &str, joiner: &str, text: String) {
    if let Some(Some(existing)) = record.get_mut(column) {
        if !existing.is_empty() {
            existing.push_str(joiner);
            existing.push_str(&text);
            return;
        }
    }
    record.insert(column.to_string(), Some(text));
}
