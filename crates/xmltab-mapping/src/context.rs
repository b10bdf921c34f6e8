//! Identifying context attached to document-level errors

use std::fmt::{Display, Formatter};

/// Where a failing document came from. Displays as a phrase suffix such as
/// ` with ID Pink Moon starting at line 12 in file albums.xml`, or nothing
/// when nothing is known.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentContext {
    pub filename: Option<String>,
    pub line: Option<usize>,
    pub record_id: Option<String>,
}

impl Display for DocumentContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(id) = &self.record_id {
            write!(f, " with ID {id}")?;
        }
        if let Some(line) = self.line {
            write!(f, " starting at line {line}")?;
        }
        if let Some(filename) = &self.filename {
            write!(f, " in file {filename}")?;
        }
        Ok(())
    }
}
