//! Splitting input files into XML documents
//!
//! A file may hold several documents one after another, each starting with
//! its own `<?xml ` declaration, sometimes without a newline in between.

use std::path::Path;

use crate::{Error, Result};

const PROLOGUE: &str = "<?xml ";

/// One document cut out of an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// File name (without directories) the document came from
    pub filename: String,
    /// 1-based line the document starts on
    pub line: usize,
    pub text: String,
}

/// Read `path` and split it into documents. Invalid UTF-8 is replaced.
pub fn read_documents(path: &Path) -> Result<Vec<RawDocument>> {
    let bytes =
        std::fs::read(path).map_err(|e| Error::io("read", path.display().to_string(), e))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(split_documents(&filename, &String::from_utf8_lossy(&bytes)))
}

/// Split `content` at every XML declaration that does not open the current
/// piece. Whitespace-only pieces are dropped.
pub fn split_documents(filename: &str, content: &str) -> Vec<RawDocument> {
    let mut documents = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (index, line) in content.split_inclusive('\n').enumerate() {
        let mut rest = line;
        loop {
            let skip = if current.is_empty() && rest.starts_with(PROLOGUE) {
                PROLOGUE.len()
            } else {
                0
            };
            let Some(pos) = rest[skip..].find(PROLOGUE).map(|p| p + skip) else {
                break;
            };
            current.push_str(&rest[..pos]);
            flush(&mut documents, &mut current, filename, start);
            start = index;
            rest = &rest[pos..];
        }
        current.push_str(rest);
    }
    flush(&mut documents, &mut current, filename, start);

    documents
}

fn flush(documents: &mut Vec<RawDocument>, current: &mut String, filename: &str, start: usize) {
    if !current.trim().is_empty() {
        documents.push(RawDocument {
            filename: filename.to_string(),
            line: start + 1,
            text: std::mem::take(current),
        });
    }
    current.clear();
}
