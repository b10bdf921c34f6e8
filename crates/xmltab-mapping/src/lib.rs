//! # xmltab-mapping
//!
//! Configuration-driven transformation of XML documents into flat records.
//!
//! A [`DocTransformer`] walks the configuration tree alongside a parsed
//! document. Field nodes write normalized text into the current record,
//! entity nodes open a new record in their own table, keyed either by
//! explicit primary-key paths or by a parent-scoped sequence.

pub mod context;
pub mod entity;
pub mod extract;
pub mod record;
pub mod transformer;

pub use context::DocumentContext;
pub use entity::{EntityBuilder, KeyCounters, NO_PARENT_KEY};
pub use record::{Record, Tables, merge_tables, record_count};
pub use transformer::{DocTransformer, Preprocess, TransformOptions};

use thiserror::Error;

/// Conditions that end the processing of a document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unexpected XML document{context}: {declaration}")]
    WrongDoctype {
        declaration: String,
        context: DocumentContext,
    },

    #[error("Document{context} has no DOCTYPE")]
    NoDoctype { context: DocumentContext },

    #[error("Unable to parse XML document{context}: {message}")]
    MalformedDocument {
        message: String,
        context: DocumentContext,
    },

    #[error(
        "Unable to parse document{context}: {found} elements found for <primary_key> component {path}"
    )]
    AmbiguousPrimaryKey {
        path: String,
        found: usize,
        context: DocumentContext,
    },

    #[error("Invalid configuration for \"{path}\"{context}:\n{description}")]
    InvalidSchemaNode {
        path: String,
        description: String,
        context: DocumentContext,
    },

    #[error("Doctype checking is enabled but the configuration has no <root_element>")]
    MissingRootElement,
}

impl Error {
    /// Attach the source location of the failing document, keeping any
    /// record id already recorded.
    pub fn with_location(mut self, filename: Option<&str>, line: Option<usize>) -> Self {
        if let Some(context) = self.context_mut() {
            context.filename = filename.map(str::to_string);
            context.line = line;
        }
        self
    }

    /// Attach a best-effort record id.
    pub fn with_record_id(mut self, record_id: Option<String>) -> Self {
        if let Some(context) = self.context_mut() {
            if context.record_id.is_none() {
                context.record_id = record_id;
            }
        }
        self
    }

    pub fn context(&self) -> Option<&DocumentContext> {
        match self {
            Error::WrongDoctype { context, .. }
            | Error::NoDoctype { context }
            | Error::MalformedDocument { context, .. }
            | Error::AmbiguousPrimaryKey { context, .. }
            | Error::InvalidSchemaNode { context, .. } => Some(context),
            Error::MissingRootElement => None,
        }
    }

    fn context_mut(&mut self) -> Option<&mut DocumentContext> {
        match self {
            Error::WrongDoctype { context, .. }
            | Error::NoDoctype { context }
            | Error::MalformedDocument { context, .. }
            | Error::AmbiguousPrimaryKey { context, .. }
            | Error::InvalidSchemaNode { context, .. } => Some(context),
            Error::MissingRootElement => None,
        }
    }

    /// Whether tolerant mode may skip the document and carry on. A broken
    /// run configuration is never tolerated.
    pub fn is_tolerable(&self) -> bool {
        !matches!(self, Error::MissingRootElement)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
