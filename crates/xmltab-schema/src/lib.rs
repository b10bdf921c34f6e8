//! # xmltab-schema
//!
//! Mapping configuration model, loader and table layout derivation.
//!
//! A configuration is a mapping from paths to schema nodes. Keys wrapped in
//! angle brackets (`<entity>`, `<fields>`, `<root_element>`, ...) are
//! directives; every other key is a path resolved against the XML tree.

pub mod layout;
pub mod loader;
pub mod model;

pub use layout::{ID_COLUMN, TableLayout};
pub use model::{EntityDescriptor, FieldDescriptor, FieldKind, PrimaryKey, Schema, SchemaNode};

use thiserror::Error;

/// Errors that can occur when loading a mapping configuration
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(String),

    #[error("Invalid configuration for \"{path}\":\n{description}")]
    InvalidNode { path: String, description: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
