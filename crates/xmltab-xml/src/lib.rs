#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

//! # xmltab-xml
//!
//! XML document model and path resolution for xmltab.
//!
//! Documents are parsed whole into a navigable tree. Element and attribute
//! matches are unified as [`XmlNode`] so a path step like `@id` yields the
//! same kind of value as `title`. Paths follow a subset of XPath location
//! paths, with unprefixed element names mapped onto the document's default
//! namespace when one is declared.

/// Parsed document wrapper and parse options.
pub mod document;
/// DOCTYPE inspection and external DTD inlining.
pub mod doctype;
/// Namespace map derived from the root element.
pub mod namespace;
/// Element, attribute and text pseudo-nodes.
pub mod node;
/// Path parsing and resolution.
pub mod path;

pub use doctype::{check_doctype, doctype_name, inline_external_dtd};
pub use document::{ParseOptions, XmlDocument};
pub use namespace::{DEFAULT_NAMESPACE_ALIAS, NamespaceMap, XML_NAMESPACE_URI};
pub use node::{XmlNode, normalize_text};
pub use path::{Path, resolve};

use thiserror::Error;

/// Errors that can occur when working with XML documents
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("XML parse error: {message}")]
    Parse { message: String },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Unexpected DOCTYPE: {declaration}")]
    WrongDoctype { declaration: String },

    #[error("Document has no DOCTYPE")]
    MissingDoctype,

    #[error("Unable to load DTD '{path}': {message}")]
    Dtd { path: String, message: String },
}

impl Error {
    /// Build a parse error from any displayable cause.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Build an invalid-path error with input path and parsing reason.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-local result type for XML operations.
pub type Result<T> = std::result::Result<T, Error>;
