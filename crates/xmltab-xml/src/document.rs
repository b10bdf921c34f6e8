//! Parsed document wrapper

use std::borrow::Cow;
use std::path::PathBuf;

use crate::doctype::{doctype_name, inline_external_dtd};
use crate::namespace::NamespaceMap;
use crate::node::XmlNode;
use crate::{Error, Result};

/// Options applied when turning raw text into a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Directory external DTD subsets are loaded from. When unset, external
    /// identifiers are ignored and only the internal subset is honoured.
    pub dtd_path: Option<PathBuf>,

    /// Require the DOCTYPE to name the document element.
    pub validate: bool,
}

impl ParseOptions {
    /// Normalize raw text for parsing: drop leading whitespace (a document
    /// split out of a concatenated file starts wherever its declaration did)
    /// and inline the external DTD when a DTD directory is configured.
    pub fn prepare<'t>(&self, raw: &'t str) -> Result<Cow<'t, str>> {
        let trimmed = raw.trim_start();
        match &self.dtd_path {
            Some(dir) => inline_external_dtd(trimmed, dir),
            None => Ok(Cow::Borrowed(trimmed)),
        }
    }
}

/// A parsed XML document.
pub struct XmlDocument<'input> {
    tree: roxmltree::Document<'input>,
}

impl<'input> XmlDocument<'input> {
    /// Parse already-prepared text (see [`ParseOptions::prepare`]).
    pub fn parse(text: &'input str, options: &ParseOptions) -> Result<Self> {
        let tree = roxmltree::Document::parse_with_options(
            text,
            roxmltree::ParsingOptions {
                allow_dtd: true,
                ..Default::default()
            },
        )
        .map_err(|e| Error::parse(e.to_string()))?;

        if options.validate {
            let root = tree.root_element().tag_name().name();
            match doctype_name(text) {
                Some(declared) if declared.rsplit(':').next() == Some(root) => {}
                Some(declared) => {
                    return Err(Error::parse(format!(
                        "document element '{root}' does not match DOCTYPE '{declared}'"
                    )));
                }
                None => {
                    return Err(Error::parse(format!(
                        "document element '{root}' has no DOCTYPE to validate against"
                    )));
                }
            }
        }

        Ok(Self { tree })
    }

    /// The document element.
    pub fn root_element<'a>(&'a self) -> XmlNode<'a, 'input> {
        XmlNode::node(self.tree.root_element())
    }

    /// Namespace declarations in scope on the document element.
    pub fn namespaces(&self) -> NamespaceMap {
        NamespaceMap::from_element(self.tree.root_element())
    }

    /// Borrow the underlying tree.
    pub fn tree(&self) -> &roxmltree::Document<'input> {
        &self.tree
    }
}
