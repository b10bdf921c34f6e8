//! Document transformer
//!
//! Runs one document through doctype check, preprocessing, parsing,
//! namespace discovery and the configuration walk. Records of a document are
//! committed only once the whole document succeeded.

use std::borrow::Cow;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};
use xmltab_schema::{Schema, SchemaNode};
use xmltab_xml::{NamespaceMap, ParseOptions, XmlDocument, XmlNode};

use crate::entity::{EntityBuilder, KeyCounters, primary_key_text};
use crate::record::{Tables, merge_tables, record_count};
use crate::{DocumentContext, Error, Result};

/// Caller-supplied rewrite of raw document text, applied before parsing.
pub type Preprocess = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Per-document processing options
#[derive(Clone, Default)]
pub struct TransformOptions {
    /// Require a DOCTYPE naming the configured `<root_element>`
    pub check_doctype: bool,
    /// Require the DOCTYPE to name the parsed document element
    pub validate: bool,
    /// Directory external DTDs are resolved against
    pub dtd_path: Option<PathBuf>,
    /// Skip failing documents instead of failing the run
    pub continue_on_error: bool,
    /// Re-read namespace declarations for every document
    pub refresh_namespaces: bool,
    pub preprocess: Option<Preprocess>,
}

impl Debug for TransformOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformOptions")
            .field("check_doctype", &self.check_doctype)
            .field("validate", &self.validate)
            .field("dtd_path", &self.dtd_path)
            .field("continue_on_error", &self.continue_on_error)
            .field("refresh_namespaces", &self.refresh_namespaces)
            .field("preprocess", &self.preprocess.is_some())
            .finish()
    }
}

impl TransformOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_doctype(mut self, check_doctype: bool) -> Self {
        self.check_doctype = check_doctype;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn dtd_path(mut self, dtd_path: impl Into<PathBuf>) -> Self {
        self.dtd_path = Some(dtd_path.into());
        self
    }

    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn refresh_namespaces(mut self, refresh_namespaces: bool) -> Self {
        self.refresh_namespaces = refresh_namespaces;
        self
    }

    /// Rewrite raw document text before it is parsed.
    pub fn preprocess(mut self, preprocess: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.preprocess = Some(Arc::new(preprocess));
        self
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            dtd_path: self.dtd_path.clone(),
            validate: self.validate,
        }
    }
}

/// Transforms documents into tables, accumulating across calls.
pub struct DocTransformer {
    schema: Arc<Schema>,
    options: TransformOptions,
    namespaces: Option<NamespaceMap>,
    counters: KeyCounters,
    tables: Tables,
}

impl DocTransformer {
    /// Create a transformer. Fails when doctype checking is requested but
    /// the configuration names no root element.
    pub fn new(schema: Arc<Schema>, options: TransformOptions) -> Result<Self> {
        if options.check_doctype && schema.root_element.is_none() {
            return Err(Error::MissingRootElement);
        }
        Ok(Self {
            schema,
            options,
            namespaces: None,
            counters: KeyCounters::new(),
            tables: Tables::new(),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Namespace map in use, once a document has been parsed.
    pub fn namespaces(&self) -> Option<&NamespaceMap> {
        self.namespaces.as_ref()
    }

    /// Everything accumulated so far.
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Drain the accumulated tables. Key counters are kept.
    pub fn take_tables(&mut self) -> Tables {
        std::mem::take(&mut self.tables)
    }

    /// Transform one document and return the accumulated tables.
    ///
    /// On failure nothing of the document is kept. In tolerant mode the
    /// failure is logged and the tables are returned unchanged; otherwise
    /// the error is returned with the document's location attached.
    pub fn process_doc(&mut self, text: &str, filename: Option<&str>, line: Option<usize>) -> Result<&Tables> {
        match self.transform(text, filename) {
            Ok(()) => Ok(&self.tables),
            Err(e) => {
                let e = e.with_location(filename, line);
                debug!(document = %text, "Failed document");
                if self.options.continue_on_error && e.is_tolerable() {
                    warn!("{e}");
                    Ok(&self.tables)
                } else {
                    Err(e)
                }
            }
        }
    }

    fn transform(&mut self, text: &str, filename: Option<&str>) -> Result<()> {
        if self.options.check_doctype {
            let root = self.schema.root_element.as_deref().ok_or(Error::MissingRootElement)?;
            xmltab_xml::check_doctype(text, root).map_err(|e| match e {
                xmltab_xml::Error::WrongDoctype { declaration } => Error::WrongDoctype {
                    declaration,
                    context: DocumentContext::default(),
                },
                _ => Error::NoDoctype {
                    context: DocumentContext::default(),
                },
            })?;
        }

        let raw = match &self.options.preprocess {
            Some(preprocess) => Cow::Owned(preprocess(text)),
            None => Cow::Borrowed(text),
        };
        let parse_options = self.options.parse_options();
        let prepared = parse_options.prepare(&raw).map_err(malformed)?;
        let document = XmlDocument::parse(&prepared, &parse_options).map_err(malformed)?;

        let namespaces: &NamespaceMap = if self.options.refresh_namespaces {
            self.namespaces.insert(document.namespaces())
        } else {
            self.namespaces.get_or_insert_with(|| document.namespaces())
        };

        let root = document.root_element();
        let mut builder = EntityBuilder::new(namespaces, filename, self.counters.clone());
        for (path, node) in &self.schema.paths {
            builder
                .process_root_path(root, path, node)
                .map_err(|e| e.with_record_id(best_effort_record_id(&self.schema, root, namespaces)))?;
        }

        let (tables, counters) = builder.finish();
        debug!(records = record_count(&tables), "Transformed document");
        self.counters = counters;
        merge_tables(&mut self.tables, tables);
        Ok(())
    }
}

fn malformed(e: xmltab_xml::Error) -> Error {
    Error::MalformedDocument {
        message: e.to_string(),
        context: DocumentContext::default(),
    }
}

/// Primary key of the first configured entity, if it can be computed.
fn best_effort_record_id(schema: &Schema, root: XmlNode<'_, '_>, namespaces: &NamespaceMap) -> Option<String> {
    let (path, SchemaNode::Entity(entity)) = schema.paths.first()? else {
        return None;
    };
    let primary_key = entity.primary_key.as_ref()?;
    let element = *xmltab_xml::resolve(path, root, namespaces).ok()?.first()?;
    primary_key_text(element, primary_key, namespaces)
        .ok()
        .filter(|key| !key.is_empty())
}
