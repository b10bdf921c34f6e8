//! Namespace map derived from a document's root element

use std::collections::{BTreeMap, HashMap};

/// Alias under which the default (unprefixed) namespace is registered.
pub const DEFAULT_NAMESPACE_ALIAS: &str = "_";

const XML_NAMESPACE_PREFIX: &str = "xml";

/// URI the `xml` prefix is always bound to.
pub const XML_NAMESPACE_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix -> URI map read from the root element's in-scope declarations,
/// plus its inverse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    by_prefix: BTreeMap<String, String>,
    by_uri: HashMap<String, String>,
}

impl NamespaceMap {
    /// An empty map (document without namespace declarations).
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the in-scope namespace declarations of `element`.
    pub fn from_element(element: roxmltree::Node<'_, '_>) -> Self {
        let mut map = Self::new();
        for ns in element.namespaces() {
            match ns.name() {
                Some(XML_NAMESPACE_PREFIX) => {}
                Some(prefix) => map.insert(prefix, ns.uri()),
                None => map.insert(DEFAULT_NAMESPACE_ALIAS, ns.uri()),
            }
        }
        map
    }

    /// Register a prefix. A URI bound to several prefixes maps back to the
    /// last one registered.
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let prefix = prefix.into();
        let uri = uri.into();
        self.by_uri.insert(uri.clone(), prefix.clone());
        self.by_prefix.insert(prefix, uri);
    }

    /// URI bound to `prefix`. The `xml` prefix is implicitly bound and is
    /// resolved without being stored.
    pub fn uri(&self, prefix: &str) -> Option<&str> {
        match self.by_prefix.get(prefix) {
            Some(uri) => Some(uri.as_str()),
            None if prefix == XML_NAMESPACE_PREFIX => Some(XML_NAMESPACE_URI),
            None => None,
        }
    }

    /// Prefix bound to `uri`.
    pub fn prefix(&self, uri: &str) -> Option<&str> {
        self.by_uri.get(uri).map(String::as_str)
    }

    /// URI of the default namespace, if the document declared one.
    pub fn default_namespace(&self) -> Option<&str> {
        self.uri(DEFAULT_NAMESPACE_ALIAS)
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }

    /// Rewrite a path so that every bare element step carries the default
    /// namespace alias (`title` -> `_:title`). Steps that already have a
    /// prefix, attribute steps, predicates and abbreviated steps are left
    /// alone. Without a default namespace the path is returned unchanged.
    pub fn qualify_path(&self, path: &str) -> String {
        if self.default_namespace().is_none() {
            return path.to_string();
        }

        path.split('/')
            .map(|step| {
                if needs_default_prefix(step) {
                    format!("{DEFAULT_NAMESPACE_ALIAS}:{step}")
                } else {
                    step.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Render an element's tag the way schema paths spell it: `prefix:local`
    /// for namespaced elements, the bare local name otherwise. A namespace
    /// not declared on the root element renders in `{uri}local` form, which
    /// no schema path can equal.
    pub fn qualified_tag(&self, element: roxmltree::Node<'_, '_>) -> String {
        let tag = element.tag_name();
        match tag.namespace() {
            Some(uri) => match self.prefix(uri) {
                Some(prefix) => format!("{prefix}:{}", tag.name()),
                None => format!("{{{uri}}}{}", tag.name()),
            },
            None => tag.name().to_string(),
        }
    }
}

fn needs_default_prefix(step: &str) -> bool {
    let Some(first) = step.chars().next() else {
        return false;
    };
    if matches!(first, '@' | '[' | '.' | '*') {
        return false;
    }
    let name_end = step.find('[').unwrap_or(step.len());
    let name = &step[..name_end];
    !name.contains(':') && !name.ends_with("()")
}
