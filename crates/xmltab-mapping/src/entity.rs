//! Entity builder and record accumulation
//!
//! Each match of an entity path becomes one record in the entity's table.
//! The record gets an `id` (explicit primary key or a synthetic
//! `<parent key>_<sequence>`), a link to its parent, the source filename when
//! configured, and then every declared field resolved relative to the
//! matched element.

use std::collections::HashMap;

use tracing::{trace, warn};
use xmltab_schema::{EntityDescriptor, FieldKind, PrimaryKey, SchemaNode};
use xmltab_xml::{NamespaceMap, XmlNode};

use crate::extract;
use crate::record::{Record, Tables};
use crate::{DocumentContext, Error, Result};

/// Parent key used for synthetic ids of entities without a parent.
pub const NO_PARENT_KEY: &str = "None";

const ID_COLUMN: &str = "id";

/// Sequence counters for synthetic keys, scoped per (entity, parent key).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCounters {
    counters: HashMap<String, HashMap<String, usize>>,
}

impl KeyCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number for `entity` under `parent_key`.
    pub fn next(&mut self, entity: &str, parent_key: &str) -> usize {
        let counter = self
            .counters
            .entry(entity.to_string())
            .or_default()
            .entry(parent_key.to_string())
            .or_insert(0);
        let sequence = *counter;
        *counter += 1;
        sequence
    }
}

/// The enclosing entity instance of a nested entity or field.
#[derive(Debug, Clone, Copy)]
struct Parent<'p> {
    entity: &'p str,
    key: &'p str,
}

/// Builds records for one document.
///
/// Records accumulate in the builder's own tables and counters; the caller
/// takes them with [`EntityBuilder::finish`] once the whole document has
/// succeeded.
pub struct EntityBuilder<'s> {
    namespaces: &'s NamespaceMap,
    filename: Option<&'s str>,
    counters: KeyCounters,
    tables: Tables,
}

impl<'s> EntityBuilder<'s> {
    pub fn new(namespaces: &'s NamespaceMap, filename: Option<&'s str>, counters: KeyCounters) -> Self {
        Self {
            namespaces,
            filename,
            counters,
            tables: Tables::new(),
        }
    }

    /// Resolve a top-level configuration entry against the document element.
    pub fn process_root_path(&mut self, root: XmlNode<'_, '_>, path: &str, node: &SchemaNode) -> Result<()> {
        let mut discarded = Record::new();
        self.process_path(root, path, node, &mut discarded, None)
    }

    /// Records built so far and the advanced counters.
    pub fn finish(self) -> (Tables, KeyCounters) {
        (self.tables, self.counters)
    }

    fn process_path(
        &mut self,
        context: XmlNode<'_, '_>,
        path: &str,
        node: &SchemaNode,
        record: &mut Record,
        parent: Option<Parent<'_>>,
    ) -> Result<()> {
        let matches = xmltab_xml::resolve(path, context, self.namespaces).map_err(|e| {
            Error::InvalidSchemaNode {
                path: path.to_string(),
                description: e.to_string(),
                context: DocumentContext::default(),
            }
        })?;

        if matches.len() > 1 && !node.tolerates_multiple() {
            let found: Vec<String> = matches.iter().map(|m| format!("- {}", m.text())).collect();
            warn!(
                "Multiple elements found for {path}! Only the last will be kept! \
                 Should your config file include a joiner, or new entity definition?\n\n{}",
                found.join("\n")
            );
        }

        self.dispatch(path, node, &matches, record, parent)
    }

    fn dispatch(
        &mut self,
        path: &str,
        node: &SchemaNode,
        matches: &[XmlNode<'_, '_>],
        record: &mut Record,
        parent: Option<Parent<'_>>,
    ) -> Result<()> {
        match node {
            SchemaNode::FieldRef(column) => {
                extract::apply(record, column, &FieldKind::Plain, matches);
            }
            SchemaNode::Field(field) => {
                extract::apply(record, &field.fieldname, &field.kind, matches);
            }
            SchemaNode::Entity(entity) => self.build_entity(matches, entity, parent)?,
            SchemaNode::Alternatives(nodes) => {
                for found in matches {
                    for alternative in nodes {
                        self.dispatch(path, alternative, std::slice::from_ref(found), record, parent)?;
                    }
                }
            }
            SchemaNode::Invalid { description } => {
                if !matches.is_empty() {
                    return Err(Error::InvalidSchemaNode {
                        path: path.to_string(),
                        description: description.clone(),
                        context: DocumentContext::default(),
                    });
                }
            }
        }
        Ok(())
    }

    fn build_entity(
        &mut self,
        elements: &[XmlNode<'_, '_>],
        entity: &EntityDescriptor,
        parent: Option<Parent<'_>>,
    ) -> Result<()> {
        for element in elements {
            let id = match self.primary_key(*element, entity)? {
                Some(key) if !key.is_empty() => key,
                _ => {
                    let parent_key = parent.map_or(NO_PARENT_KEY, |p| p.key);
                    let sequence = self.counters.next(&entity.entity, parent_key);
                    format!("{parent_key}_{sequence}")
                }
            };
            trace!(entity = %entity.entity, id = %id, "Building record");

            let mut record = Record::new();
            record.insert(ID_COLUMN.to_string(), Some(id.clone()));
            if let Some(parent) = parent {
                record.insert(format!("{}_id", parent.entity), Some(parent.key.to_string()));
            }
            if let Some(filename_field) = &entity.filename_field {
                record.insert(filename_field.clone(), self.filename.map(str::to_string));
            }

            let this = Parent {
                entity: &entity.entity,
                key: &id,
            };
            for (path, node) in &entity.fields {
                self.process_path(*element, path, node, &mut record, Some(this))?;
            }

            self.tables.entry(entity.entity.clone()).or_default().push(record);
        }
        Ok(())
    }

    /// Explicit key of `element`: the normalized text of every key path,
    /// joined with `-`. Each path must match exactly one node.
    pub fn primary_key(&self, element: XmlNode<'_, '_>, entity: &EntityDescriptor) -> Result<Option<String>> {
        let Some(primary_key) = &entity.primary_key else {
            return Ok(None);
        };
        primary_key_text(element, primary_key, self.namespaces).map(Some)
    }
}

/// Compute an explicit primary key against `element`.
pub fn primary_key_text(
    element: XmlNode<'_, '_>,
    primary_key: &PrimaryKey,
    namespaces: &NamespaceMap,
) -> Result<String> {
    let mut parts = Vec::with_capacity(primary_key.components().len());
    for path in primary_key.components() {
        let matches = xmltab_xml::resolve(path, element, namespaces).map_err(|e| {
            Error::InvalidSchemaNode {
                path: path.clone(),
                description: e.to_string(),
                context: DocumentContext::default(),
            }
        })?;
        let [only] = matches.as_slice() else {
            return Err(Error::AmbiguousPrimaryKey {
                path: namespaces.qualify_path(path),
                found: matches.len(),
                context: DocumentContext::default(),
            });
        };
        parts.push(only.text());
    }
    Ok(parts.join("-"))
}
