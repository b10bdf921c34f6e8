//! Schema model definitions

use std::collections::HashMap;

/// A loaded mapping configuration
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Expected document element, from `<root_element>`
    pub root_element: Option<String>,
    /// Top-level path entries in declaration order
    pub paths: Vec<(String, SchemaNode)>,
}

/// One node of the configuration tree, keyed by a path in its parent
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Bare column name
    FieldRef(String),
    /// `<fieldname>` with an optional joiner / enum handling
    Field(FieldDescriptor),
    /// `<entity>`: a nested table definition
    Entity(EntityDescriptor),
    /// Several nodes sharing one path, applied in order
    Alternatives(Vec<SchemaNode>),
    /// Shape not recognized; reported only when a match reaches it
    Invalid { description: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub fieldname: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Plain,
    Joiner(String),
    EnumMap(HashMap<String, String>),
    EnumType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub entity: String,
    pub fields: Vec<(String, SchemaNode)>,
    pub primary_key: Option<PrimaryKey>,
    pub filename_field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// Key component paths in declared order.
    pub fn components(&self) -> &[String] {
        match self {
            PrimaryKey::Single(path) => std::slice::from_ref(path),
            PrimaryKey::Composite(paths) => paths,
        }
    }
}

impl SchemaNode {
    /// Whether several matches for this node are expected. Entities, joiners
    /// and enum descriptors consume every match; other nodes keep only the
    /// last one. A list of alternatives is never exempt, whatever it holds.
    pub fn tolerates_multiple(&self) -> bool {
        match self {
            SchemaNode::Entity(_) => true,
            SchemaNode::Field(field) => !matches!(field.kind, FieldKind::Plain),
            SchemaNode::Alternatives(_) | SchemaNode::FieldRef(_) | SchemaNode::Invalid { .. } => false,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, SchemaNode::Invalid { .. })
    }
}

impl Schema {
    /// Top-level entry for `path`, if declared.
    pub fn get(&self, path: &str) -> Option<&SchemaNode> {
        self.paths.iter().find(|(p, _)| p == path).map(|(_, node)| node)
    }
}
