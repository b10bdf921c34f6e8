//! Configuration loader
//!
//! Configurations are YAML documents (JSON being accepted through the same
//! value model). Nodes are classified into [`SchemaNode`] variants once, at
//! load time. Shapes that match no variant become [`SchemaNode::Invalid`]
//! instead of failing the load, so an unused malformed entry is harmless.

use std::collections::HashMap;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{debug, trace};

use crate::model::{EntityDescriptor, FieldDescriptor, FieldKind, PrimaryKey, Schema, SchemaNode};
use crate::{Error, Result};

const ROOT_ELEMENT: &str = "<root_element>";
const ENTITY: &str = "<entity>";
const FIELDS: &str = "<fields>";
const PRIMARY_KEY: &str = "<primary_key>";
const FILENAME_FIELD: &str = "<filename_field>";
const FIELDNAME: &str = "<fieldname>";
const JOINER: &str = "<joiner>";
const ENUM_MAP: &str = "<enum_map>";
const ENUM_TYPE: &str = "<enum_type>";

const ENTITY_KEYS: [&str; 4] = [ENTITY, FIELDS, PRIMARY_KEY, FILENAME_FIELD];
const FIELD_KEYS: [&str; 4] = [FIELDNAME, JOINER, ENUM_MAP, ENUM_TYPE];

impl Schema {
    /// Load a configuration from a file. `.json` files are read as JSON,
    /// anything else as YAML.
    pub fn from_file(path: &Path) -> Result<Self> {
        trace!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Load a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Parse(format!("YAML parse error: {e}")))?;
        Self::from_value(&value)
    }

    /// Load a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| Error::Parse(format!("JSON parse error: {e}")))?;
        Self::from_value(&value)
    }

    /// Build the model from an already parsed value.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Mapping(top) = value else {
            return Err(Error::InvalidFormat(
                "configuration must be a mapping of paths to field or entity definitions"
                    .to_string(),
            ));
        };

        let mut schema = Schema::default();
        for (key, node) in top {
            let key = scalar(key).ok_or_else(|| {
                Error::InvalidFormat(format!("configuration keys must be strings, found {}", describe(key)))
            })?;

            if key == ROOT_ELEMENT {
                let root = scalar(node).ok_or_else(|| {
                    Error::InvalidFormat(format!("{ROOT_ELEMENT} must be an element name"))
                })?;
                schema.root_element = Some(root);
                continue;
            }
            if key.starts_with('<') {
                debug!(key, "Skipping unrecognized top-level directive");
                continue;
            }

            schema.paths.push((key, classify(node)));
        }

        debug!(
            paths = schema.paths.len(),
            root_element = ?schema.root_element,
            "Loaded configuration"
        );
        Ok(schema)
    }
}

/// Classify one configuration node.
pub fn classify(value: &Value) -> SchemaNode {
    match value {
        Value::String(name) => SchemaNode::FieldRef(name.clone()),
        Value::Sequence(nodes) => SchemaNode::Alternatives(nodes.iter().map(classify).collect()),
        Value::Mapping(map) if map.contains_key(ENTITY) => entity(map).unwrap_or_else(|| invalid(value)),
        Value::Mapping(map) if map.contains_key(FIELDNAME) => field(map).unwrap_or_else(|| invalid(value)),
        _ => invalid(value),
    }
}

fn entity(map: &Mapping) -> Option<SchemaNode> {
    if !only_keys(map, &ENTITY_KEYS) {
        return None;
    }

    let entity = map.get(ENTITY).and_then(scalar).filter(|name| !name.is_empty())?;

    let Some(Value::Mapping(raw_fields)) = map.get(FIELDS) else {
        return None;
    };
    if raw_fields.is_empty() {
        return None;
    }
    let mut fields = Vec::with_capacity(raw_fields.len());
    for (path, node) in raw_fields {
        let path = scalar(path).filter(|p| !p.is_empty() && !p.starts_with('<'))?;
        fields.push((path, classify(node)));
    }

    let primary_key = match map.get(PRIMARY_KEY) {
        None => None,
        Some(Value::String(path)) => Some(PrimaryKey::Single(path.clone())),
        Some(Value::Sequence(paths)) if !paths.is_empty() => Some(PrimaryKey::Composite(
            paths.iter().map(scalar).collect::<Option<Vec<_>>>()?,
        )),
        Some(_) => return None,
    };

    let filename_field = match map.get(FILENAME_FIELD) {
        None => None,
        Some(value) => Some(scalar(value)?),
    };

    Some(SchemaNode::Entity(EntityDescriptor {
        entity,
        fields,
        primary_key,
        filename_field,
    }))
}

fn field(map: &Mapping) -> Option<SchemaNode> {
    if !only_keys(map, &FIELD_KEYS) {
        return None;
    }

    let fieldname = map.get(FIELDNAME).and_then(scalar).filter(|name| !name.is_empty())?;

    let kind = match (map.get(JOINER), map.get(ENUM_MAP), map.get(ENUM_TYPE)) {
        (None, None, None) => FieldKind::Plain,
        (Some(joiner), None, None) => FieldKind::Joiner(scalar(joiner)?),
        (None, Some(Value::Mapping(table)), None) => FieldKind::EnumMap(enum_table(table)?),
        (None, None, Some(constant)) => FieldKind::EnumType(scalar(constant)?),
        _ => return None,
    };

    Some(SchemaNode::Field(FieldDescriptor { fieldname, kind }))
}

fn enum_table(table: &Mapping) -> Option<HashMap<String, String>> {
    let mut lookup = HashMap::with_capacity(table.len());
    for (key, value) in table {
        if value.is_null() {
            continue;
        }
        lookup.insert(scalar(key)?, scalar(value)?);
    }
    Some(lookup)
}

fn only_keys(map: &Mapping, allowed: &[&str]) -> bool {
    map.keys()
        .all(|key| key.as_str().is_some_and(|k| allowed.contains(&k)))
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn invalid(value: &Value) -> SchemaNode {
    SchemaNode::Invalid {
        description: describe(value),
    }
}

fn describe(value: &Value) -> String {
    serde_yaml::to_string(value)
        .map(|yaml| yaml.trim_end().to_string())
        .unwrap_or_else(|_| format!("{value:?}"))
}
