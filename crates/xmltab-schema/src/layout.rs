//! Output table layouts
//!
//! Persistence needs every table's columns before the first record arrives.
//! Columns are listed in first-declaration order across the whole
//! configuration; several paths feeding the same entity merge into one
//! layout.

use crate::model::{Schema, SchemaNode};
use crate::{Error, Result};

/// Name of the synthetic or explicit key column.
pub const ID_COLUMN: &str = "id";

/// Columns of one output table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_key: Option<String>,
}

impl TableLayout {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: None,
        }
    }

    fn merge(&mut self, columns: Vec<String>) {
        for column in columns {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
        if self.columns.iter().any(|c| c == ID_COLUMN) {
            self.primary_key = Some(ID_COLUMN.to_string());
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

impl Schema {
    /// Derive one layout per entity, in order of first appearance.
    ///
    /// Every reachable node must be well-formed here, since a column list
    /// cannot be derived from an invalid node.
    pub fn table_layouts(&self) -> Result<Vec<TableLayout>> {
        let mut layouts = Vec::new();
        for (path, node) in &self.paths {
            let mut discarded = Vec::new();
            collect(path, node, None, &mut discarded, &mut layouts)?;
        }
        Ok(layouts)
    }

    /// Layout for `table`, if the configuration defines it.
    pub fn table_layout(&self, table: &str) -> Result<Option<TableLayout>> {
        Ok(self.table_layouts()?.into_iter().find(|layout| layout.name == table))
    }
}

fn collect(
    path: &str,
    node: &SchemaNode,
    parent: Option<&str>,
    columns: &mut Vec<String>,
    layouts: &mut Vec<TableLayout>,
) -> Result<()> {
    match node {
        SchemaNode::FieldRef(name) => columns.push(name.clone()),
        SchemaNode::Field(field) => columns.push(field.fieldname.clone()),
        SchemaNode::Alternatives(nodes) => {
            for node in nodes {
                collect(path, node, parent, columns, layouts)?;
            }
        }
        SchemaNode::Entity(entity) => {
            let mut own = Vec::new();
            if entity.primary_key.is_some() || parent.is_some() {
                own.push(ID_COLUMN.to_string());
            }
            if let Some(parent) = parent {
                own.push(format!("{parent}_id"));
            }
            if let Some(filename_field) = &entity.filename_field {
                own.push(filename_field.clone());
            }
            for (child_path, child) in &entity.fields {
                collect(child_path, child, Some(&entity.entity), &mut own, layouts)?;
            }

            match layouts.iter_mut().position(|l| l.name == entity.entity) {
                Some(index) => layouts[index].merge(own),
                None => {
                    let mut layout = TableLayout::new(&entity.entity);
                    layout.merge(own);
                    layouts.push(layout);
                }
            }
        }
        SchemaNode::Invalid { description } => {
            return Err(Error::InvalidNode {
                path: path.to_string(),
                description: description.clone(),
            });
        }
    }
    Ok(())
}
