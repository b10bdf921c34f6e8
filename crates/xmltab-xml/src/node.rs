//! Node types returned by path resolution

use std::fmt::{Debug, Formatter};

/// A matched node: an element (or text node) of the tree, or an attribute
/// value attached to its owning element.
///
/// `roxmltree` keeps attributes out of the node tree, while paths treat
/// `@name` steps like any other step. This enum unifies the two.
#[derive(Clone, Copy)]
pub enum XmlNode<'a, 'input> {
    /// Element, text or document node
    Node(roxmltree::Node<'a, 'input>),

    /// Attribute pseudo-node
    Attribute {
        attr: roxmltree::Attribute<'a, 'input>,
        parent: roxmltree::Node<'a, 'input>,
        index: usize,
    },
}

impl Debug for XmlNode<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            XmlNode::Node(n) => n.fmt(f),
            XmlNode::Attribute { attr, .. } => attr.fmt(f),
        }
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.document_order() == other.document_order()
    }
}

impl Eq for XmlNode<'_, '_> {}

impl<'a, 'input> XmlNode<'a, 'input> {
    /// Wrap a tree node.
    pub fn node(node: roxmltree::Node<'a, 'input>) -> Self {
        XmlNode::Node(node)
    }

    /// Key that sorts matches in document order. Attributes sort right
    /// after their owning element, in declaration order.
    pub fn document_order(&self) -> (usize, usize) {
        match self {
            XmlNode::Node(n) => (n.id().get_usize(), 0),
            XmlNode::Attribute { parent, index, .. } => (parent.id().get_usize(), index + 1),
        }
    }

    /// The underlying tree node for element/text matches.
    pub fn as_node(&self) -> Option<roxmltree::Node<'a, 'input>> {
        match self {
            XmlNode::Node(n) => Some(*n),
            XmlNode::Attribute { .. } => None,
        }
    }

    /// Whether this is an element node.
    pub fn is_element(&self) -> bool {
        matches!(self, XmlNode::Node(n) if n.is_element())
    }

    /// Raw string value: attribute value, text content, or the concatenated
    /// descendant text of an element.
    pub fn string_value(&self) -> String {
        match self {
            XmlNode::Attribute { attr, .. } => attr.value().to_string(),
            XmlNode::Node(n) if n.is_text() => n.text().unwrap_or_default().to_string(),
            XmlNode::Node(n) => n
                .descendants()
                .filter(roxmltree::Node::is_text)
                .filter_map(|child| child.text())
                .collect(),
        }
    }

    /// Whitespace-normalized text of this node.
    pub fn text(&self) -> String {
        normalize_text(&self.string_value())
    }
}

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
