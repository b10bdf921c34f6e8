//! Path parsing and resolution
//!
//! Paths are a subset of XPath 1.0 location paths:
//!
//! - steps separated by `/`, `//` for descendant-or-self, a leading `/` for
//!   the document root
//! - element name tests (`title`, `dc:title`, `*`, `dc:*`), `@attr`, `@*`,
//!   `text()`, `node()`, `.` and `..`
//! - predicates: `[2]`, `[last()]`, `[@lang]`, `[@lang='en']`, `[name]`,
//!   `[name='x']`
//!
//! Unprefixed element names resolve to the document's default namespace when
//! the namespace map declares one. An undeclared prefix never matches.

use tracing::debug;

use crate::namespace::NamespaceMap;
use crate::node::XmlNode;
use crate::{Error, Result};

/// A compiled path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Attribute,
    SelfNode,
    Parent,
    DescendantOrSelf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(NameTest),
    Text,
    AnyNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NameTest {
    Any,
    AnyInNamespace(String),
    Qualified {
        namespace: Option<String>,
        local: String,
    },
    /// Prefix not declared in the document
    Unresolvable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    Exists(Path),
    Equals(Path, String),
}

/// Resolve `path` against `context`.
///
/// The path is first qualified with the default-namespace alias (see
/// [`NamespaceMap::qualify_path`]). If it then equals the context element's
/// own tag, the context itself is the single match; this lets a schema entry
/// describe the document element directly. Otherwise the path is evaluated
/// relative to the context and matches are returned in document order.
pub fn resolve<'a, 'input>(
    path: &str,
    context: XmlNode<'a, 'input>,
    namespaces: &NamespaceMap,
) -> Result<Vec<XmlNode<'a, 'input>>> {
    let qualified = namespaces.qualify_path(path);

    if let Some(element) = context.as_node().filter(roxmltree::Node::is_element) {
        if qualified == namespaces.qualified_tag(element) {
            return Ok(vec![context]);
        }
    }

    Ok(Path::parse(&qualified, namespaces)?.evaluate(context))
}

impl Path {
    /// Compile `source` against the namespace declarations in `namespaces`.
    pub fn parse(source: &str, namespaces: &NamespaceMap) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_path(source, "path is empty"));
        }

        let (absolute, raw_steps) = split_steps(trimmed)?;
        let mut steps = Vec::with_capacity(raw_steps.len());
        for (descendant, raw) in raw_steps {
            if descendant {
                steps.push(Step {
                    axis: Axis::DescendantOrSelf,
                    test: NodeTest::AnyNode,
                    predicates: Vec::new(),
                });
            }
            steps.push(parse_step(source, &raw, namespaces)?);
        }

        Ok(Self {
            source: source.to_string(),
            absolute,
            steps,
        })
    }

    /// The path text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against `context`, returning matches in document order
    /// without duplicates.
    pub fn evaluate<'a, 'input>(&self, context: XmlNode<'a, 'input>) -> Vec<XmlNode<'a, 'input>> {
        let mut current = if self.absolute {
            match context {
                XmlNode::Node(n) => vec![XmlNode::node(n.document().root())],
                XmlNode::Attribute { parent, .. } => {
                    vec![XmlNode::node(parent.document().root())]
                }
            }
        } else {
            vec![context]
        };

        for step in &self.steps {
            let mut next = Vec::new();
            for node in &current {
                next.extend(step.apply(*node));
            }
            next.sort_by_key(XmlNode::document_order);
            next.dedup_by_key(|node| node.document_order());
            current = next;

            if current.is_empty() {
                break;
            }
        }

        current
    }
}

impl Step {
    fn apply<'a, 'input>(&self, context: XmlNode<'a, 'input>) -> Vec<XmlNode<'a, 'input>> {
        let mut candidates = self.candidates(context);
        for predicate in &self.predicates {
            candidates = predicate.filter(candidates);
        }
        candidates
    }

    fn candidates<'a, 'input>(&self, context: XmlNode<'a, 'input>) -> Vec<XmlNode<'a, 'input>> {
        match (self.axis, context) {
            (Axis::SelfNode, _) => vec![context],
            (Axis::Parent, XmlNode::Node(n)) => n.parent().map(XmlNode::node).into_iter().collect(),
            (Axis::Parent, XmlNode::Attribute { parent, .. }) => vec![XmlNode::node(parent)],
            (Axis::DescendantOrSelf, XmlNode::Node(n)) => n.descendants().map(XmlNode::node).collect(),
            (Axis::DescendantOrSelf, XmlNode::Attribute { .. }) => vec![context],
            (Axis::Child, XmlNode::Node(n)) => n
                .children()
                .filter(|child| self.test.matches_node(*child))
                .map(XmlNode::node)
                .collect(),
            (Axis::Attribute, XmlNode::Node(n)) if n.is_element() => n
                .attributes()
                .enumerate()
                .filter(|(_, attr)| self.test.matches_attribute(attr))
                .map(|(index, attr)| XmlNode::Attribute {
                    attr,
                    parent: n,
                    index,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl NodeTest {
    fn matches_node(&self, node: roxmltree::Node<'_, '_>) -> bool {
        match self {
            NodeTest::Text => node.is_text(),
            NodeTest::AnyNode => node.is_element() || node.is_text(),
            NodeTest::Name(name) => node.is_element() && name.matches(node.tag_name().namespace(), node.tag_name().name()),
        }
    }

    fn matches_attribute(&self, attr: &roxmltree::Attribute<'_, '_>) -> bool {
        match self {
            NodeTest::Name(name) => name.matches(attr.namespace(), attr.name()),
            NodeTest::AnyNode => true,
            NodeTest::Text => false,
        }
    }
}

impl NameTest {
    fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        match self {
            NameTest::Any => true,
            NameTest::AnyInNamespace(uri) => namespace == Some(uri.as_str()),
            NameTest::Qualified {
                namespace: expected,
                local: expected_local,
            } => expected_local == local && expected.as_deref() == namespace,
            NameTest::Unresolvable => false,
        }
    }
}

impl Predicate {
    fn filter<'a, 'input>(&self, candidates: Vec<XmlNode<'a, 'input>>) -> Vec<XmlNode<'a, 'input>> {
        match self {
            Predicate::Position(position) => candidates.into_iter().nth(position - 1).into_iter().collect(),
            Predicate::Last => candidates.into_iter().last().into_iter().collect(),
            Predicate::Exists(path) => candidates
                .into_iter()
                .filter(|node| !path.evaluate(*node).is_empty())
                .collect(),
            Predicate::Equals(path, literal) => candidates
                .into_iter()
                .filter(|node| {
                    path.evaluate(*node)
                        .iter()
                        .any(|found| found.string_value() == *literal)
                })
                .collect(),
        }
    }
}

fn split_steps(path: &str) -> Result<(bool, Vec<(bool, String)>)> {
    let mut absolute = false;
    let mut descendant = false;
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (i, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), _) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '[') => {
                depth += 1;
                current.push(c);
            }
            (None, ']') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::invalid_path(path, "unbalanced ']'"))?;
                current.push(c);
            }
            (None, '/') if depth == 0 => {
                if !current.is_empty() {
                    steps.push((descendant, std::mem::take(&mut current)));
                    descendant = false;
                } else if i == 0 {
                    absolute = true;
                } else if descendant {
                    return Err(Error::invalid_path(path, "too many consecutive '/'"));
                } else {
                    descendant = true;
                }
            }
            (None, _) => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(Error::invalid_path(path, "unterminated string literal"));
    }
    if depth != 0 {
        return Err(Error::invalid_path(path, "unbalanced '['"));
    }

    if current.is_empty() {
        if !(absolute && steps.is_empty() && !descendant) {
            return Err(Error::invalid_path(path, "path ends with '/'"));
        }
    } else {
        steps.push((descendant, current));
    }

    Ok((absolute, steps))
}

fn parse_step(path: &str, raw: &str, namespaces: &NamespaceMap) -> Result<Step> {
    let raw = raw.trim();
    match raw {
        "." => {
            return Ok(Step {
                axis: Axis::SelfNode,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        ".." => {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        _ => {}
    }

    if raw.contains("::") {
        return Err(Error::invalid_path(path, format!("explicit axes are not supported: '{raw}'")));
    }

    let (head, predicate_sources) = split_predicates(path, raw)?;
    let predicates = predicate_sources
        .iter()
        .map(|source| parse_predicate(path, source, namespaces))
        .collect::<Result<Vec<_>>>()?;

    let (axis, test) = if let Some(name) = head.strip_prefix('@') {
        (Axis::Attribute, NodeTest::Name(parse_name_test(path, name, namespaces, false)?))
    } else if head == "text()" {
        (Axis::Child, NodeTest::Text)
    } else if head == "node()" {
        (Axis::Child, NodeTest::AnyNode)
    } else {
        (Axis::Child, NodeTest::Name(parse_name_test(path, head, namespaces, true)?))
    };

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

fn parse_name_test(path: &str, name: &str, namespaces: &NamespaceMap, element: bool) -> Result<NameTest> {
    if name.is_empty() {
        return Err(Error::invalid_path(path, "empty name test"));
    }
    if name == "*" {
        return Ok(NameTest::Any);
    }
    if name.contains(['(', ')', '=', ' ', '\'', '"']) {
        return Err(Error::invalid_path(path, format!("unsupported step '{name}'")));
    }

    match name.split_once(':') {
        Some((prefix, local)) => {
            let Some(uri) = namespaces.uri(prefix) else {
                debug!(path, prefix, "Namespace prefix is not declared; step never matches");
                return Ok(NameTest::Unresolvable);
            };
            if local == "*" {
                Ok(NameTest::AnyInNamespace(uri.to_string()))
            } else {
                Ok(NameTest::Qualified {
                    namespace: Some(uri.to_string()),
                    local: local.to_string(),
                })
            }
        }
        None => Ok(NameTest::Qualified {
            namespace: if element {
                namespaces.default_namespace().map(str::to_string)
            } else {
                None
            },
            local: name.to_string(),
        }),
    }
}

fn split_predicates<'s>(path: &str, raw: &'s str) -> Result<(&'s str, Vec<&'s str>)> {
    let Some(start) = raw.find('[') else {
        return Ok((raw, Vec::new()));
    };

    let head = &raw[..start];
    let mut predicates = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut open = start;

    for (i, c) in raw.char_indices().skip_while(|(i, _)| *i < start) {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => {
                if depth == 0 {
                    open = i;
                }
                depth += 1;
            }
            (None, ']') => {
                depth -= 1;
                if depth == 0 {
                    predicates.push(&raw[open + 1..i]);
                }
            }
            (None, _) if depth == 0 => {
                return Err(Error::invalid_path(path, format!("unexpected text after predicate in '{raw}'")));
            }
            (None, _) => {}
        }
    }

    Ok((head, predicates))
}

fn parse_predicate(path: &str, source: &str, namespaces: &NamespaceMap) -> Result<Predicate> {
    let expr = source.trim();
    if expr.is_empty() {
        return Err(Error::invalid_path(path, "empty predicate"));
    }
    if expr == "last()" {
        return Ok(Predicate::Last);
    }
    if let Ok(position) = expr.parse::<usize>() {
        if position == 0 {
            return Err(Error::invalid_path(path, "positions start at 1"));
        }
        return Ok(Predicate::Position(position));
    }

    match find_top_level_equals(expr) {
        Some(split) => {
            let lhs = expr[..split].trim();
            let rhs = expr[split + 1..].trim();
            let literal = unquote(rhs);
            Ok(Predicate::Equals(Path::parse(lhs, namespaces)?, literal.to_string()))
        }
        None => Ok(Predicate::Exists(Path::parse(expr, namespaces)?)),
    }
}

fn find_top_level_equals(expr: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in expr.char_indices() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '=') if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn unquote(value: &str) -> &str {
    for q in ['\'', '"'] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            return inner;
        }
    }
    value
}
