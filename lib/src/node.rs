//! The immutable term model shared by engines, graphs and resources.

use crate::consts::{XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER};
use crate::errors::GraphError;
use anyhow::Result;
use oxigraph::model::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// An RDF term. Equality is structural and never holds across variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Uri(String),
    Literal(Literal),
    Blank(String),
}

/// A `(subject, predicate, object)` statement as returned by an engine.
pub type NodeTriple = (Node, Node, Node);

/// One row of a SPARQL SELECT result.
pub type NodeBindings = BTreeMap<String, Node>;

impl Node {
    pub fn uri(uri: impl Into<String>) -> Self {
        Node::Uri(uri.into())
    }

    pub fn literal(value: impl Into<Literal>) -> Self {
        Node::Literal(value.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Node::Blank(id.into())
    }

    pub fn is_uri(&self) -> bool {
        matches!(self, Node::Uri(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }

    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Node::Uri(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// The URI for URI nodes, the lexical form for literals, nothing for blank nodes.
    pub fn value(&self) -> Option<&str> {
        match self {
            Node::Uri(u) => Some(u),
            Node::Literal(l) => Some(l.value()),
            Node::Blank(_) => None,
        }
    }

    /// The literal's value read as a number, if it is one.
    pub fn numeric_value(&self) -> Option<f64> {
        self.as_literal()
            .and_then(|l| l.value().trim().parse::<f64>().ok())
    }

    /// Renders the node as a SPARQL term. Blank node labels are local to the
    /// store they came from and have no query form. URIs must be valid IRIs.
    pub fn to_sparql(&self) -> Result<Option<String>> {
        Ok(match self {
            Node::Uri(_) => Some(self.to_named_node()?.to_string()),
            Node::Literal(l) => Some(l.to_string()),
            Node::Blank(_) => None,
        })
    }

    pub fn to_term(&self) -> Result<Term> {
        Ok(match self {
            Node::Uri(u) => Term::NamedNode(NamedNode::new(u.as_str()).map_err(|e| {
                GraphError::resolution(format!("<{u}> ({e})"), "an IRI")
            })?),
            Node::Blank(id) => Term::BlankNode(
                BlankNode::new(id.as_str())
                    .map_err(|e| GraphError::resolution(format!("_:{id} ({e})"), "a blank node"))?,
            ),
            Node::Literal(l) => Term::Literal(l.clone()),
        })
    }

    pub fn to_named_node(&self) -> Result<NamedNode> {
        match self.to_term()? {
            Term::NamedNode(n) => Ok(n),
            _ => Err(GraphError::resolution(self, "a predicate").into()),
        }
    }

    pub fn to_subject(&self) -> Result<NamedOrBlankNode> {
        match self.to_term()? {
            Term::NamedNode(n) => Ok(n.into()),
            Term::BlankNode(b) => Ok(b.into()),
            _ => Err(GraphError::resolution(self, "a subject").into()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Node::Blank(_) => 0,
            Node::Uri(_) => 1,
            Node::Literal(_) => 2,
        }
    }
}

impl From<Term> for Node {
    fn from(term: Term) -> Self {
        match term {
            Term::NamedNode(n) => Node::Uri(n.into_string()),
            Term::BlankNode(b) => Node::Blank(b.into_string()),
            Term::Literal(l) => Node::Literal(l),
            #[allow(unreachable_patterns)]
            other => Node::Literal(Literal::new_simple_literal(other.to_string())),
        }
    }
}

impl From<NamedOrBlankNode> for Node {
    fn from(node: NamedOrBlankNode) -> Self {
        match node {
            NamedOrBlankNode::NamedNode(n) => Node::Uri(n.into_string()),
            NamedOrBlankNode::BlankNode(b) => Node::Blank(b.into_string()),
        }
    }
}

impl From<NamedNode> for Node {
    fn from(node: NamedNode) -> Self {
        Node::Uri(node.into_string())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Uri(u) => write!(f, "{u}"),
            Node::Literal(l) => write!(f, "{}", l.value()),
            Node::Blank(id) => write!(f, "_:{id}"),
        }
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Variant first; numeric literals compare by value, everything else by its
// lexical form, with the full literal syntax as the tie breaker.
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Node::Literal(a), Node::Literal(b)) => {
                let by_number = match (self.numeric_value(), other.numeric_value()) {
                    (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                    _ => Ordering::Equal,
                };
                by_number
                    .then_with(|| a.value().cmp(b.value()))
                    .then_with(|| a.to_string().cmp(&b.to_string()))
            }
            (Node::Uri(a), Node::Uri(b)) => a.cmp(b),
            (Node::Blank(a), Node::Blank(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

pub fn integer_literal(value: i64) -> Literal {
    Literal::new_typed_literal(value.to_string(), XSD_INTEGER)
}

pub fn double_literal(value: f64) -> Literal {
    Literal::new_typed_literal(value.to_string(), XSD_DOUBLE)
}

pub fn boolean_literal(value: bool) -> Literal {
    Literal::new_typed_literal(value.to_string(), XSD_BOOLEAN)
}

/// A term position in a pattern or mutation. Strings are read as URIs or
/// `prefix:local` names; use [`Node::literal`] for string literals.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeArg {
    /// Wildcard: matches anything.
    #[default]
    Any,
    Name(String),
    Node(Node),
}

impl NodeArg {
    pub fn is_any(&self) -> bool {
        matches!(self, NodeArg::Any)
    }
}

impl From<&str> for NodeArg {
    fn from(name: &str) -> Self {
        NodeArg::Name(name.to_string())
    }
}

impl From<String> for NodeArg {
    fn from(name: String) -> Self {
        NodeArg::Name(name)
    }
}

impl From<&String> for NodeArg {
    fn from(name: &String) -> Self {
        NodeArg::Name(name.clone())
    }
}

impl From<Node> for NodeArg {
    fn from(node: Node) -> Self {
        NodeArg::Node(node)
    }
}

impl From<&Node> for NodeArg {
    fn from(node: &Node) -> Self {
        NodeArg::Node(node.clone())
    }
}

impl From<Literal> for NodeArg {
    fn from(literal: Literal) -> Self {
        NodeArg::Node(Node::Literal(literal))
    }
}

impl From<i64> for NodeArg {
    fn from(value: i64) -> Self {
        NodeArg::Node(Node::Literal(integer_literal(value)))
    }
}

impl From<i32> for NodeArg {
    fn from(value: i32) -> Self {
        NodeArg::Node(Node::Literal(integer_literal(value.into())))
    }
}

impl From<f64> for NodeArg {
    fn from(value: f64) -> Self {
        NodeArg::Node(Node::Literal(double_literal(value)))
    }
}

impl From<bool> for NodeArg {
    fn from(value: bool) -> Self {
        NodeArg::Node(Node::Literal(boolean_literal(value)))
    }
}

impl<T: Into<NodeArg>> From<Option<T>> for NodeArg {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(NodeArg::Any)
    }
}
