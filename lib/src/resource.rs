//! Graph-bound handles onto RDF terms, and the result lists built from them.

use crate::consts::{SAME_AS, TYPE};
use crate::errors::GraphError;
use crate::graph::{self, GraphView, IntoUris};
use crate::node::{boolean_literal, double_literal, integer_literal, Node, NodeArg, NodeBindings};
use crate::options::{AliasLookup, LoadOptions};
use crate::reiterable::{Iter, Reiterable};
use anyhow::Result;
use log::debug;
use oxigraph::model::Literal;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A [`Node`] bound to the graph it was read from.
///
/// Equality, ordering and hashing look at the node only. The `owl:sameAs`
/// aliases collected by [`Resource::load_same_as`] are kept on the side and
/// consulted by property lookups; clones share that alias list.
#[derive(Clone)]
pub struct Resource<'g> {
    graph: &'g dyn GraphView,
    node: Node,
    same_as: Rc<RefCell<Vec<Resource<'g>>>>,
}

impl<'g> Resource<'g> {
    pub fn new(graph: &'g dyn GraphView, node: Node) -> Self {
        Self {
            graph,
            node,
            same_as: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub fn graph(&self) -> &'g dyn GraphView {
        self.graph
    }

    pub fn is_uri(&self) -> bool {
        self.node.is_uri()
    }

    pub fn is_literal(&self) -> bool {
        self.node.is_literal()
    }

    pub fn is_blank(&self) -> bool {
        self.node.is_blank()
    }

    pub fn uri(&self) -> Option<&str> {
        self.node.as_uri()
    }

    /// The URI, or a literal's lexical form. Blank nodes have no value.
    pub fn value(&self) -> Option<&str> {
        self.node.value()
    }

    /// Aliases found so far, in discovery order.
    pub fn same_as(&self) -> Vec<Resource<'g>> {
        self.same_as.borrow().clone()
    }

    /// This resource followed by its aliases.
    pub fn identities(&self) -> Vec<Resource<'g>> {
        let mut all = vec![self.clone()];
        all.extend(self.same_as.borrow().iter().cloned());
        all
    }

    fn lookup_nodes(&self, aliases: AliasLookup) -> Vec<Node> {
        match aliases {
            AliasLookup::Include => self.identities().into_iter().map(Resource::into_node).collect(),
            AliasLookup::Direct => vec![self.node.clone()],
        }
    }

    /// First value of `prop`. A leading `-` follows the property backwards.
    pub fn get(&self, prop: &str) -> Result<Option<Resource<'g>>> {
        Ok(self.all(prop)?.first())
    }

    pub fn get_with(&self, prop: &str, aliases: AliasLookup) -> Result<Option<Resource<'g>>> {
        Ok(self.all_with(prop, aliases)?.first())
    }

    /// Every value of `prop` over this resource and its aliases.
    pub fn all(&self, prop: &str) -> Result<ResourceList<'g>> {
        self.all_with(prop, AliasLookup::Include)
    }

    pub fn all_with(&self, prop: &str, aliases: AliasLookup) -> Result<ResourceList<'g>> {
        let (inverse, name) = match prop.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, prop),
        };
        let predicate = graph::predicate_node(self.graph, name.into())?;
        let mut sources: Vec<Box<dyn Iterator<Item = Node>>> = Vec::new();
        for node in self.lookup_nodes(aliases) {
            if inverse {
                let triples = self.graph.node_triples(None, predicate.as_ref(), Some(&node))?;
                sources.push(Box::new(triples.map(|(s, _, _)| s)));
            } else if !node.is_literal() {
                let triples = self.graph.node_triples(Some(&node), predicate.as_ref(), None)?;
                sources.push(Box::new(triples.map(|(_, _, o)| o)));
            }
        }
        let graph = self.graph;
        Ok(ResourceList::new(
            sources
                .into_iter()
                .flatten()
                .map(move |node| Resource::new(graph, node)),
        ))
    }

    pub fn has(&self, prop: &str) -> Result<bool> {
        Ok(!self.all(prop)?.is_empty())
    }

    /// Adds a `prop` statement. Plain values become literals.
    pub fn add(&self, prop: &str, value: impl IntoObject) -> Result<&Self> {
        graph::set_triple_in(
            self.graph,
            self.into(),
            prop.into(),
            value.into_object().into(),
        )?;
        Ok(self)
    }

    /// Replaces every value of `prop` with `value`.
    pub fn set(&self, prop: &str, value: impl IntoObject) -> Result<&Self> {
        graph::remove_triples_in(self.graph, self.into(), prop.into(), NodeArg::Any)?;
        self.add(prop, value)
    }

    pub fn type_(&self) -> Result<Option<Resource<'g>>> {
        self.get(TYPE.as_str())
    }

    /// `(predicate, object)` pairs of outgoing statements, aliases included.
    pub fn property_values(&self) -> Result<Vec<(Resource<'g>, Resource<'g>)>> {
        let mut pairs = Vec::new();
        for node in self.lookup_nodes(AliasLookup::Include) {
            if node.is_literal() {
                continue;
            }
            for (_, p, o) in self.graph.node_triples(Some(&node), None, None)? {
                pairs.push((Resource::new(self.graph, p), Resource::new(self.graph, o)));
            }
        }
        Ok(pairs)
    }

    /// `(predicate, subject)` pairs of incoming statements, aliases included.
    pub fn inverse_property_values(&self) -> Result<Vec<(Resource<'g>, Resource<'g>)>> {
        let mut pairs = Vec::new();
        for node in self.lookup_nodes(AliasLookup::Include) {
            for (s, p, _) in self.graph.node_triples(None, None, Some(&node))? {
                pairs.push((Resource::new(self.graph, p), Resource::new(self.graph, s)));
            }
        }
        Ok(pairs)
    }

    pub fn properties(&self) -> Result<ResourceList<'g>> {
        Ok(distinct(self.property_values()?.into_iter().map(|(p, _)| p)))
    }

    pub fn inverse_properties(&self) -> Result<ResourceList<'g>> {
        Ok(distinct(self.inverse_property_values()?.into_iter().map(|(p, _)| p)))
    }

    /// Loads this resource's own URI into its graph, ignoring failures.
    pub fn load(&self) -> Result<&Self> {
        if let Some(uri) = self.uri() {
            self.graph.load_uri(uri, LoadOptions::default().allow_error())?;
        }
        Ok(self)
    }

    /// Follows `owl:sameAs` in both directions, records every new alias and
    /// loads it.
    pub fn load_same_as(&self) -> Result<&Self> {
        let forward = self.all_with(SAME_AS.as_str(), AliasLookup::Direct)?;
        let backward = self.all_with(&format!("-{}", SAME_AS.as_str()), AliasLookup::Direct)?;
        for found in forward.iter().chain(backward.iter()) {
            let alias = Resource::new(self.graph, found.into_node());
            if alias == *self {
                continue;
            }
            {
                let mut known = self.same_as.borrow_mut();
                if !known.contains(&alias) {
                    debug!("{} is the same as {}", self, alias);
                    known.push(alias.clone());
                }
            }
            alias.load()?;
        }
        Ok(self)
    }

    pub fn shrink_uri(&self) -> Option<String> {
        self.uri().map(|u| self.graph.shrink_uri(u))
    }

    pub fn expand_uri(&self) -> Option<String> {
        self.uri().map(|u| graph::expand_name(self.graph, u))
    }

    /// Whether the URI lies in `ns`, given either as a namespace URI or as a
    /// registered prefix.
    pub fn in_ns(&self, ns: &str) -> bool {
        let Some(uri) = self.expand_uri() else {
            return false;
        };
        let namespaces = self.graph.namespaces();
        let ns = namespaces.get(ns).map(String::as_str).unwrap_or(ns);
        uri.starts_with(ns)
    }

    /// The namespace of the URI: a registered namespace when one matches,
    /// otherwise everything up to the last `#` or `/`.
    pub fn get_ns(&self) -> Option<String> {
        let uri = self.expand_uri()?;
        if let Some(ns) = self
            .graph
            .namespaces()
            .into_values()
            .filter(|ns| !ns.is_empty() && uri.starts_with(ns.as_str()))
            .max_by_key(|ns| ns.len())
        {
            return Some(ns);
        }
        let cut = uri.rfind('#').or_else(|| uri.rfind('/'))?;
        Some(uri[..=cut].to_string())
    }

    /// Turtle for the statements about this resource and its aliases; with
    /// `extended`, statements pointing at them too.
    pub fn to_turtle(&self, extended: bool) -> Result<String> {
        graph::dump_resources(self.graph, &self.identities(), extended)
    }
}

fn distinct<'g>(items: impl Iterator<Item = Resource<'g>>) -> ResourceList<'g> {
    let mut seen = HashSet::new();
    items.filter(|r| seen.insert(r.node.clone())).collect()
}

impl PartialEq for Resource<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for Resource<'_> {}

impl PartialEq<Node> for Resource<'_> {
    fn eq(&self, other: &Node) -> bool {
        self.node == *other
    }
}

/// Compares the URI or literal lexical form.
impl PartialEq<&str> for Resource<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.value() == Some(*other)
    }
}

impl PartialOrd for Resource<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Resource<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.node.cmp(&other.node)
    }
}

impl Hash for Resource<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.hash(state);
    }
}

impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource({:?})", self.node)
    }
}

impl fmt::Display for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.node)
    }
}

impl From<&Resource<'_>> for NodeArg {
    fn from(resource: &Resource<'_>) -> Self {
        NodeArg::Node(resource.node.clone())
    }
}

impl From<Resource<'_>> for NodeArg {
    fn from(resource: Resource<'_>) -> Self {
        NodeArg::Node(resource.node)
    }
}

/// Conversion for values stored through [`Resource::add`] and
/// [`Resource::set`]: nodes and resources keep their term, strings and
/// numbers become literals.
pub trait IntoObject {
    fn into_object(self) -> Node;
}

impl IntoObject for Node {
    fn into_object(self) -> Node {
        self
    }
}

impl IntoObject for &Resource<'_> {
    fn into_object(self) -> Node {
        self.node.clone()
    }
}

impl IntoObject for Resource<'_> {
    fn into_object(self) -> Node {
        self.node
    }
}

impl IntoObject for Literal {
    fn into_object(self) -> Node {
        Node::Literal(self)
    }
}

impl IntoObject for &str {
    fn into_object(self) -> Node {
        Node::literal(self)
    }
}

impl IntoObject for String {
    fn into_object(self) -> Node {
        Node::literal(self)
    }
}

impl IntoObject for i64 {
    fn into_object(self) -> Node {
        Node::Literal(integer_literal(self))
    }
}

impl IntoObject for i32 {
    fn into_object(self) -> Node {
        Node::Literal(integer_literal(self.into()))
    }
}

impl IntoObject for f64 {
    fn into_object(self) -> Node {
        Node::Literal(double_literal(self))
    }
}

impl IntoObject for bool {
    fn into_object(self) -> Node {
        Node::Literal(boolean_literal(self))
    }
}

/// A lazily evaluated, replayable list of resources.
#[derive(Clone)]
pub struct ResourceList<'g> {
    items: Reiterable<'g, Resource<'g>>,
}

impl<'g> ResourceList<'g> {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Resource<'g>>,
        I::IntoIter: 'g,
    {
        Self {
            items: Reiterable::new(items),
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Reiterable::empty(),
        }
    }

    pub fn iter(&self) -> Iter<'g, Resource<'g>> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<Resource<'g>> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Resource<'g>> {
        self.items.to_vec()
    }

    pub fn contains(&self, other: &Resource<'_>) -> bool {
        self.iter().any(|r| r.node == other.node)
    }

    /// Applies `f` to every element.
    pub fn map<T>(&self, f: impl FnMut(Resource<'g>) -> T) -> Vec<T> {
        self.iter().map(f).collect()
    }

    /// Applies `f` to every element and concatenates the results.
    pub fn map_concat<T, I>(&self, f: impl FnMut(Resource<'g>) -> I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        self.iter().flat_map(f).collect()
    }

    /// Every value of `prop` over every element.
    pub fn all(&self, prop: &str) -> Result<ResourceList<'g>> {
        let mut values = Vec::new();
        for r in self.iter() {
            values.extend(r.all(prop)?.iter());
        }
        Ok(values.into_iter().collect())
    }

    pub fn has(&self, prop: &str) -> Result<bool> {
        for r in self.iter() {
            if r.has(prop)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The first value of `prop` for each element that has one.
    pub fn get(&self, prop: &str) -> Result<ResourceList<'g>> {
        let mut values = Vec::new();
        for r in self.iter() {
            values.extend(r.get(prop)?);
        }
        Ok(values.into_iter().collect())
    }

    pub fn load(&self) -> Result<&Self> {
        for r in self.iter() {
            r.load()?;
        }
        Ok(self)
    }

    pub fn load_same_as(&self) -> Result<&Self> {
        for r in self.iter() {
            r.load_same_as()?;
        }
        Ok(self)
    }

    /// Orders the elements by their value of `prop`; elements without one
    /// come first.
    pub fn sort(&self, prop: &str) -> Result<ResourceList<'g>> {
        let mut keyed = Vec::new();
        for r in self.iter() {
            let key = r.get(prop)?.map(Resource::into_node);
            keyed.push((key, r));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(keyed.into_iter().map(|(_, r)| r).collect())
    }

    pub fn join(&self, sep: &str) -> String {
        self.map(|r| r.to_string()).join(sep)
    }

    /// `others` followed by this list. Not commutative.
    pub fn add(&self, others: impl IntoResources<'g>) -> ResourceList<'g> {
        let head = others.into_resources();
        ResourceList::new(head.into_iter().chain(self.iter()))
    }

    pub fn union(&self, others: impl IntoResources<'g>) -> ResourceList<'g> {
        self.add(others)
    }

    /// Elements of this list that are not in `others`.
    pub fn remove(&self, others: impl IntoResources<'g>) -> ResourceList<'g> {
        let excluded: HashSet<Node> = others
            .into_resources()
            .into_iter()
            .map(Resource::into_node)
            .collect();
        ResourceList::new(self.iter().filter(move |r| !excluded.contains(&r.node)))
    }
}

impl<'g> FromIterator<Resource<'g>> for ResourceList<'g> {
    fn from_iter<I: IntoIterator<Item = Resource<'g>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'g> IntoIterator for &ResourceList<'g> {
    type Item = Resource<'g>;
    type IntoIter = Iter<'g, Resource<'g>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for ResourceList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Normalizes a single resource, a list or a vector into resources.
pub trait IntoResources<'g> {
    fn into_resources(self) -> Vec<Resource<'g>>;
}

impl<'g> IntoResources<'g> for Resource<'g> {
    fn into_resources(self) -> Vec<Resource<'g>> {
        vec![self]
    }
}

impl<'g> IntoResources<'g> for &Resource<'g> {
    fn into_resources(self) -> Vec<Resource<'g>> {
        vec![self.clone()]
    }
}

impl<'g> IntoResources<'g> for ResourceList<'g> {
    fn into_resources(self) -> Vec<Resource<'g>> {
        self.to_vec()
    }
}

impl<'g> IntoResources<'g> for &ResourceList<'g> {
    fn into_resources(self) -> Vec<Resource<'g>> {
        self.to_vec()
    }
}

impl<'g> IntoResources<'g> for Vec<Resource<'g>> {
    fn into_resources(self) -> Vec<Resource<'g>> {
        self
    }
}

impl IntoUris for &Resource<'_> {
    fn into_uris(self) -> Vec<String> {
        self.uri().map(str::to_string).into_iter().collect()
    }
}

impl IntoUris for &ResourceList<'_> {
    fn into_uris(self) -> Vec<String> {
        self.iter().filter_map(|r| r.uri().map(str::to_string)).collect()
    }
}

pub type Bindings<'g> = BTreeMap<String, Resource<'g>>;

/// Rows of SPARQL variable bindings.
#[derive(Clone)]
pub struct SparqlList<'g> {
    rows: Reiterable<'g, Bindings<'g>>,
}

impl<'g> SparqlList<'g> {
    pub fn new<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Bindings<'g>>,
        I::IntoIter: 'g,
    {
        Self {
            rows: Reiterable::new(rows),
        }
    }

    /// Binds engine rows to `graph`.
    pub fn from_rows(graph: &'g dyn GraphView, rows: Vec<NodeBindings>) -> Self {
        Self::new(rows.into_iter().map(move |row| {
            row.into_iter()
                .map(|(var, node)| (var, Resource::new(graph, node)))
                .collect()
        }))
    }

    pub fn iter(&self) -> Iter<'g, Bindings<'g>> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The column bound to `var`; rows leaving it unbound are skipped.
    pub fn get(&self, var: &str) -> ResourceList<'g> {
        let var = var.trim_start_matches('?').to_string();
        ResourceList::new(self.iter().filter_map(move |mut row| row.remove(&var)))
    }

    /// Sum of the numeric values bound to `var`.
    pub fn count(&self, var: &str) -> Result<f64> {
        let mut total = 0.0;
        for value in self.get(var).iter() {
            total += value.node().numeric_value().ok_or_else(|| GraphError::NotNumeric {
                var: var.trim_start_matches('?').to_string(),
                value: value.to_string(),
            })?;
        }
        Ok(total)
    }
}

impl<'g> IntoIterator for &SparqlList<'g> {
    type Item = Bindings<'g>;
    type IntoIter = Iter<'g, Bindings<'g>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for SparqlList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
