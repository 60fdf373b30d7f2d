//! The triple-store capability a [`Graph`](crate::graph::Graph) is built on,
//! and the in-memory oxigraph implementation used by default.

use crate::consts::{DEFAULT_NAMESPACES, STRING_INPUT_BASE};
use crate::errors::GraphError;
use crate::fetch::{fetch_rdf, FetchOptions};
use crate::format::{sniff_format, Format};
use crate::node::{Node, NodeBindings, NodeTriple};
use anyhow::Result;
use log::{debug, info, warn};
use oxigraph::io::{RdfParser, RdfSerializer};
use oxigraph::model::{GraphName, GraphNameRef, NamedNode, Quad, TripleRef};
use oxigraph::sparql::{QueryResults, SparqlEvaluator};
use oxigraph::store::{QuadIter, Store};
use std::collections::BTreeMap;

pub type TripleIter = Box<dyn Iterator<Item = NodeTriple>>;

/// Anything that stores triples, answers patterns and SPARQL, and keeps a
/// prefix table. Graphs only ever talk to their backend through this trait,
/// so an in-memory store, a remote store or a test double are interchangeable.
pub trait Engine {
    /// Triples matching the pattern; `None` is a wildcard.
    fn triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<TripleIter>;

    fn sparql(&self, query: &str) -> Result<Vec<NodeBindings>>;

    /// Fetches and parses a document. Fails on transport or parse errors.
    fn load_uri(&mut self, uri: &str, format: Option<Format>) -> Result<()>;

    /// Parses `text` into the store. Relative IRIs resolve against `base`.
    fn load_text(&mut self, text: &str, format: Format, base: Option<&str>) -> Result<()>;

    /// Expands `prefix:local` using the prefix table; anything else is returned as is.
    fn expand_uri(&self, name: &str) -> String;

    /// Abbreviates a URI with the longest matching namespace, if any.
    fn shrink_uri(&self, uri: &str) -> String;

    fn add_namespace(&mut self, prefix: &str, uri: &str);

    fn namespaces(&self) -> BTreeMap<String, String>;

    /// Adds one statement. Subject and predicate must be URIs or, for the
    /// subject, a blank node.
    fn set_triple(&mut self, subject: &Node, predicate: &Node, object: &Node) -> Result<()>;

    /// Removes every statement matching the pattern and returns how many went.
    fn remove_triples(
        &mut self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<usize>;

    /// Writes the whole store in `format`.
    fn serialize(&self, format: Format) -> Result<Vec<u8>>;
}

/// An [`Engine`] over an in-memory oxigraph [`Store`]. Only the default graph
/// is used.
pub struct MemoryEngine {
    store: Store,
    namespaces: BTreeMap<String, String>,
    fetch: FetchOptions,
}

impl MemoryEngine {
    pub fn new() -> Result<Self> {
        Self::with_fetch_options(FetchOptions::default())
    }

    pub fn with_fetch_options(fetch: FetchOptions) -> Result<Self> {
        let namespaces = DEFAULT_NAMESPACES
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.to_string()))
            .collect();
        Ok(Self {
            store: Store::new()?,
            namespaces,
            fetch,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn quads_for(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<QuadIter<'static>> {
        let subject = subject.map(Node::to_subject).transpose()?;
        let predicate = predicate.map(Node::to_named_node).transpose()?;
        let object = object.map(Node::to_term).transpose()?;
        Ok(self.store.quads_for_pattern(
            subject.as_ref().map(|s| s.as_ref()),
            predicate.as_ref().map(|p| p.as_ref()),
            object.as_ref().map(|o| o.as_ref()),
            Some(GraphNameRef::DefaultGraph),
        ))
    }

    fn matching_quads(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<Vec<Quad>> {
        Ok(self
            .quads_for(subject, predicate, object)?
            .collect::<Result<Vec<_>, _>>()?)
    }
}

fn triple_of(quad: Quad) -> NodeTriple {
    (
        Node::from(quad.subject),
        Node::from(quad.predicate),
        Node::from(quad.object),
    )
}

impl Engine for MemoryEngine {
    fn triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<TripleIter> {
        let quads = self.quads_for(subject, predicate, object)?;
        Ok(Box::new(quads.filter_map(|quad| match quad {
            Ok(quad) => Some(triple_of(quad)),
            Err(e) => {
                warn!("Skipping unreadable quad: {e}");
                None
            }
        })))
    }

    fn sparql(&self, query: &str) -> Result<Vec<NodeBindings>> {
        let results = SparqlEvaluator::new()
            .parse_query(query)?
            .on_store(&self.store)
            .execute()?;
        let mut rows = Vec::new();
        match results {
            QueryResults::Solutions(solutions) => {
                for solution in solutions {
                    let solution = solution?;
                    rows.push(
                        solution
                            .iter()
                            .map(|(var, term)| (var.as_str().to_string(), Node::from(term.clone())))
                            .collect(),
                    );
                }
            }
            QueryResults::Graph(triples) => {
                for triple in triples {
                    let triple = triple?;
                    let mut row = NodeBindings::new();
                    row.insert("subject".to_string(), Node::from(triple.subject));
                    row.insert("predicate".to_string(), Node::from(triple.predicate));
                    row.insert("object".to_string(), Node::from(triple.object));
                    rows.push(row);
                }
            }
            QueryResults::Boolean(value) => {
                let mut row = NodeBindings::new();
                row.insert(
                    "result".to_string(),
                    Node::Literal(crate::node::boolean_literal(value)),
                );
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn load_uri(&mut self, uri: &str, format: Option<Format>) -> Result<()> {
        let fetched = fetch_rdf(uri, &self.fetch)?;
        let text = fetched.text()?;
        let format = match format {
            Some(f) => f,
            None => sniff_format(&text, fetched.content_type.as_deref(), uri)?,
        };
        info!("Loading <{uri}> as {format}");
        self.load_text(&text, format, Some(&fetched.final_url))
    }

    fn load_text(&mut self, text: &str, format: Format, base: Option<&str>) -> Result<()> {
        let base = base.unwrap_or(STRING_INPUT_BASE);
        let parser = RdfParser::from_format(format.parser_format())
            .with_base_iri(base)
            .map_err(|e| GraphError::load(base, e))?
            .without_named_graphs();
        let mut loader = self.store.bulk_loader();
        loader
            .load_from_reader(parser, std::io::Cursor::new(text.as_bytes()))
            .map_err(|e| GraphError::load(base, e))?;
        loader.commit()?;
        Ok(())
    }

    fn expand_uri(&self, name: &str) -> String {
        if let Some((prefix, local)) = name.split_once(':') {
            if let Some(ns) = self.namespaces.get(prefix) {
                return format!("{ns}{local}");
            }
        }
        name.to_string()
    }

    fn shrink_uri(&self, uri: &str) -> String {
        self.namespaces
            .iter()
            .filter(|(_, ns)| !ns.is_empty() && uri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{prefix}:{}", &uri[ns.len()..]))
            .unwrap_or_else(|| uri.to_string())
    }

    fn add_namespace(&mut self, prefix: &str, uri: &str) {
        self.namespaces.insert(prefix.to_string(), uri.to_string());
    }

    fn namespaces(&self) -> BTreeMap<String, String> {
        self.namespaces.clone()
    }

    fn set_triple(&mut self, subject: &Node, predicate: &Node, object: &Node) -> Result<()> {
        let quad = Quad::new(
            subject.to_subject()?,
            predicate.to_named_node()?,
            object.to_term()?,
            GraphName::DefaultGraph,
        );
        self.store.insert(&quad)?;
        Ok(())
    }

    fn remove_triples(
        &mut self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<usize> {
        let quads = self.matching_quads(subject, predicate, object)?;
        for quad in &quads {
            self.store.remove(quad)?;
        }
        Ok(quads.len())
    }

    fn serialize(&self, format: Format) -> Result<Vec<u8>> {
        let mut serializer = RdfSerializer::from_format(format.serializer_format());
        for (prefix, ns) in &self.namespaces {
            if NamedNode::new(ns.as_str()).is_err() {
                debug!("Skipping prefix {prefix}: <{ns}> is not a valid IRI");
                continue;
            }
            serializer = serializer.with_prefix(prefix.as_str(), ns.as_str())?;
        }
        let mut writer = serializer.for_writer(Vec::new());
        for quad in self.matching_quads(None, None, None)? {
            writer.serialize_triple(TripleRef::new(&quad.subject, &quad.predicate, &quad.object))?;
        }
        Ok(writer.finish()?)
    }
}
