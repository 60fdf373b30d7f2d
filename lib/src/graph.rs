//! The graph facade: binds [`Resource`]s to an [`Engine`], keeps track of
//! what has been loaded and resolves names against the prefix table.
//!
//! Everything a resource needs from its graph goes through [`GraphView`],
//! which both [`Graph`] and [`Dataset`](crate::dataset::Dataset) implement.
//! The convenience methods on the trait (`resource`, `triples`, `sparql`,
//! ...) accept loosely typed arguments and resolve them to nodes:
//!
//! - strings name URIs, and `prefix:local` strings are expanded;
//! - `None`/[`NodeArg::Any`] is a wildcard;
//! - subjects must not be literals and predicates must be URIs.

use crate::cache::WebCache;
use crate::config::Config;
use crate::consts::TYPE;
use crate::engine::{Engine, MemoryEngine, TripleIter};
use crate::errors::GraphError;
use crate::fetch::{fetch_rdf, FetchOptions};
use crate::format::{sniff_format, Format};
use crate::node::{Node, NodeArg, NodeBindings};
use crate::options::{LoadOptions, OnError};
use crate::reiterable::Reiterable;
use crate::resource::{Resource, ResourceList, SparqlList};
use crate::util::{canonical_uri_key, file_uri, is_prefixed_name};
use anyhow::Result;
use log::{debug, info, warn};
use oxigraph::model::Literal;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

pub type ResourceTriple<'g> = (Resource<'g>, Resource<'g>, Resource<'g>);
pub type TripleList<'g> = Reiterable<'g, ResourceTriple<'g>>;

/// Normalizes one URI or a collection of URIs into a list.
pub trait IntoUris {
    fn into_uris(self) -> Vec<String>;
}

impl IntoUris for &str {
    fn into_uris(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoUris for String {
    fn into_uris(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoUris for &String {
    fn into_uris(self) -> Vec<String> {
        vec![self.clone()]
    }
}

impl<T: AsRef<str>> IntoUris for Vec<T> {
    fn into_uris(self) -> Vec<String> {
        self.iter().map(|u| u.as_ref().to_string()).collect()
    }
}

impl<T: AsRef<str>> IntoUris for &[T] {
    fn into_uris(self) -> Vec<String> {
        self.iter().map(|u| u.as_ref().to_string()).collect()
    }
}

impl<T: AsRef<str>, const N: usize> IntoUris for [T; N] {
    fn into_uris(self) -> Vec<String> {
        self.iter().map(|u| u.as_ref().to_string()).collect()
    }
}

/// What resources see of the graph that owns them.
pub trait GraphView {
    /// Triples matching already resolved terms; `None` is a wildcard.
    fn node_triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<TripleIter>;

    fn add_node_triple(&self, subject: &Node, predicate: &Node, object: &Node) -> Result<()>;

    fn remove_node_triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<usize>;

    /// Loads a single URI, honouring the load log unless a reload is forced.
    fn load_uri(&self, uri: &str, options: LoadOptions) -> Result<()>;

    fn expand_uri(&self, name: &str) -> String;

    fn shrink_uri(&self, uri: &str) -> String;

    fn namespaces(&self) -> BTreeMap<String, String>;

    fn add_namespace(&self, prefix: &str, uri: &str);

    fn sparql_rows(&self, query: &str) -> Result<Vec<NodeBindings>>;

    /// A resource for a URI, `prefix:local` name or node.
    fn resource(&self, name: impl Into<NodeArg>) -> Result<Resource<'_>>
    where
        Self: Sized,
    {
        match resolve(self, name.into()) {
            Some(node) => Ok(Resource::new(self, node)),
            None => Err(GraphError::resolution("a wildcard", "a resource").into()),
        }
    }

    fn literal(&self, value: impl Into<Literal>) -> Resource<'_>
    where
        Self: Sized,
    {
        Resource::new(self, Node::Literal(value.into()))
    }

    fn triples(
        &self,
        subject: impl Into<NodeArg>,
        predicate: impl Into<NodeArg>,
        object: impl Into<NodeArg>,
    ) -> Result<TripleList<'_>>
    where
        Self: Sized,
    {
        triples_in(self, subject.into(), predicate.into(), object.into())
    }

    /// Whether any triple matches. Only the first match is produced.
    fn has_triple(
        &self,
        subject: impl Into<NodeArg>,
        predicate: impl Into<NodeArg>,
        object: impl Into<NodeArg>,
    ) -> Result<bool>
    where
        Self: Sized,
    {
        Ok(!self.triples(subject, predicate, object)?.is_empty())
    }

    fn set_triple(
        &self,
        subject: impl Into<NodeArg>,
        predicate: impl Into<NodeArg>,
        object: impl Into<NodeArg>,
    ) -> Result<&Self>
    where
        Self: Sized,
    {
        set_triple_in(self, subject.into(), predicate.into(), object.into())?;
        Ok(self)
    }

    fn remove_triples(
        &self,
        subject: impl Into<NodeArg>,
        predicate: impl Into<NodeArg>,
        object: impl Into<NodeArg>,
    ) -> Result<usize>
    where
        Self: Sized,
    {
        remove_triples_in(self, subject.into(), predicate.into(), object.into())
    }

    /// Loads every URI in turn. With [`OnError::Skip`] failures are logged
    /// and the remaining URIs are still loaded.
    fn load(&self, uris: impl IntoUris, options: LoadOptions) -> Result<&Self>
    where
        Self: Sized,
    {
        for uri in uris.into_uris() {
            self.load_uri(&uri, options)?;
        }
        Ok(self)
    }

    /// Registers prefixes. A prefix given twice keeps its last URI.
    fn add_namespaces<I, P, U>(&self, namespaces: I) -> &Self
    where
        Self: Sized,
        I: IntoIterator<Item = (P, U)>,
        P: AsRef<str>,
        U: AsRef<str>,
    {
        for (prefix, uri) in namespaces {
            self.add_namespace(prefix.as_ref(), uri.as_ref());
        }
        self
    }

    fn sparql(&self, query: &str) -> Result<SparqlList<'_>>
    where
        Self: Sized,
    {
        Ok(SparqlList::from_rows(self, self.sparql_rows(query)?))
    }

    /// Subjects typed with any of `types`.
    fn all_of_type(&self, types: impl IntoUris) -> Result<ResourceList<'_>>
    where
        Self: Sized,
    {
        let mut found = Vec::new();
        for ty in types.into_uris() {
            for (s, _, _) in self.triples(NodeArg::Any, TYPE.as_str(), ty)?.iter() {
                found.push(s);
            }
        }
        Ok(found.into_iter().collect())
    }

    /// Every distinct class used as an `rdf:type` object.
    fn all_types(&self) -> Result<ResourceList<'_>>
    where
        Self: Sized,
    {
        let mut seen = HashSet::new();
        let mut types = Vec::new();
        for (_, _, o) in self.triples(NodeArg::Any, TYPE.as_str(), NodeArg::Any)?.iter() {
            if seen.insert(o.node().clone()) {
                types.push(o);
            }
        }
        Ok(types.into_iter().collect())
    }
}

/// Expands `name` when it looks like a prefixed name.
pub(crate) fn expand_name(view: &dyn GraphView, name: &str) -> String {
    if is_prefixed_name(name) {
        view.expand_uri(name)
    } else {
        name.to_string()
    }
}

pub(crate) fn resolve(view: &dyn GraphView, arg: NodeArg) -> Option<Node> {
    match arg {
        NodeArg::Any => None,
        NodeArg::Name(name) => Some(Node::Uri(expand_name(view, &name))),
        NodeArg::Node(node) => Some(node),
    }
}

fn subject_node(view: &dyn GraphView, arg: NodeArg) -> Result<Option<Node>> {
    match resolve(view, arg) {
        Some(node) if node.is_literal() => Err(GraphError::resolution(&node, "a subject").into()),
        other => Ok(other),
    }
}

pub(crate) fn predicate_node(view: &dyn GraphView, arg: NodeArg) -> Result<Option<Node>> {
    match resolve(view, arg) {
        Some(node) if !node.is_uri() => Err(GraphError::resolution(&node, "a predicate").into()),
        other => Ok(other),
    }
}

pub(crate) fn triples_in<'g>(
    view: &'g dyn GraphView,
    subject: NodeArg,
    predicate: NodeArg,
    object: NodeArg,
) -> Result<TripleList<'g>> {
    let s = subject_node(view, subject)?;
    let p = predicate_node(view, predicate)?;
    let o = resolve(view, object);
    let triples = view.node_triples(s.as_ref(), p.as_ref(), o.as_ref())?;
    Ok(Reiterable::new(triples.map(move |(s, p, o)| {
        (
            Resource::new(view, s),
            Resource::new(view, p),
            Resource::new(view, o),
        )
    })))
}

pub(crate) fn set_triple_in(
    view: &dyn GraphView,
    subject: NodeArg,
    predicate: NodeArg,
    object: NodeArg,
) -> Result<()> {
    let s = match resolve(view, subject) {
        Some(node) if node.is_uri() => node,
        Some(node) => return Err(GraphError::resolution(&node, "a subject").into()),
        None => return Err(GraphError::resolution("a wildcard", "a subject").into()),
    };
    let p = predicate_node(view, predicate)?
        .ok_or_else(|| GraphError::resolution("a wildcard", "a predicate"))?;
    let o = resolve(view, object)
        .ok_or_else(|| GraphError::resolution("a wildcard", "an object"))?;
    view.add_node_triple(&s, &p, &o)
}

pub(crate) fn remove_triples_in(
    view: &dyn GraphView,
    subject: NodeArg,
    predicate: NodeArg,
    object: NodeArg,
) -> Result<usize> {
    let s = match resolve(view, subject) {
        Some(node) if !node.is_uri() => {
            return Err(GraphError::resolution(&node, "a subject").into())
        }
        other => other,
    };
    let p = predicate_node(view, predicate)?;
    let o = resolve(view, object);
    view.remove_node_triples(s.as_ref(), p.as_ref(), o.as_ref())
}

/// Turtle for the statements about `resources`, plus the statements pointing
/// at them when `extended` is set.
pub fn dump_resources(
    view: &dyn GraphView,
    resources: &[Resource<'_>],
    extended: bool,
) -> Result<String> {
    let mut scratch = MemoryEngine::new()?;
    for (prefix, ns) in view.namespaces() {
        scratch.add_namespace(&prefix, &ns);
    }
    for resource in resources {
        let node = resource.node();
        if !node.is_literal() {
            for (s, p, o) in view.node_triples(Some(node), None, None)? {
                scratch.set_triple(&s, &p, &o)?;
            }
        }
        if extended {
            for (s, p, o) in view.node_triples(None, None, Some(node))? {
                scratch.set_triple(&s, &p, &o)?;
            }
        }
    }
    Ok(String::from_utf8(scratch.serialize(Format::Turtle)?)?)
}

/// A triple store plus the bookkeeping needed to load documents into it at
/// most once.
pub struct Graph {
    engine: RefCell<Box<dyn Engine>>,
    loaded: RefCell<HashSet<String>>,
    web_cache: Option<Arc<WebCache>>,
    fetch: FetchOptions,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("loaded", &self.loaded.borrow())
            .field("fetch", &self.fetch)
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// An empty graph over a [`MemoryEngine`] without a web cache.
    pub fn new() -> Result<Self> {
        Ok(Self::with_engine(Box::new(MemoryEngine::new()?)))
    }

    pub fn with_engine(engine: Box<dyn Engine>) -> Self {
        Self {
            engine: RefCell::new(engine),
            loaded: RefCell::new(HashSet::new()),
            web_cache: None,
            fetch: FetchOptions::default(),
        }
    }

    /// A graph set up from `config`: engine fetch options, the shared web
    /// cache under `<cache_dir>/web` and the extra namespaces.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fetch = config.fetch_options();
        let engine = MemoryEngine::with_fetch_options(fetch.clone())?;
        let mut graph = Self::with_engine(Box::new(engine)).with_fetch_options(fetch);
        if let Some(dir) = &config.cache_dir {
            graph = graph.with_web_cache(Arc::new(WebCache::open(dir.join("web"))?));
        }
        graph.add_namespaces(&config.namespaces);
        Ok(graph)
    }

    pub fn with_web_cache(mut self, cache: Arc<WebCache>) -> Self {
        self.web_cache = Some(cache);
        self
    }

    /// Options for fetches made on behalf of the web cache.
    pub fn with_fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn web_cache(&self) -> Option<&Arc<WebCache>> {
        self.web_cache.as_ref()
    }

    /// Whether `uri` (fragment ignored) has been loaded, or attempted.
    pub fn is_loaded(&self, uri: &str) -> bool {
        self.loaded.borrow().contains(&canonical_uri_key(uri))
    }

    /// Parses `text` into the graph. A recognised media type picks the
    /// format; otherwise it is sniffed from the text itself.
    pub fn read_text(&self, text: &str, media_type: Option<&str>) -> Result<&Self> {
        let format = sniff_format(text, media_type, "text input")?;
        self.read_as(text, format)
    }

    /// Parses `text` as `format`, without sniffing.
    pub fn read_as(&self, text: &str, format: Format) -> Result<&Self> {
        self.engine.borrow_mut().load_text(text, format, None)?;
        Ok(self)
    }

    pub fn read_turtle(&self, text: &str) -> Result<&Self> {
        self.read_as(text, Format::Turtle)
    }

    pub fn read_rdfxml(&self, text: &str) -> Result<&Self> {
        self.read_as(text, Format::RdfXml)
    }

    pub fn read_n3(&self, text: &str) -> Result<&Self> {
        self.read_as(text, Format::N3)
    }

    pub fn read_ntriples(&self, text: &str) -> Result<&Self> {
        self.read_as(text, Format::NTriples)
    }

    /// `file:` URI for a local path.
    pub fn file_uri(path: &Path) -> Result<String> {
        file_uri(path)
    }

    /// Loads a local file through the normal load path. The format defaults
    /// to the one implied by the extension.
    pub fn load_file(&self, path: &Path, format: Option<Format>) -> Result<&Self> {
        let mut options = LoadOptions::default();
        options.format = format.or_else(|| Format::from_path(path));
        self.load(file_uri(path)?, options)
    }

    /// Writes the whole graph to `path`, in `format` or the one implied by
    /// the extension (Turtle otherwise).
    pub fn save_file(&self, path: &Path, format: Option<Format>) -> Result<()> {
        let format = format
            .or_else(|| Format::from_path(path))
            .unwrap_or(Format::Turtle);
        std::fs::write(path, self.serialize(format)?)?;
        info!("Wrote graph to {} as {format}", path.display());
        Ok(())
    }

    pub fn serialize(&self, format: Format) -> Result<Vec<u8>> {
        self.engine.borrow().serialize(format)
    }

    /// Number of triples.
    pub fn len(&self) -> Result<usize> {
        Ok(self.engine.borrow().triples(None, None, None)?.count())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.engine.borrow().triples(None, None, None)?.next().is_none())
    }

    fn load_through_cache(&self, cache: &WebCache, uri: &str, options: LoadOptions) -> Result<()> {
        let cached = if !options.refresh.is_force() && cache.has(uri) {
            match cache.get(uri) {
                Ok(text) => {
                    debug!("Web cache hit for <{uri}>");
                    Some(text)
                }
                Err(e) if matches!(e.downcast_ref::<GraphError>(), Some(GraphError::CacheMiss(_))) => {
                    warn!("Dropping stale web cache entry for <{uri}>: {e}");
                    cache.remove(uri)?;
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };
        let text = if let Some(text) = cached {
            text
        } else {
            let fetched = fetch_rdf(uri, &self.fetch)?;
            let text = fetched.text()?;
            let format = match options.format {
                Some(f) => f,
                None => sniff_format(&text, fetched.content_type.as_deref(), uri)?,
            };
            let mut scratch = MemoryEngine::new()?;
            scratch.load_text(&text, format, Some(&fetched.final_url))?;
            let normalized = String::from_utf8(scratch.serialize(Format::Turtle)?)?;
            cache.set(uri, &normalized)?;
            normalized
        };
        self.engine
            .borrow_mut()
            .load_text(&text, Format::Turtle, Some(uri))
    }
}

impl GraphView for Graph {
    fn node_triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<TripleIter> {
        self.engine.borrow().triples(subject, predicate, object)
    }

    fn add_node_triple(&self, subject: &Node, predicate: &Node, object: &Node) -> Result<()> {
        self.engine.borrow_mut().set_triple(subject, predicate, object)
    }

    fn remove_node_triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<usize> {
        self.engine
            .borrow_mut()
            .remove_triples(subject, predicate, object)
    }

    fn load_uri(&self, uri: &str, options: LoadOptions) -> Result<()> {
        let key = canonical_uri_key(uri);
        if !options.refresh.is_force() && self.loaded.borrow().contains(&key) {
            debug!("Skipping <{uri}>: already loaded");
            return Ok(());
        }
        // recorded before fetching so a failing URI is not retried implicitly
        self.loaded.borrow_mut().insert(key);
        let result = match &self.web_cache {
            Some(cache) => self.load_through_cache(cache, uri, options),
            None => self.engine.borrow_mut().load_uri(uri, options.format),
        };
        match (result, options.on_error) {
            (Ok(()), _) => {
                info!("Loaded <{uri}>");
                Ok(())
            }
            (Err(e), OnError::Skip) => {
                warn!("Ignoring failed load of <{uri}>: {e:#}");
                Ok(())
            }
            (Err(e), OnError::Propagate) => Err(e),
        }
    }

    fn expand_uri(&self, name: &str) -> String {
        self.engine.borrow().expand_uri(name)
    }

    fn shrink_uri(&self, uri: &str) -> String {
        self.engine.borrow().shrink_uri(uri)
    }

    fn namespaces(&self) -> BTreeMap<String, String> {
        self.engine.borrow().namespaces()
    }

    fn add_namespace(&self, prefix: &str, uri: &str) {
        self.engine.borrow_mut().add_namespace(prefix, uri)
    }

    fn sparql_rows(&self, query: &str) -> Result<Vec<NodeBindings>> {
        self.engine.borrow().sparql(query)
    }
}
