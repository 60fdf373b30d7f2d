//! Federation over SPARQL endpoints.
//!
//! A [`Dataset`] looks like any other graph to its resources, but before it
//! answers a triple pattern it sends a CONSTRUCT query for that pattern to
//! each endpoint whose policy accepts it, and merges the answer into its
//! local data cache. Each `(endpoint, pattern)` pair is asked at most once.

use crate::config::Config;
use crate::engine::TripleIter;
use crate::format::{sniff_format, Format};
use crate::graph::{Graph, GraphView, IntoUris};
use crate::node::{Node, NodeBindings};
use crate::options::LoadOptions;
use crate::policy::{EndpointStats, SparqlStats};
use crate::resource::SparqlList;
use crate::sparql::{HttpSparqlClient, SparqlClient};
use anyhow::Result;
use log::{debug, info};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::marker::PhantomData;

/// A triple pattern with resolved terms; `None` is a wildcard.
pub type TriplePattern = (Option<Node>, Option<Node>, Option<Node>);

thread_local! {
    static NO_AUTO_QUERY_DEPTH: Cell<usize> = Cell::new(0);
}

/// Suspends automatic endpoint querying on the current thread while alive.
/// Guards nest; querying resumes when the outermost one is dropped.
pub struct NoAutoQuery {
    // tied to the thread whose counter it bumped
    _not_send: PhantomData<*const ()>,
}

impl NoAutoQuery {
    pub fn enter() -> Self {
        NO_AUTO_QUERY_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: PhantomData,
        }
    }

    /// Whether some guard is alive on this thread.
    pub fn active() -> bool {
        NO_AUTO_QUERY_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for NoAutoQuery {
    fn drop(&mut self) {
        NO_AUTO_QUERY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Runs `f` with automatic endpoint querying suspended.
pub fn no_auto_query<T>(f: impl FnOnce() -> T) -> T {
    let _guard = NoAutoQuery::enter();
    f()
}

pub struct Endpoint {
    uri: String,
    stats: Box<dyn EndpointStats>,
}

impl Endpoint {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn stats(&self) -> &dyn EndpointStats {
        self.stats.as_ref()
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("uri", &self.uri)
            .field("policy", &self.stats.policy_name())
            .finish()
    }
}

pub struct Dataset {
    endpoints: BTreeMap<String, Endpoint>,
    data_cache: Graph,
    graphs: Vec<Graph>,
    pattern_cache: RefCell<HashMap<String, HashSet<TriplePattern>>>,
    client: Box<dyn SparqlClient>,
    sparql_debug: bool,
}

impl Dataset {
    /// A dataset with no endpoints, an empty data cache and an HTTP client.
    pub fn new() -> Result<Self> {
        let client = HttpSparqlClient::new(&Default::default())?;
        Ok(Self::with_client(Graph::new()?, Box::new(client)))
    }

    pub fn with_client(data_cache: Graph, client: Box<dyn SparqlClient>) -> Self {
        Self {
            endpoints: BTreeMap::new(),
            data_cache,
            graphs: Vec::new(),
            pattern_cache: RefCell::new(HashMap::new()),
            client,
            sparql_debug: false,
        }
    }

    /// A dataset whose data cache, client and endpoints come from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = HttpSparqlClient::new(&config.fetch_options())?;
        let mut dataset = Self::with_client(Graph::from_config(config)?, Box::new(client))
            .with_sparql_debug(config.sparql_debug);
        dataset.add_endpoints(&config.endpoints[..]);
        Ok(dataset)
    }

    /// Log synthesized endpoint queries at info level instead of debug.
    pub fn with_sparql_debug(mut self, on: bool) -> Self {
        self.sparql_debug = on;
        self
    }

    /// Registers an endpoint that is sent every pattern. Re-adding a URI
    /// replaces its policy but keeps what was already asked of it.
    pub fn add_endpoint(&mut self, uri: impl Into<String>) -> &mut Self {
        self.add_endpoint_with_stats(uri, Box::new(SparqlStats))
    }

    pub fn add_endpoint_with_stats(
        &mut self,
        uri: impl Into<String>,
        stats: Box<dyn EndpointStats>,
    ) -> &mut Self {
        let uri = uri.into();
        debug!("Adding endpoint <{uri}> ({})", stats.policy_name());
        self.endpoints
            .insert(uri.clone(), Endpoint { uri, stats });
        self
    }

    pub fn add_endpoints(&mut self, uris: impl IntoUris) -> &mut Self {
        for uri in uris.into_uris() {
            self.add_endpoint(uri);
        }
        self
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.values()
    }

    /// Adds a graph whose triples are served alongside the data cache.
    pub fn add_graph(&mut self, graph: Graph) -> &mut Self {
        self.graphs.push(graph);
        self
    }

    /// The graph that accumulates endpoint answers and local edits.
    pub fn data_cache(&self) -> &Graph {
        &self.data_cache
    }

    /// The data cache followed by every added graph.
    pub fn graphs(&self) -> impl Iterator<Item = &Graph> {
        std::iter::once(&self.data_cache).chain(self.graphs.iter())
    }

    /// Whether exactly `pattern` has already been sent to `endpoint`.
    pub fn was_queried(&self, endpoint: &str, pattern: &TriplePattern) -> bool {
        self.pattern_cache
            .borrow()
            .get(endpoint)
            .is_some_and(|asked| asked.contains(pattern))
    }

    /// Endpoints that `pattern` would be sent to now. Patterns mentioning a
    /// blank node are never sent anywhere.
    pub fn select_endpoints(&self, pattern: &TriplePattern) -> Vec<String> {
        if NoAutoQuery::active() {
            return Vec::new();
        }
        if [&pattern.0, &pattern.1, &pattern.2]
            .into_iter()
            .any(|term| term.as_ref().is_some_and(Node::is_blank))
        {
            return Vec::new();
        }
        let _guard = NoAutoQuery::enter();
        self.endpoints
            .values()
            .filter(|ep| !self.was_queried(&ep.uri, pattern))
            .filter(|ep| ep.stats.use_for_triple(self, pattern))
            .map(|ep| ep.uri.clone())
            .collect()
    }

    /// Endpoints that an ad hoc query would be sent to now.
    pub fn select_query_endpoints(&self, query: &str) -> Vec<String> {
        if NoAutoQuery::active() {
            return Vec::new();
        }
        let _guard = NoAutoQuery::enter();
        self.endpoints
            .values()
            .filter(|ep| ep.stats.use_for_query(self, query))
            .map(|ep| ep.uri.clone())
            .collect()
    }

    /// The CONSTRUCT query fetching `pattern`, preceded by a PREFIX line for
    /// each registered namespace. `None` when a term has no query form; a
    /// bound URI that is not a valid IRI is a resolution error.
    pub fn construct_query(&self, pattern: &TriplePattern) -> Result<Option<String>> {
        let term = |node: &Option<Node>, var: &str| match node {
            Some(n) => n.to_sparql(),
            None => Ok(Some(var.to_string())),
        };
        let (Some(s), Some(p), Some(o)) = (
            term(&pattern.0, "?x")?,
            term(&pattern.1, "?y")?,
            term(&pattern.2, "?z")?,
        ) else {
            return Ok(None);
        };
        let mut query = String::new();
        for (prefix, uri) in self.data_cache.namespaces() {
            query.push_str(&format!("PREFIX {prefix}: <{uri}>\n"));
        }
        query.push_str(&format!("CONSTRUCT {{ {s} {p} {o} }} WHERE {{ {s} {p} {o} }}"));
        Ok(Some(query))
    }

    /// Sends `query` to a single endpoint, regardless of its policy.
    pub fn query_endpoint(&self, endpoint: &str, query: &str) -> Result<SparqlList<'_>> {
        self.log_query(endpoint, query);
        let rows = self.client.select(endpoint, query)?;
        Ok(SparqlList::from_rows(self, rows))
    }

    pub fn serialize(&self, format: Format) -> Result<Vec<u8>> {
        self.data_cache.serialize(format)
    }

    fn log_query(&self, endpoint: &str, query: &str) {
        if self.sparql_debug {
            info!("Querying <{endpoint}>:\n{query}");
        } else {
            debug!("Querying <{endpoint}>:\n{query}");
        }
    }

    fn fetch_pattern(&self, pattern: &TriplePattern) -> Result<()> {
        let endpoints = self.select_endpoints(pattern);
        if endpoints.is_empty() {
            return Ok(());
        }
        let Some(query) = self.construct_query(pattern)? else {
            return Ok(());
        };
        for endpoint in endpoints {
            // recorded first: a failed query is not repeated
            self.pattern_cache
                .borrow_mut()
                .entry(endpoint.clone())
                .or_default()
                .insert(pattern.clone());
            self.log_query(&endpoint, &query);
            let answer = self.client.construct(&endpoint, &query)?;
            let text = answer.text()?;
            let format = sniff_format(&text, answer.content_type.as_deref(), &endpoint)?;
            self.data_cache.read_as(&text, format)?;
        }
        Ok(())
    }
}

impl GraphView for Dataset {
    fn node_triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<TripleIter> {
        let pattern = (subject.cloned(), predicate.cloned(), object.cloned());
        self.fetch_pattern(&pattern)?;
        let mut parts = Vec::with_capacity(self.graphs.len() + 1);
        for graph in self.graphs() {
            parts.push(graph.node_triples(subject, predicate, object)?);
        }
        Ok(Box::new(parts.into_iter().flatten()))
    }

    fn add_node_triple(&self, subject: &Node, predicate: &Node, object: &Node) -> Result<()> {
        self.data_cache.add_node_triple(subject, predicate, object)
    }

    fn remove_node_triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<usize> {
        self.data_cache
            .remove_node_triples(subject, predicate, object)
    }

    fn load_uri(&self, uri: &str, options: LoadOptions) -> Result<()> {
        self.data_cache.load_uri(uri, options)
    }

    fn expand_uri(&self, name: &str) -> String {
        self.data_cache.expand_uri(name)
    }

    fn shrink_uri(&self, uri: &str) -> String {
        self.data_cache.shrink_uri(uri)
    }

    fn namespaces(&self) -> BTreeMap<String, String> {
        self.data_cache.namespaces()
    }

    fn add_namespace(&self, prefix: &str, uri: &str) {
        self.data_cache.add_namespace(prefix, uri)
    }

    /// Local graphs first, then every endpoint whose policy accepts the query.
    fn sparql_rows(&self, query: &str) -> Result<Vec<NodeBindings>> {
        let mut rows = Vec::new();
        for graph in self.graphs() {
            rows.extend(graph.sparql_rows(query)?);
        }
        for endpoint in self.select_query_endpoints(query) {
            self.log_query(&endpoint, query);
            rows.extend(self.client.select(&endpoint, query)?);
        }
        Ok(rows)
    }
}
