// Endpoint selection policies. A dataset asks each endpoint's policy whether
// a triple pattern or an ad hoc query is worth sending there. Policies run
// with automatic endpoint querying suspended, so they may look at the
// dataset's local data freely.

use crate::dataset::{Dataset, TriplePattern};
use crate::graph::GraphView;
use crate::node::Node;

pub trait EndpointStats {
    fn use_for_triple(&self, dataset: &Dataset, pattern: &TriplePattern) -> bool;
    fn use_for_query(&self, dataset: &Dataset, query: &str) -> bool;
    fn policy_name(&self) -> &'static str;
}

/// Sends everything to the endpoint.
#[derive(Debug, Default, Clone)]
pub struct SparqlStats;

impl EndpointStats for SparqlStats {
    fn use_for_triple(&self, _dataset: &Dataset, _pattern: &TriplePattern) -> bool {
        true
    }

    fn use_for_query(&self, _dataset: &Dataset, _query: &str) -> bool {
        true
    }

    fn policy_name(&self) -> &'static str {
        "sparql"
    }
}

/// Sends a triple pattern only when every URI bound in it lies in one of the
/// given namespaces. Namespaces may be full URIs or prefixes registered on the
/// dataset. Ad hoc queries are always sent.
#[derive(Debug, Default, Clone)]
pub struct NamespaceStats {
    namespaces: Vec<String>,
}

impl NamespaceStats {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }
}

impl EndpointStats for NamespaceStats {
    fn use_for_triple(&self, dataset: &Dataset, pattern: &TriplePattern) -> bool {
        let prefixes = dataset.namespaces();
        let namespaces: Vec<&str> = self
            .namespaces
            .iter()
            .map(|ns| prefixes.get(ns).map(String::as_str).unwrap_or(ns))
            .collect();
        [&pattern.0, &pattern.1, &pattern.2]
            .into_iter()
            .filter_map(|term| term.as_ref().and_then(Node::as_uri))
            .all(|uri| namespaces.iter().any(|ns| uri.starts_with(ns)))
    }

    fn use_for_query(&self, _dataset: &Dataset, _query: &str) -> bool {
        true
    }

    fn policy_name(&self) -> &'static str {
        "namespace"
    }
}
