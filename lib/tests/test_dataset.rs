use anyhow::{anyhow, Result};
use rdfgraph::fetch::{FetchOptions, FetchResult};
use rdfgraph::node::NodeBindings;
use rdfgraph::policy::NamespaceStats;
use rdfgraph::sparql::SparqlClient;
use rdfgraph::{no_auto_query, Dataset, Format, Graph, GraphView, MemoryEngine, Node};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Serves canned Turtle per endpoint and logs every request. A route only
/// answers queries containing its needle; the empty needle matches anything.
#[derive(Default, Clone)]
struct FakeEndpoints {
    routes: Rc<Vec<(String, String, String)>>,
    log: Rc<RefCell<Vec<(String, String)>>>,
}

impl FakeEndpoints {
    fn new(data: &[(&str, &str)]) -> Self {
        let routes: Vec<(&str, &str, &str)> = data.iter().map(|(e, t)| (*e, "", *t)).collect();
        Self::routed(&routes)
    }

    fn routed(routes: &[(&str, &str, &str)]) -> Self {
        Self {
            routes: Rc::new(
                routes
                    .iter()
                    .map(|(e, n, t)| (e.to_string(), n.to_string(), t.to_string()))
                    .collect(),
            ),
            log: Default::default(),
        }
    }

    fn requests_to(&self, endpoint: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .count()
    }
}

impl SparqlClient for FakeEndpoints {
    fn construct(&self, endpoint: &str, query: &str) -> Result<FetchResult> {
        self.log
            .borrow_mut()
            .push((endpoint.to_string(), query.to_string()));
        if !self.routes.iter().any(|(e, _, _)| e == endpoint) {
            return Err(anyhow!("no such endpoint {endpoint}"));
        }
        let turtle: Vec<&str> = self
            .routes
            .iter()
            .filter(|(e, needle, _)| e == endpoint && query.contains(needle.as_str()))
            .map(|(_, _, t)| t.as_str())
            .collect();
        Ok(FetchResult {
            bytes: turtle.join("\n").into_bytes(),
            final_url: endpoint.to_string(),
            content_type: Some("text/turtle; charset=utf-8".to_string()),
        })
    }

    fn select(&self, endpoint: &str, query: &str) -> Result<Vec<NodeBindings>> {
        self.log
            .borrow_mut()
            .push((endpoint.to_string(), query.to_string()));
        Ok(Vec::new())
    }
}

const A: &str = "http://a.example/sparql";
const B: &str = "http://b.example/sparql";

fn two_endpoint_dataset() -> (Dataset, FakeEndpoints) {
    let fake = FakeEndpoints::new(&[
        (A, "<http://ex.org/bob> <http://xmlns.com/foaf/0.1/name> \"Bob\" ."),
        (
            B,
            "<http://ex.org/bob> <http://xmlns.com/foaf/0.1/knows> <http://ex.org/alice> .",
        ),
    ]);
    let mut ds = Dataset::with_client(Graph::new().unwrap(), Box::new(fake.clone()));
    ds.add_endpoints([A, B]);
    (ds, fake)
}

#[test]
fn test_one_construct_per_endpoint_and_pattern() {
    let _ = env_logger::builder().is_test(true).try_init();
    let (ds, fake) = two_endpoint_dataset();
    let bob = ds.resource("http://ex.org/bob").unwrap();
    for _ in 0..3 {
        assert_eq!(bob.get("foaf:name").unwrap().unwrap(), "Bob");
    }
    assert_eq!(fake.requests_to(A), 1);
    assert_eq!(fake.requests_to(B), 1);

    let (_, query) = fake.log.borrow()[0].clone();
    assert!(query.contains("PREFIX foaf: <http://xmlns.com/foaf/0.1/>"));
    assert!(query.contains(
        "CONSTRUCT { <http://ex.org/bob> <http://xmlns.com/foaf/0.1/name> ?z } \
         WHERE { <http://ex.org/bob> <http://xmlns.com/foaf/0.1/name> ?z }"
    ));

    // answers from either endpoint land in the shared data cache
    let knows = bob.get("foaf:knows").unwrap().unwrap();
    assert_eq!(knows, "http://ex.org/alice");
    assert_eq!(fake.requests_to(A), 2);
    assert_eq!(fake.requests_to(B), 2);
    assert_eq!(ds.data_cache().len().unwrap(), 2);
}

#[test]
fn test_no_auto_query_serves_local_data() {
    let (ds, fake) = two_endpoint_dataset();
    ds.data_cache()
        .read_turtle("<http://ex.org/carol> <http://xmlns.com/foaf/0.1/name> \"Carol\" .")
        .unwrap();
    let name = no_auto_query(|| {
        let carol = ds.resource("http://ex.org/carol").unwrap();
        carol.get("foaf:name").unwrap().map(|r| r.to_string())
    });
    assert_eq!(name.as_deref(), Some("Carol"));
    assert!(fake.log.borrow().is_empty());
}

#[test]
fn test_failed_construct_is_not_retried() {
    let fake = FakeEndpoints::new(&[]);
    let mut ds = Dataset::with_client(Graph::new().unwrap(), Box::new(fake.clone()));
    ds.add_endpoint(A);
    let bob = ds.resource("http://ex.org/bob").unwrap();
    assert!(bob.get("foaf:name").is_err());
    assert!(bob.get("foaf:name").unwrap().is_none());
    assert_eq!(fake.requests_to(A), 1);
}

#[test]
fn test_namespace_stats_route_patterns() {
    let fake = FakeEndpoints::new(&[
        (A, "<http://ex.org/bob> <http://xmlns.com/foaf/0.1/name> \"Bob\" ."),
        (B, ""),
    ]);
    let mut ds = Dataset::with_client(Graph::new().unwrap(), Box::new(fake.clone()));
    ds.add_endpoint_with_stats(A, Box::new(NamespaceStats::new(["http://ex.org/", "foaf"])));
    ds.add_endpoint_with_stats(B, Box::new(NamespaceStats::new(["http://elsewhere.org/"])));

    let bob = ds.resource("http://ex.org/bob").unwrap();
    assert_eq!(bob.get("foaf:name").unwrap().unwrap(), "Bob");
    assert_eq!(fake.requests_to(A), 1);
    assert_eq!(fake.requests_to(B), 0);
}

#[test]
fn test_local_edits_and_serialization() {
    let (ds, _) = two_endpoint_dataset();
    let carol = ds.resource("http://ex.org/carol").unwrap();
    carol.add("foaf:name", "Carol").unwrap();
    let turtle = String::from_utf8(ds.serialize(Format::Turtle).unwrap()).unwrap();
    assert!(turtle.contains("Carol"));
    assert!(!ds.was_queried(A, &(Some(Node::uri("http://ex.org/carol")), None, None)));
}

fn offline_graph() -> Graph {
    let engine = MemoryEngine::with_fetch_options(FetchOptions {
        offline: true,
        ..Default::default()
    })
    .unwrap();
    Graph::with_engine(Box::new(engine))
}

const OWL_SAME_AS: &str = "<http://www.w3.org/2002/07/owl#sameAs>";

fn alias_endpoints() -> FakeEndpoints {
    let bob_same_as = format!("<http://ex.org/bob> {OWL_SAME_AS}");
    FakeEndpoints::routed(&[
        (
            A,
            "<http://ex.org/alice> <http://xmlns.com/foaf/0.1/knows>",
            "<http://ex.org/alice> <http://xmlns.com/foaf/0.1/knows> <http://ex.org/bob> .",
        ),
        (
            A,
            bob_same_as.as_str(),
            "<http://ex.org/bob> <http://www.w3.org/2002/07/owl#sameAs> <http://ex.org/robert> .",
        ),
        (
            B,
            "<http://ex.org/robert>",
            "<http://ex.org/robert> <http://xmlns.com/foaf/0.1/nick> \"Rob\" .",
        ),
    ])
}

fn assert_no_repeated_requests(fake: &FakeEndpoints) {
    let log = fake.log.borrow();
    let distinct: HashSet<&(String, String)> = log.iter().collect();
    assert_eq!(distinct.len(), log.len());
}

#[test]
fn test_same_as_aliases_are_resolved_through_endpoints() {
    let fake = alias_endpoints();
    let mut ds = Dataset::with_client(offline_graph(), Box::new(fake.clone()));
    ds.add_endpoints([A, B]);

    let bob = ds.resource("http://ex.org/bob").unwrap();
    assert!(bob.get("foaf:nick").unwrap().is_none());
    bob.load_same_as().unwrap();
    assert_eq!(bob.same_as().len(), 1);
    assert_eq!(bob.same_as()[0], "http://ex.org/robert");
    assert_eq!(bob.get("foaf:nick").unwrap().unwrap(), "Rob");

    // a second pass asks nothing new
    let asked = fake.log.borrow().len();
    bob.load_same_as().unwrap();
    assert_eq!(bob.all("foaf:nick").unwrap().len(), 1);
    assert_eq!(fake.log.borrow().len(), asked);
    assert_no_repeated_requests(&fake);
    assert!(ds.was_queried(
        B,
        &(
            Some(Node::uri("http://ex.org/robert")),
            Some(Node::uri("http://xmlns.com/foaf/0.1/nick")),
            None
        )
    ));
}

#[test]
fn test_resource_lists_load_aliases() {
    let fake = alias_endpoints();
    let mut ds = Dataset::with_client(offline_graph(), Box::new(fake.clone()));
    ds.add_endpoints([A, B]);

    let friends = ds
        .resource("http://ex.org/alice")
        .unwrap()
        .all("foaf:knows")
        .unwrap();
    assert_eq!(friends.join(", "), "http://ex.org/bob");
    friends.load_same_as().unwrap();
    assert_eq!(friends.get("foaf:nick").unwrap().join(", "), "Rob");
    assert_no_repeated_requests(&fake);
}
