use anyhow::Result;
use rdfgraph::engine::{Engine, MemoryEngine, TripleIter};
use rdfgraph::fetch::FetchOptions;
use rdfgraph::node::NodeBindings;
use rdfgraph::{Format, Graph, GraphError, GraphView, LoadOptions, Node, Resource};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;

const SAMPLE_RDFXML: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description rdf:about="tag:dummy1">
    <rdf:type rdf:resource="tag:dummy2"/>
  </rdf:Description>
</rdf:RDF>
"#;

const SAMPLE_RDFXML_BNODE: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <rdf:Description>
    <rdf:type rdf:resource="tag:dummy2"/>
  </rdf:Description>
</rdf:RDF>
"#;

const SAMPLE_NTRIPLES: &str =
    "<tag:dummy1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <tag:dummy2> .\n";

const SAMPLE_N3: &str = "@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
<tag:dummy1> rdf:type <tag:dummy2> .
";

const SAMPLE_TTL: &str = "
<tag:dummy1>
  a <tag:dummy2> .
";

fn assert_dummy_type(g: &Graph) {
    let ty = g.resource("tag:dummy1").unwrap().get("rdf:type").unwrap();
    assert_eq!(ty.unwrap().uri(), Some("tag:dummy2"));
}

#[test]
fn test_read_formats() {
    let g = Graph::new().unwrap();
    g.read_rdfxml(SAMPLE_RDFXML).unwrap();
    assert_dummy_type(&g);

    let g = Graph::new().unwrap();
    g.read_ntriples(SAMPLE_NTRIPLES).unwrap();
    assert_dummy_type(&g);

    let g = Graph::new().unwrap();
    g.read_n3(SAMPLE_N3).unwrap();
    assert_dummy_type(&g);

    let g = Graph::new().unwrap();
    g.read_turtle(SAMPLE_TTL).unwrap();
    assert_dummy_type(&g);
}

#[test]
fn test_read_rdfxml_blank_subject() {
    let g = Graph::new().unwrap();
    g.read_rdfxml(SAMPLE_RDFXML_BNODE).unwrap();
    let triples = g.triples(None::<&str>, None::<&str>, None::<&str>).unwrap();
    assert_eq!(triples.len(), 1);
    for (s, _, o) in triples.iter() {
        assert!(s.is_blank());
        assert_eq!(o.uri(), Some("tag:dummy2"));
    }
}

#[test]
fn test_sniffed_text() {
    let g = Graph::new().unwrap();
    g.read_text(SAMPLE_RDFXML, None).unwrap();
    g.read_text("<tag:dummy3> a <tag:dummy2> .", None).unwrap();
    let typed = g.all_of_type("tag:dummy2").unwrap();
    assert_eq!(typed.join(", "), "tag:dummy1, tag:dummy3");

    let err = g
        .read_text("<!DOCTYPE html><html><body>nope</body></html>", None)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GraphError>(),
        Some(GraphError::Format { .. })
    ));
}

#[test]
fn test_set_literals() {
    let g = Graph::new().unwrap();
    g.read_turtle(SAMPLE_TTL).unwrap();
    let r = g.resource("tag:dummy1").unwrap();

    let other = g.resource("tag:other").unwrap();
    r.set("tag:p", &other).unwrap();
    assert_eq!(r.get("tag:p").unwrap().unwrap(), other);

    r.set("tag:char", "A").unwrap();
    let char = r.get("tag:char").unwrap().unwrap();
    assert!(char.is_literal());
    assert_eq!(char, "A");

    r.set("tag:p", 2).unwrap();
    assert_eq!(r.get("tag:p").unwrap().unwrap().value(), Some("2"));
    r.set("tag:p", "Wibble").unwrap();
    let values = r.all("tag:p").unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values.first().unwrap(), "Wibble");
}

#[test]
fn test_inverse_and_navigation() {
    let g = Graph::new().unwrap();
    g.read_turtle("<tag:1> <tag:r> <tag:2> . <tag:3> <tag:r> <tag:2> .")
        .unwrap();
    let two = g.resource("tag:2").unwrap();
    let mut back: Vec<String> = two.all("-tag:r").unwrap().map(|r| r.to_string());
    back.sort();
    assert_eq!(back, vec!["tag:1", "tag:3"]);
    assert!(two.get("tag:r").unwrap().is_none());
    assert!(g.has_triple("tag:1", "tag:r", "tag:2").unwrap());
    assert!(!g.has_triple("tag:2", "tag:r", "tag:1").unwrap());
}

#[test]
fn test_same_as_aliases() {
    // offline keeps the alias loads local
    let engine = MemoryEngine::with_fetch_options(FetchOptions {
        offline: true,
        ..Default::default()
    })
    .unwrap();
    let g = Graph::with_engine(Box::new(engine));
    g.read_turtle(
        r#"@prefix owl: <http://www.w3.org/2002/07/owl#> .
        @prefix foaf: <http://xmlns.com/foaf/0.1/> .
        <tag:bob> owl:sameAs <tag:robert> .
        <tag:robert> foaf:name "Bob" ."#,
    )
    .unwrap();
    let bob = g.resource("tag:bob").unwrap();
    assert!(bob.get("foaf:name").unwrap().is_none());

    bob.load_same_as().unwrap();
    assert_eq!(bob.same_as(), vec![g.resource("tag:robert").unwrap()]);
    assert_eq!(bob.get("foaf:name").unwrap().unwrap(), "Bob");
    assert!(bob
        .get_with("foaf:name", rdfgraph::AliasLookup::Direct)
        .unwrap()
        .is_none());
    // the failed alias fetch is remembered
    assert!(g.is_loaded("tag:robert"));

    let turtle = bob.to_turtle(false).unwrap();
    assert!(turtle.contains("Bob"));
}

#[test]
fn test_resource_lists() {
    let g = Graph::new().unwrap();
    let one = g.resource("tag:1").unwrap();
    let two = g.resource("tag:2").unwrap();
    let list: rdfgraph::ResourceList<'_> = vec![one.clone()].into_iter().collect();
    let both = list.add(&two);
    assert_eq!(both.join(", "), "tag:2, tag:1");
    assert_eq!(both.remove(&two).join(", "), "tag:1");
    assert!(both.contains(&one));

    g.read_turtle(
        "<tag:1> <tag:rank> 10 . <tag:2> <tag:rank> 9 . <tag:1> <tag:knows> <tag:2> .",
    )
    .unwrap();
    assert_eq!(both.sort("tag:rank").unwrap().join(", "), "tag:2, tag:1");
    assert_eq!(both.get("tag:knows").unwrap().join(", "), "tag:2");
    assert!(both.has("tag:knows").unwrap());
}

#[test]
fn test_namespaces() {
    let g = Graph::new().unwrap();
    g.add_namespaces([("ex", "http://example.org/ns#")]);
    let r = g.resource("ex:thing").unwrap();
    assert_eq!(r.uri(), Some("http://example.org/ns#thing"));
    assert_eq!(r.shrink_uri().unwrap(), "ex:thing");
    assert!(r.in_ns("ex"));
    assert!(r.in_ns("http://example.org/"));
    assert!(!r.in_ns("foaf"));
    assert_eq!(r.get_ns().unwrap(), "http://example.org/ns#");

    let plain = g.resource("http://other.org/a/b").unwrap();
    assert_eq!(plain.get_ns().unwrap(), "http://other.org/a/");
}

#[test]
fn test_sparql_count() {
    let g = Graph::new().unwrap();
    g.read_turtle("<tag:a> <tag:p> 1 . <tag:b> <tag:p> 2 . <tag:c> <tag:p> 3 .")
        .unwrap();
    let rows = g
        .sparql("SELECT ?s ?n WHERE { ?s <tag:p> ?n } ORDER BY ?n")
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows.get("?s").join(", "), "tag:a, tag:b, tag:c");
    assert_eq!(rows.count("n").unwrap(), 6.0);
    assert!(matches!(
        rows.count("s").unwrap_err().downcast_ref::<GraphError>(),
        Some(GraphError::NotNumeric { .. })
    ));
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let g = Graph::new().unwrap();
    g.read_turtle(
        "<http://example.org/a> <http://example.org/p> \"x\" .
         <http://example.org/a> <http://example.org/q> <http://example.org/b> .",
    )
    .unwrap();
    for format in [Format::Turtle, Format::NTriples, Format::RdfXml, Format::N3] {
        let path = dir.path().join(format!("out.{}", format.extension()));
        g.save_file(&path, None).unwrap();
        let copy = Graph::new().unwrap();
        copy.load_file(&path, None).unwrap();
        assert_eq!(copy.len().unwrap(), 2, "{format}");
        assert!(copy.is_loaded(&Graph::file_uri(&path).unwrap()));
    }
}

#[test]
fn test_allow_error_continues_batch() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.ttl");
    std::fs::write(&good, "<tag:a> <tag:p> <tag:b> .").unwrap();
    let missing = dir.path().join("missing.ttl");
    let uris = vec![
        Graph::file_uri(&missing).unwrap(),
        Graph::file_uri(&good).unwrap(),
    ];

    let g = Graph::new().unwrap();
    assert!(g.load(&uris[..], LoadOptions::default()).is_err());

    let g = Graph::new().unwrap();
    g.load(&uris[..], LoadOptions::default().allow_error()).unwrap();
    assert_eq!(g.len().unwrap(), 1);
}

/// Counts calls to `load_uri` and answers them from a fixed document.
struct CountingEngine {
    inner: MemoryEngine,
    loads: Rc<Cell<usize>>,
}

impl Engine for CountingEngine {
    fn triples(
        &self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<TripleIter> {
        self.inner.triples(subject, predicate, object)
    }

    fn sparql(&self, query: &str) -> Result<Vec<NodeBindings>> {
        self.inner.sparql(query)
    }

    fn load_uri(&mut self, uri: &str, _format: Option<Format>) -> Result<()> {
        self.loads.set(self.loads.get() + 1);
        self.inner.load_text(
            &format!("<{uri}> <tag:loaded> true ."),
            Format::Turtle,
            None,
        )
    }

    fn load_text(&mut self, text: &str, format: Format, base: Option<&str>) -> Result<()> {
        self.inner.load_text(text, format, base)
    }

    fn expand_uri(&self, name: &str) -> String {
        self.inner.expand_uri(name)
    }

    fn shrink_uri(&self, uri: &str) -> String {
        self.inner.shrink_uri(uri)
    }

    fn add_namespace(&mut self, prefix: &str, uri: &str) {
        self.inner.add_namespace(prefix, uri)
    }

    fn namespaces(&self) -> BTreeMap<String, String> {
        self.inner.namespaces()
    }

    fn set_triple(&mut self, subject: &Node, predicate: &Node, object: &Node) -> Result<()> {
        self.inner.set_triple(subject, predicate, object)
    }

    fn remove_triples(
        &mut self,
        subject: Option<&Node>,
        predicate: Option<&Node>,
        object: Option<&Node>,
    ) -> Result<usize> {
        self.inner.remove_triples(subject, predicate, object)
    }

    fn serialize(&self, format: Format) -> Result<Vec<u8>> {
        self.inner.serialize(format)
    }
}

#[test]
fn test_load_dedup() {
    let loads = Rc::new(Cell::new(0));
    let g = Graph::with_engine(Box::new(CountingEngine {
        inner: MemoryEngine::new().unwrap(),
        loads: loads.clone(),
    }));
    g.load("http://example.org/doc", LoadOptions::default())
        .unwrap();
    g.load("http://example.org/doc#me", LoadOptions::default())
        .unwrap();
    g.load(
        vec!["http://example.org/doc", "http://example.org/doc#you"],
        LoadOptions::default(),
    )
    .unwrap();
    assert_eq!(loads.get(), 1);

    g.load("http://example.org/doc", LoadOptions::default().reload())
        .unwrap();
    assert_eq!(loads.get(), 2);

    let me: Resource<'_> = g.resource("http://example.org/doc#me").unwrap();
    me.load().unwrap();
    assert_eq!(loads.get(), 2);
}

#[test]
fn test_save_file_writes_prefixes() {
    let g = Graph::new().unwrap();
    g.read_turtle("<http://xmlns.com/foaf/0.1/a> <http://xmlns.com/foaf/0.1/b> \"c\" .")
        .unwrap();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&g.serialize(Format::Turtle).unwrap())
        .unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    assert!(text.contains("@prefix foaf:"));
}
