use rdfgraph::fetch::FetchOptions;
use rdfgraph::{Config, Graph, GraphView, LoadOptions, WebCache};
use std::path::PathBuf;
use std::sync::Arc;

const DOC: &str = "@prefix ex: <http://example.org/> .\nex:a ex:p ex:b .\n";

#[test]
fn test_loads_go_through_the_web_cache() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("doc.ttl");
    std::fs::write(&doc, DOC).unwrap();
    let uri = Graph::file_uri(&doc).unwrap();

    let cache = Arc::new(WebCache::open(dir.path().join("web")).unwrap());
    let g = Graph::new().unwrap().with_web_cache(cache.clone());
    g.load(&uri, LoadOptions::default()).unwrap();
    assert!(cache.has(&uri));
    assert_eq!(g.len().unwrap(), 1);

    // a fresh graph over the same cache no longer needs the source
    std::fs::remove_file(&doc).unwrap();
    let reopened = Arc::new(WebCache::open(dir.path().join("web")).unwrap());
    let g = Graph::new().unwrap().with_web_cache(reopened);
    g.load(&uri, LoadOptions::default()).unwrap();
    let a = g.resource("http://example.org/a").unwrap();
    assert_eq!(a.get("http://example.org/p").unwrap().unwrap(), "http://example.org/b");

    // forcing a reload bypasses the cache and fails without the file
    assert!(g.load(&uri, LoadOptions::default().reload()).is_err());
}

#[test]
fn test_offline_graph_serves_cache_hits_only() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(WebCache::open(dir.path()).unwrap());
    cache
        .set("http://example.org/doc", "<http://example.org/a> <http://example.org/p> 1 .")
        .unwrap();
    let g = Graph::new()
        .unwrap()
        .with_web_cache(cache)
        .with_fetch_options(FetchOptions {
            offline: true,
            ..Default::default()
        });
    g.load("http://example.org/doc", LoadOptions::default())
        .unwrap();
    assert_eq!(g.len().unwrap(), 1);

    let err = g
        .load("http://example.org/other", LoadOptions::default())
        .unwrap_err();
    assert!(err
        .downcast_ref::<rdfgraph::OfflineRetrievalError>()
        .is_some());
}

#[test]
fn test_graph_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::builder()
        .cache_dir(Some(PathBuf::from(dir.path())))
        .offline(true)
        .build()
        .unwrap();
    config
        .namespaces
        .insert("ex".to_string(), "http://example.org/".to_string());
    let g = Graph::from_config(&config).unwrap();
    assert_eq!(g.expand_uri("ex:a"), "http://example.org/a");
    let cache = g.web_cache().unwrap();
    assert_eq!(cache.dir(), dir.path().join("web"));
    assert!(cache.is_empty());
}

#[test]
fn test_missing_payload_falls_back_to_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("doc.ttl");
    std::fs::write(&doc, DOC).unwrap();
    let uri = Graph::file_uri(&doc).unwrap();

    let cache = Arc::new(WebCache::open(dir.path().join("web")).unwrap());
    Graph::new()
        .unwrap()
        .with_web_cache(cache.clone())
        .load(&uri, LoadOptions::default())
        .unwrap();
    let payload = cache.path(&uri).unwrap();
    assert!(payload
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("d-"));
    std::fs::remove_file(&payload).unwrap();
    assert!(cache.has(&uri));

    let g = Graph::new().unwrap().with_web_cache(cache.clone());
    g.load(&uri, LoadOptions::default()).unwrap();
    assert_eq!(g.len().unwrap(), 1);
    assert!(cache.has(&uri));
    assert!(payload.exists());
}
