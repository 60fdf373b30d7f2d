//! Talking to remote SPARQL endpoints over the SPARQL protocol.

use crate::errors::{GraphError, OfflineRetrievalError};
use crate::fetch::{build_accept, FetchOptions, FetchResult};
use crate::node::{Node, NodeBindings};
use anyhow::{anyhow, Result};
use log::debug;
use oxigraph::model::{Literal, NamedNode};
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use std::collections::HashMap;

/// Media types asked for when a CONSTRUCT query returns triples.
const CONSTRUCT_ACCEPT: &[(&str, f32)] = &[
    ("text/turtle", 0.9),
    ("application/n-triples", 0.8),
    ("application/rdf+xml", 0.5),
];

const RESULTS_JSON: &str = "application/sparql-results+json";

/// Transport used by a [`Dataset`](crate::dataset::Dataset) to reach its
/// endpoints.
pub trait SparqlClient {
    /// Runs a CONSTRUCT query and returns the serialized triples.
    fn construct(&self, endpoint: &str, query: &str) -> Result<FetchResult>;

    /// Runs a SELECT (or ASK) query and returns its rows.
    fn select(&self, endpoint: &str, query: &str) -> Result<Vec<NodeBindings>>;
}

/// [`SparqlClient`] over blocking HTTP form POSTs.
pub struct HttpSparqlClient {
    client: Client,
    offline: bool,
}

impl HttpSparqlClient {
    pub fn new(opts: &FetchOptions) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(opts.timeout).build()?,
            offline: opts.offline,
        })
    }

    fn post(&self, endpoint: &str, query: &str, accept: &str) -> Result<Response> {
        if self.offline {
            return Err(anyhow!(OfflineRetrievalError {
                file: endpoint.to_string()
            }));
        }
        debug!("POST {endpoint}");
        let resp = self
            .client
            .post(endpoint)
            .header(ACCEPT, accept)
            .form(&[("query", query)])
            .send()
            .map_err(|e| GraphError::load(endpoint, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GraphError::load(endpoint, format!("endpoint answered {status}")).into());
        }
        Ok(resp)
    }
}

impl SparqlClient for HttpSparqlClient {
    fn construct(&self, endpoint: &str, query: &str) -> Result<FetchResult> {
        let resp = self.post(endpoint, query, &build_accept(CONSTRUCT_ACCEPT))?;
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        let bytes = resp.bytes().map_err(|e| GraphError::load(endpoint, e))?.to_vec();
        Ok(FetchResult {
            bytes,
            final_url,
            content_type,
        })
    }

    fn select(&self, endpoint: &str, query: &str) -> Result<Vec<NodeBindings>> {
        let resp = self.post(endpoint, query, RESULTS_JSON)?;
        let bytes = resp.bytes().map_err(|e| GraphError::load(endpoint, e))?;
        parse_results_json(&bytes).map_err(|e| GraphError::load(endpoint, format!("{e:#}")).into())
    }
}

#[derive(Deserialize)]
struct ResultsDocument {
    results: Option<ResultSet>,
    boolean: Option<bool>,
}

#[derive(Deserialize)]
struct ResultSet {
    bindings: Vec<HashMap<String, JsonTerm>>,
}

#[derive(Deserialize)]
struct JsonTerm {
    #[serde(rename = "type")]
    kind: String,
    value: String,
    #[serde(rename = "xml:lang")]
    lang: Option<String>,
    datatype: Option<String>,
}

impl JsonTerm {
    fn into_node(self) -> Result<Node> {
        match self.kind.as_str() {
            "uri" => Ok(Node::Uri(self.value)),
            "bnode" => Ok(Node::Blank(self.value)),
            "literal" | "typed-literal" => {
                let literal = if let Some(lang) = self.lang {
                    Literal::new_language_tagged_literal(self.value, lang)?
                } else if let Some(datatype) = self.datatype {
                    Literal::new_typed_literal(self.value, NamedNode::new(datatype)?)
                } else {
                    Literal::new_simple_literal(self.value)
                };
                Ok(Node::Literal(literal))
            }
            other => Err(anyhow!("unknown binding type '{other}'")),
        }
    }
}

/// Parses an `application/sparql-results+json` document. An ASK answer
/// becomes a single row binding `result`.
pub fn parse_results_json(bytes: &[u8]) -> Result<Vec<NodeBindings>> {
    let doc: ResultsDocument = serde_json::from_slice(bytes)?;
    if let Some(value) = doc.boolean {
        let mut row = NodeBindings::new();
        row.insert(
            "result".to_string(),
            Node::Literal(crate::node::boolean_literal(value)),
        );
        return Ok(vec![row]);
    }
    let Some(results) = doc.results else {
        return Ok(Vec::new());
    };
    results
        .bindings
        .into_iter()
        .map(|binding| {
            binding
                .into_iter()
                .map(|(var, term)| Ok((var, term.into_node()?)))
                .collect::<Result<NodeBindings>>()
        })
        .collect()
}
