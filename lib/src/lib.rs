//! An object model over RDF graphs.
//!
//! [`Graph`] wraps a triple store and hands out [`Resource`]s that navigate
//! it (`person.get("foaf:name")`, `person.all("-foaf:knows")`). Documents are
//! loaded on demand, at most once each, optionally through an on-disk
//! [`WebCache`]. A [`Dataset`] additionally pulls triples from SPARQL
//! endpoints as resources ask for them.

extern crate derive_builder;

pub mod cache;
pub mod config;
pub mod consts;
pub mod dataset;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod format;
pub mod graph;
pub mod node;
pub mod options;
pub mod policy;
pub mod reiterable;
pub mod resource;
pub mod sparql;
pub mod util;

pub use cache::WebCache;
pub use config::Config;
pub use dataset::{no_auto_query, Dataset, Endpoint, NoAutoQuery, TriplePattern};
pub use engine::{Engine, MemoryEngine};
pub use errors::{GraphError, OfflineRetrievalError};
pub use format::Format;
pub use graph::{Graph, GraphView};
pub use node::{Node, NodeArg};
pub use options::{AliasLookup, LoadOptions};
pub use reiterable::Reiterable;
pub use resource::{Resource, ResourceList, SparqlList};

/// Initializes logging for the rdfgraph library.
///
/// If `RDFGRAPH_LOG` is set, `RUST_LOG` is set to its value, so it takes
/// precedence. The logger itself (e.g. `env_logger::init()`) must be
/// initialized after this call for the level to take effect.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("RDFGRAPH_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
