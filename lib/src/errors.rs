//! Error kinds surfaced by the graph, cache and federation layers.
//!
//! Library functions return `anyhow::Result`; the variants below are wrapped
//! into `anyhow::Error` so callers can recover the kind with
//! `err.downcast_ref::<GraphError>()`.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Sniffing or explicit format resolution produced something that is not RDF.
    #[error("unsupported RDF payload from {source_name}: {reason}")]
    Format { source_name: String, reason: String },

    /// An explicit format token did not name any supported serialization.
    #[error("unknown RDF format '{0}'")]
    UnknownFormat(String),

    /// Fetching or parsing a URI failed.
    #[error("failed to load <{uri}>: {reason}")]
    Load { uri: String, reason: String },

    /// A term could not be used in the position it was given.
    #[error("cannot use {term} as {position}")]
    Resolution { term: String, position: &'static str },

    /// The web cache index could not be read during a strict load.
    #[error("web cache index at {path} is unreadable: {reason}")]
    CacheCorruption { path: String, reason: String },

    /// The web cache has no entry for the URI.
    #[error("no web cache entry for <{0}>")]
    CacheMiss(String),

    /// A SPARQL column that should be summed holds a non-numeric value.
    #[error("value '{value}' bound to ?{var} is not numeric")]
    NotNumeric { var: String, value: String },
}

impl GraphError {
    pub fn resolution(term: impl fmt::Display, position: &'static str) -> Self {
        GraphError::Resolution {
            term: term.to_string(),
            position,
        }
    }

    pub fn load(uri: impl Into<String>, reason: impl fmt::Display) -> Self {
        GraphError::Load {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }
}

// OfflineRetrieval error

#[derive(Debug)]
pub struct OfflineRetrievalError {
    pub file: String,
}

impl fmt::Display for OfflineRetrievalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Refusing to contact {} while offline", self.file)
    }
}

impl std::error::Error for OfflineRetrievalError {}
