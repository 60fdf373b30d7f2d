//! RDF serialization names, media types and payload sniffing.

use crate::errors::GraphError;
use anyhow::Result;
use oxigraph::io::RdfFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Number of leading bytes inspected when guessing a payload's format.
const SNIFF_WINDOW: usize = 2048;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Format {
    RdfXml,
    Turtle,
    N3,
    NTriples,
}

impl Format {
    /// Resolves a user supplied format name. Matching is case-insensitive and an
    /// unrecognized name is an error, never a fallback.
    pub fn parse(token: &str) -> Result<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "rdfxml" | "rdf/xml" | "xml" | "rdf" => Ok(Format::RdfXml),
            "turtle" | "ttl" => Ok(Format::Turtle),
            "ntriples" | "n-triples" | "ntriple" | "nt" => Ok(Format::NTriples),
            "n3" => Ok(Format::N3),
            _ => Err(GraphError::UnknownFormat(token.to_string()).into()),
        }
    }

    /// Maps a response media type to a format. Generic types such as
    /// `text/plain` carry no information and yield `None`.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/turtle" | "application/x-turtle" => Some(Format::Turtle),
            "application/rdf+xml" | "text/xml" => Some(Format::RdfXml),
            "text/n3" | "text/rdf+n3" => Some(Format::N3),
            "application/n-triples" => Some(Format::NTriples),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str())? {
            "ttl" => Some(Format::Turtle),
            "xml" | "rdf" | "owl" => Some(Format::RdfXml),
            "n3" => Some(Format::N3),
            "nt" => Some(Format::NTriples),
            _ => None,
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            Format::RdfXml => "application/rdf+xml",
            Format::Turtle => "text/turtle",
            Format::N3 => "text/n3",
            Format::NTriples => "application/n-triples",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::RdfXml => "rdf",
            Format::Turtle => "ttl",
            Format::N3 => "n3",
            Format::NTriples => "nt",
        }
    }

    /// The parser used to read this format.
    pub fn parser_format(self) -> RdfFormat {
        match self {
            Format::RdfXml => RdfFormat::RdfXml,
            Format::Turtle => RdfFormat::Turtle,
            Format::N3 => RdfFormat::N3,
            Format::NTriples => RdfFormat::NTriples,
        }
    }

    /// The serializer used to write this format. Plain triples written as
    /// Turtle are valid N3.
    pub fn serializer_format(self) -> RdfFormat {
        match self {
            Format::N3 => RdfFormat::Turtle,
            other => other.parser_format(),
        }
    }
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Format::parse(s)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Format::RdfXml => "rdfxml",
            Format::Turtle => "turtle",
            Format::N3 => "n3",
            Format::NTriples => "ntriples",
        };
        write!(f, "{name}")
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Returns `true` when the start of the payload looks like an HTML page.
pub fn looks_like_html(data: &[u8]) -> bool {
    let sample = data[..data.len().min(SNIFF_WINDOW)].to_ascii_lowercase();
    contains(&sample, b"<html") || contains(&sample, b"<!doctype")
}

/// Decides how to parse `data`.
///
/// An informative media type wins. Otherwise the first 2KB are lower-cased and
/// checked, in order, for HTML markers (an error: HTML is never accepted as
/// RDF), RDF/XML root or closing tags, and a Turtle `@prefix`. Anything else
/// is read as Turtle.
pub fn sniff_format(data: &str, media_type: Option<&str>, source_name: &str) -> Result<Format> {
    if let Some(format) = media_type.and_then(Format::from_media_type) {
        return Ok(format);
    }
    if media_type.is_some_and(|mt| mt.to_ascii_lowercase().contains("html")) {
        return Err(GraphError::Format {
            source_name: source_name.to_string(),
            reason: format!("media type {} is HTML", media_type.unwrap_or_default()),
        }
        .into());
    }
    let bytes = data.as_bytes();
    let sample = bytes[..bytes.len().min(SNIFF_WINDOW)].to_ascii_lowercase();
    if looks_like_html(&sample) {
        return Err(GraphError::Format {
            source_name: source_name.to_string(),
            reason: "payload is an HTML document".to_string(),
        }
        .into());
    }
    if contains(&sample, b"<rdf:rdf>") || contains(&sample, b"/rdf>") || contains(&sample, b":rdf>")
    {
        return Ok(Format::RdfXml);
    }
    if contains(&sample, b"@prefix") {
        return Ok(Format::Turtle);
    }
    Ok(Format::Turtle)
}
