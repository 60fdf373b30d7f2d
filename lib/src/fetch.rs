//! Retrieval of RDF documents named by a URI.
//!
//! A fetch is a single request: `file:` URIs are read from disk, everything
//! else is requested once with a weighted `Accept` header. There are no
//! retries and no alternate-location probing; a failed request is reported to
//! the caller as a load error.

use crate::consts::RDF_ACCEPT;
use crate::errors::{GraphError, OfflineRetrievalError};
use anyhow::{anyhow, Result};
use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use url::Url;

/// Options that control how remote RDF documents are fetched.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Fail immediately when `true`; callers use this to guard offline modes.
    pub offline: bool,
    /// Network timeout applied to the request.
    pub timeout: Duration,
    /// Media types to negotiate, with their quality values.
    pub accept: Vec<(&'static str, f32)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            offline: false,
            timeout: Duration::from_secs(30),
            accept: RDF_ACCEPT.to_vec(),
        }
    }
}

/// A retrieved document and the metadata the server sent with it.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub bytes: Vec<u8>,
    pub final_url: String,
    pub content_type: Option<String>,
}

impl FetchResult {
    /// Decodes the payload. Documents must be UTF-8.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.bytes.clone()).map_err(|e| {
            GraphError::load(&self.final_url, format!("payload is not UTF-8: {e}")).into()
        })
    }
}

/// Builds an `Accept` header such as `text/turtle; q=0.9, text/n3; q=0.8`.
pub fn build_accept(accept: &[(&str, f32)]) -> String {
    if accept.is_empty() {
        return "*/*".to_string();
    }
    accept
        .iter()
        .map(|(media_type, q)| format!("{media_type}; q={q:.1}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_file_uri(url: &Url) -> Result<FetchResult> {
    let path = url
        .to_file_path()
        .map_err(|_| GraphError::load(url.as_str(), "not a local file path"))?;
    let bytes = std::fs::read(&path)
        .map_err(|e| GraphError::load(url.as_str(), format!("{}: {e}", path.display())))?;
    Ok(FetchResult {
        bytes,
        final_url: url.to_string(),
        content_type: None,
    })
}

/// Fetches the document at `url`.
pub fn fetch_rdf(url: &str, opts: &FetchOptions) -> Result<FetchResult> {
    if let Ok(parsed) = Url::parse(url) {
        if parsed.scheme() == "file" {
            return read_file_uri(&parsed);
        }
    }
    if opts.offline {
        return Err(anyhow!(OfflineRetrievalError {
            file: url.to_string()
        }));
    }
    debug!("Fetching {url}");
    let client = Client::builder().timeout(opts.timeout).build()?;
    let resp = client
        .get(url)
        .header(ACCEPT, build_accept(&opts.accept))
        .send()
        .map_err(|e| GraphError::load(url, e))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(GraphError::load(url, format!("server answered {status}")).into());
    }
    let final_url = resp.url().to_string();
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = resp.bytes().map_err(|e| GraphError::load(url, e))?.to_vec();
    Ok(FetchResult {
        bytes,
        final_url,
        content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accept_header_keeps_weights() {
        assert_eq!(
            build_accept(RDF_ACCEPT),
            "text/turtle; q=0.9, text/n3; q=0.8, application/rdf+xml; q=0.5"
        );
        assert_eq!(build_accept(&[]), "*/*");
    }

    #[test]
    fn file_uris_are_read_locally_even_offline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<tag:a> <tag:b> <tag:c> .").unwrap();
        let url = Url::from_file_path(file.path()).unwrap();
        let opts = FetchOptions {
            offline: true,
            ..Default::default()
        };
        let result = fetch_rdf(url.as_str(), &opts).unwrap();
        assert_eq!(result.text().unwrap(), "<tag:a> <tag:b> <tag:c> .");
        assert!(result.content_type.is_none());
    }

    #[test]
    fn offline_refuses_the_network() {
        let opts = FetchOptions {
            offline: true,
            ..Default::default()
        };
        let err = fetch_rdf("http://example.org/data.ttl", &opts).unwrap_err();
        assert!(err.downcast_ref::<OfflineRetrievalError>().is_some());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("missing.ttl")).unwrap();
        let err = fetch_rdf(url.as_str(), &FetchOptions::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::Load { .. })
        ));
    }

    #[test]
    fn non_utf8_payload_is_rejected() {
        let result = FetchResult {
            bytes: vec![0xff, 0xfe, 0x00],
            final_url: "tag:x".into(),
            content_type: None,
        };
        assert!(result.text().is_err());
    }
}
