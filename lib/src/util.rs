use anyhow::Result;
use std::path::Path;
use url::Url;

/// The key under which a load is recorded: the URI without its fragment.
pub fn canonical_uri_key(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => uri.split('#').next().unwrap_or(uri).to_string(),
    }
}

/// `file:` URI for a local path, made absolute first.
pub fn file_uri(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map(|u| u.to_string())
        .map_err(|_| anyhow::anyhow!("cannot build a file URI for {}", absolute.display()))
}

/// Whether `name` is shaped like `prefix:local`: a scheme followed by a bare
/// path, with no authority, query or fragment. `http://x/y` and `tag:a#b` are
/// not; `foaf:name` is.
pub fn is_prefixed_name(name: &str) -> bool {
    match Url::parse(name) {
        Ok(url) => {
            url.cannot_be_a_base()
                && !url.path().is_empty()
                && url.host().is_none()
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}
