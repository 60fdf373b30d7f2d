//! Settings shared by graphs, datasets and the command line front end.

use crate::fetch::FetchOptions;
use anyhow::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), default)]
#[serde(default)]
pub struct Config {
    /// Root of the on-disk caches; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    /// Log every synthesized endpoint query at info level.
    pub sparql_debug: bool,
    /// Refuse network access; local `file:` URIs and cache hits still work.
    pub offline: bool,
    /// Transport timeout for fetches and endpoint queries.
    pub timeout_secs: u64,
    /// Extra prefixes registered on every graph, on top of the defaults.
    pub namespaces: BTreeMap<String, String>,
    /// SPARQL endpoints a dataset federates over.
    pub endpoints: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: Some(PathBuf::from("rdfgraph.cache")),
            sparql_debug: false,
            offline: false,
            timeout_secs: 30,
            namespaces: BTreeMap::new(),
            endpoints: Vec::new(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            offline: self.offline,
            timeout: Duration::from_secs(self.timeout_secs),
            ..FetchOptions::default()
        }
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Prints out the current Config in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        match &self.cache_dir {
            Some(dir) => println!("  Cache Directory: {}", dir.display()),
            None => println!("  Cache Directory: (disabled)"),
        }
        println!("  Offline: {}", self.offline);
        println!("  SPARQL Debug: {}", self.sparql_debug);
        println!("  Timeout: {}s", self.timeout_secs);
        if !self.namespaces.is_empty() {
            println!("  Namespaces:");
            for (prefix, uri) in &self.namespaces {
                println!("    - {prefix}: {uri}");
            }
        }
        if !self.endpoints.is_empty() {
            println!("  Endpoints:");
            for endpoint in &self.endpoints {
                println!("    - {endpoint}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_defaults() {
        let config = Config::builder().offline(true).build().unwrap();
        assert!(config.offline);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.cache_dir, Some(PathBuf::from("rdfgraph.cache")));
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: Config = serde_json::from_str(r#"{"offline": true}"#).unwrap();
        assert!(config.offline);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempdir::TempDir::new("rdfgraph-config").unwrap();
        let path = dir.path().join("config.json");
        let config = Config::builder()
            .cache_dir(None::<PathBuf>)
            .endpoints(vec!["http://example.org/sparql".to_string()])
            .build()
            .unwrap();
        config.save_to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
    }
}
