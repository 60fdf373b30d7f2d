//! On-disk cache of fetched RDF documents.
//!
//! The cache directory holds `index.json`, mapping each source URI to the data
//! file holding its (Turtle-normalized) payload, plus one `.rawdata` file per
//! entry. The index is rewritten after every insertion while holding an
//! exclusive lock on it. Keys are the URIs exactly as given; no
//! canonicalization happens here.

use crate::errors::GraphError;
use anyhow::Result;
use chrono::prelude::*;
use fs2::FileExt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Data file name, relative to the cache directory.
    pub file: String,
    pub stored: DateTime<Utc>,
}

type Index = BTreeMap<String, CacheEntry>;

pub struct WebCache {
    dir: PathBuf,
    index: Mutex<Index>,
}

impl WebCache {
    /// Opens (creating if needed) the cache in `dir`. A missing or unreadable
    /// index is treated as an empty cache.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(dir.into(), false)
    }

    /// Like [`WebCache::open`], but an unreadable index is a
    /// [`GraphError::CacheCorruption`].
    pub fn open_strict(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with(dir.into(), true)
    }

    fn open_with(dir: PathBuf, strict: bool) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;
        let index = read_index(&dir.join(INDEX_FILE), strict)?;
        debug!("Opened web cache at {} ({} entries)", dir.display(), index.len());
        Ok(Self {
            dir,
            index: Mutex::new(index),
        })
    }

    /// Re-reads the index from disk. Corruption is fatal here.
    pub fn reload(&self) -> Result<()> {
        let fresh = read_index(&self.index_path(), true)?;
        *self.index() = fresh;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn index(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has(&self, uri: &str) -> bool {
        self.index().contains_key(uri)
    }

    /// The cached payload for `uri`; [`GraphError::CacheMiss`] when absent.
    pub fn get(&self, uri: &str) -> Result<String> {
        let path = self
            .path(uri)
            .ok_or_else(|| GraphError::CacheMiss(uri.to_string()))?;
        std::fs::read_to_string(&path).map_err(|e| {
            debug!("Cache entry for <{uri}> at {} unreadable: {e}", path.display());
            GraphError::CacheMiss(uri.to_string()).into()
        })
    }

    /// Stores `data` for `uri`, replacing any previous payload. The index is
    /// persisted before the payload is written.
    pub fn set(&self, uri: &str, data: &str) -> Result<()> {
        let file = {
            let mut index = self.index();
            let file = index
                .get(uri)
                .map(|e| e.file.clone())
                .unwrap_or_else(|| data_file_name(uri));
            index.insert(
                uri.to_string(),
                CacheEntry {
                    file: file.clone(),
                    stored: Utc::now(),
                },
            );
            self.save_index(&index)?;
            file
        };
        std::fs::write(self.dir.join(file), data)?;
        debug!("Cached <{uri}>");
        Ok(())
    }

    /// Drops the entry for `uri` and its data file. Returns whether it was
    /// indexed.
    pub fn remove(&self, uri: &str) -> Result<bool> {
        let entry = {
            let mut index = self.index();
            let Some(entry) = index.remove(uri) else {
                return Ok(false);
            };
            self.save_index(&index)?;
            entry
        };
        match std::fs::remove_file(self.dir.join(&entry.file)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!("Evicted <{uri}>");
        Ok(true)
    }

    /// Path of the data file for `uri`, if it is indexed.
    pub fn path(&self, uri: &str) -> Option<PathBuf> {
        self.index().get(uri).map(|e| self.dir.join(&e.file))
    }

    pub fn entries(&self) -> Vec<(String, CacheEntry)> {
        self.index()
            .iter()
            .map(|(uri, entry)| (uri.clone(), entry.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index().is_empty()
    }

    fn save_index(&self, index: &Index) -> Result<()> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.index_path())?;
        FileExt::lock_exclusive(&file)?;
        file.set_len(0)?;
        let mut writer = &file;
        serde_json::to_writer_pretty(&mut writer, index)?;
        writer.flush()?;
        Ok(())
    }
}

fn data_file_name(uri: &str) -> String {
    format!("d-{}.rawdata", blake3::hash(uri.as_bytes()).to_hex())
}

fn read_index(path: &Path, strict: bool) -> Result<Index> {
    if !path.exists() {
        return Ok(Index::new());
    }
    let parsed: Result<Index> = std::fs::File::open(path)
        .map_err(anyhow::Error::from)
        .and_then(|f| Ok(serde_json::from_reader(BufReader::new(f))?));
    match parsed {
        Ok(index) => Ok(index),
        Err(e) if strict => Err(GraphError::CacheCorruption {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
        .into()),
        Err(e) => {
            warn!("Ignoring unreadable web cache index {}: {e}", path.display());
            Ok(Index::new())
        }
    }
}
