//! Named, versioned response caches owned by the worker.
//!
//! Each namespace is a directory under `<cache_dir>/worker/`. An entry is
//! a pair of files named after the SHA-256 of the request URL (fragment
//! stripped): `<hash>.meta.json` with status, headers and store time, and
//! `<hash>.body` with the raw bytes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use super::WorkerError;
use crate::api::Response;

const META_SUFFIX: &str = ".meta.json";
const BODY_SUFFIX: &str = ".body";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    cached_at: DateTime<Utc>,
}

/// Cache file stem for a URL
pub fn entry_key(url: &str) -> String {
    hex::encode(Sha256::digest(normalize_url(url).as_bytes()))
}

fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => url.split('#').next().unwrap_or(url).to_string(),
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, WorkerError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct CacheStorage {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl CacheStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, WorkerError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_name(name: &str) -> Result<(), WorkerError> {
        if name.trim().is_empty() || name.starts_with('.') || name.contains(|c: char| c == '/' || c == '\\') {
            return Err(WorkerError::InvalidNamespace(name.to_string()));
        }
        Ok(())
    }

    fn namespace(&self, name: &str) -> Namespace {
        Namespace {
            name: name.to_string(),
            dir: self.root.join(name),
            write_lock: self.write_lock.clone(),
        }
    }

    /// Open a namespace, creating it if needed
    pub fn open_namespace(&self, name: &str) -> Result<Namespace, WorkerError> {
        Self::check_name(name)?;
        let namespace = self.namespace(name);
        std::fs::create_dir_all(&namespace.dir)?;
        Ok(namespace)
    }

    pub fn has(&self, name: &str) -> bool {
        Self::check_name(name).is_ok() && self.root.join(name).is_dir()
    }

    /// Names of all existing namespaces, sorted
    pub fn keys(&self) -> Result<Vec<String>, WorkerError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a namespace and everything in it. Returns false if absent.
    pub fn delete(&self, name: &str) -> Result<bool, WorkerError> {
        Self::check_name(name)?;
        let dir = self.root.join(name);
        if !dir.is_dir() {
            return Ok(false);
        }
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        std::fs::remove_dir_all(&dir)?;
        debug!(namespace = name, "Worker cache deleted");
        Ok(true)
    }

    /// First cached response for `url` across all namespaces
    pub fn match_any(&self, url: &str) -> Result<Option<Response>, WorkerError> {
        for name in self.keys()? {
            if let Some(response) = self.namespace(&name).get(url)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

pub struct Namespace {
    name: String,
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl Namespace {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let key = entry_key(url);
        (
            self.dir.join(format!("{}{}", key, META_SUFFIX)),
            self.dir.join(format!("{}{}", key, BODY_SUFFIX)),
        )
    }

    /// Store (or replace) the response for `url`
    pub fn put(&self, url: &str, response: &Response) -> Result<(), WorkerError> {
        let (meta_path, body_path) = self.paths(url);
        let meta = EntryMeta {
            url: normalize_url(url),
            status: response.status,
            headers: response.headers.clone(),
            cached_at: Utc::now(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta).map_err(|e| WorkerError::CorruptEntry {
            path: meta_path.display().to_string(),
            source: e,
        })?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        // Body first: an entry only becomes visible once its meta exists
        write_atomic(&body_path, &response.body)?;
        write_atomic(&meta_path, &meta_json)?;

        debug!(namespace = %self.name, url, status = response.status, "Response cached");
        Ok(())
    }

    pub fn get(&self, url: &str) -> Result<Option<Response>, WorkerError> {
        let (meta_path, body_path) = self.paths(url);

        let Some(meta_bytes) = read_optional(&meta_path)? else {
            return Ok(None);
        };
        let meta: EntryMeta =
            serde_json::from_slice(&meta_bytes).map_err(|e| WorkerError::CorruptEntry {
                path: meta_path.display().to_string(),
                source: e,
            })?;

        let Some(body) = read_optional(&body_path)? else {
            warn!(namespace = %self.name, url, "Cached response has no body file");
            return Ok(None);
        };

        Ok(Some(Response {
            status: meta.status,
            headers: meta.headers,
            body: body.into(),
        }))
    }

    pub fn delete(&self, url: &str) -> Result<bool, WorkerError> {
        let (meta_path, body_path) = self.paths(url);
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let existed = match std::fs::remove_file(&meta_path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };
        match std::fs::remove_file(&body_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(existed)
    }

    /// URLs of every entry in this namespace, sorted
    pub fn urls(&self) -> Result<Vec<String>, WorkerError> {
        let mut urls = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_meta = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(META_SUFFIX));
            if !is_meta {
                continue;
            }
            match std::fs::read(&path)
                .map_err(WorkerError::from)
                .and_then(|bytes| {
                    serde_json::from_slice::<EntryMeta>(&bytes).map_err(|e| {
                        WorkerError::CorruptEntry {
                            path: path.display().to_string(),
                            source: e,
                        }
                    })
                }) {
                Ok(meta) => urls.push(meta.url),
                Err(e) => warn!(error = %e, "Skipping unreadable worker cache entry"),
            }
        }
        urls.sort();
        Ok(urls)
    }
}
