//! On-disk cache of index responses, one file per URL.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use pinset_util::hash::cache_key;

/// Response bodies stored under `dir`, keyed by the SHA-256 of the URL.
///
/// The cache is best effort: read and write failures are logged and treated
/// as misses.
#[derive(Debug, Clone)]
pub struct HttpCache {
    dir: PathBuf,
    enabled: bool,
}

impl HttpCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            enabled: true,
        }
    }

    /// A cache that never hits and never stores.
    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The root directory of this cache.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache entry for `url`.
    pub fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(cache_key(url))
    }

    pub fn get(&self, url: &str) -> Option<String> {
        self.lookup(url, None)
    }

    /// Like [`HttpCache::get`], but entries older than `max_age` are misses.
    pub fn get_fresh(&self, url: &str, max_age: Duration) -> Option<String> {
        self.lookup(url, Some(max_age))
    }

    /// Age of the entry for `url`, if it exists. Entries stamped in the
    /// future count as brand new.
    pub fn age(&self, url: &str) -> Option<Duration> {
        let modified = fs::metadata(self.entry_path(url)).ok()?.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(modified)
                .unwrap_or(Duration::ZERO),
        )
    }

    fn lookup(&self, url: &str, max_age: Option<Duration>) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let path = self.entry_path(url);
        if !path.is_file() {
            return None;
        }
        if let Some(max_age) = max_age {
            match self.age(url) {
                Some(age) if age < max_age => {}
                _ => {
                    tracing::debug!("cache entry for {url} is stale");
                    return None;
                }
            }
        }
        match fs::read_to_string(&path) {
            Ok(body) => {
                tracing::debug!("cache hit for {url}");
                Some(body)
            }
            Err(e) => {
                tracing::warn!("ignoring unreadable cache entry {}: {e}", path.display());
                None
            }
        }
    }

    pub fn put(&self, url: &str, body: &str) {
        if !self.enabled {
            return;
        }
        let path = self.entry_path(url);
        if let Err(e) = pinset_util::fs::write_creating_dirs(&path, body.as_bytes()) {
            tracing::warn!("failed to write cache entry {}: {e}", path.display());
        }
    }
}
