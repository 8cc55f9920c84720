//! JSON file-backed TTL cache.
//!
//! One flat object on disk, each value stored as `{"v": ..., "e": <expiry>}`
//! with an absolute epoch-millisecond expiry. The whole file is read once at
//! construction and rewritten wholesale on [`FileCache::save`].

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::CollageError;

/// Default entry lifetime (~1 month).
pub const DEFAULT_TTL_MS: i64 = 2_629_800_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub v: V,
    /// Absolute expiry, epoch milliseconds.
    pub e: i64,
}

/// Persistent key-value store with TTL expiry.
///
/// Knows nothing about what it stores; key derivation lives with the
/// caller. Safe for concurrent use within one process (writes to distinct
/// keys are independent, same-key writes are last-write-wins), but not for
/// more than one process against the same backing file.
pub struct FileCache<V> {
    path: PathBuf,
    ttl_ms: i64,
    store: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> FileCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Load the cache from `path`. A missing or unparsable file yields an
    /// empty cache; corruption must never abort startup.
    pub fn load(path: impl Into<PathBuf>, ttl_ms: i64) -> Self {
        let path = path.into();
        let store = Self::read_store(&path);
        log::info!(
            "Loaded cache [{}] with {} entries",
            path.display(),
            store.len()
        );
        Self {
            path,
            ttl_ms,
            store: Mutex::new(store),
        }
    }

    fn read_store(path: &Path) -> HashMap<String, CacheEntry<V>> {
        if !path.exists() {
            return HashMap::new();
        }
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(store) => store,
                Err(e) => {
                    log::warn!(
                        "Cache file [{}] is unparsable, starting empty: {}",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) => {
                log::warn!(
                    "Could not read cache file [{}], starting empty: {}",
                    path.display(),
                    e
                );
                HashMap::new()
            }
        }
    }

    /// Get a value, renewing its expiry. Expired entries are invisible
    /// even before [`FileCache::clean`] removes them.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_with_renew(key, true)
    }

    /// Get a value without renewing its expiry.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.get_with_renew(key, false)
    }

    fn get_with_renew(&self, key: &str, renew: bool) -> Option<V> {
        let now = Utc::now().timestamp_millis();
        let mut store = self.store.lock().ok()?;
        let entry = store.get_mut(key)?;
        if now >= entry.e {
            return None;
        }
        if renew {
            entry.e = now + self.ttl_ms;
        }
        Some(entry.v.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            v: value,
            e: Utc::now().timestamp_millis() + self.ttl_ms,
        };
        if let Ok(mut store) = self.store.lock() {
            store.insert(key.into(), entry);
        }
    }

    /// Physically remove expired entries.
    pub fn clean(&self) {
        let now = Utc::now().timestamp_millis();
        if let Ok(mut store) = self.store.lock() {
            let before = store.len();
            store.retain(|_, entry| now < entry.e);
            let removed = before - store.len();
            if removed > 0 {
                log::debug!(
                    "Cleaned {} expired entries from cache [{}]",
                    removed,
                    self.path.display()
                );
            }
        }
    }

    /// Clean, then rewrite the backing file wholesale.
    pub fn save(&self) -> Result<(), CollageError> {
        self.clean();
        let store = self
            .store
            .lock()
            .map_err(|e| CollageError::Cache(format!("cache lock poisoned: {}", e)))?;
        let raw = serde_json::to_string(&*store)?;
        fs::write(&self.path, raw)?;
        log::info!(
            "Saved cache [{}] with {} entries",
            self.path.display(),
            store.len()
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.store.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cache_at(dir: &tempfile::TempDir, name: &str, ttl_ms: i64) -> FileCache<u64> {
        FileCache::load(dir.path().join(name), ttl_ms)
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let cache = cache_at(&dir, "c.json", DEFAULT_TTL_MS);
        cache.set("radiohead.ok computer.airbag", 284_000);
        assert_eq!(cache.get("radiohead.ok computer.airbag"), Some(284_000));
    }

    #[test]
    fn expired_entries_are_invisible_before_clean() {
        let dir = tempdir().unwrap();
        let cache = cache_at(&dir, "c.json", -1);
        cache.set("k", 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 1);
        cache.clean();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn peek_does_not_renew_but_get_does() {
        let dir = tempdir().unwrap();
        let cache = cache_at(&dir, "c.json", DEFAULT_TTL_MS);
        cache.set("k", 7);
        assert_eq!(cache.peek("k"), Some(7));
        assert_eq!(cache.get("k"), Some(7));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("persisted.json");
        {
            let cache: FileCache<u64> = FileCache::load(&path, DEFAULT_TTL_MS);
            cache.set("a", 1);
            cache.set("b", 2);
            cache.save().unwrap();
        }
        let reloaded: FileCache<u64> = FileCache::load(&path, DEFAULT_TTL_MS);
        assert_eq!(reloaded.get("a"), Some(1));
        assert_eq!(reloaded.get("b"), Some(2));
    }

    #[test]
    fn save_drops_expired_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("persisted.json");
        {
            let cache: FileCache<u64> = FileCache::load(&path, -1);
            cache.set("stale", 1);
            cache.save().unwrap();
        }
        let reloaded: FileCache<u64> = FileCache::load(&path, DEFAULT_TTL_MS);
        assert!(reloaded.is_empty());
    }

    #[test]
    fn corrupt_file_yields_empty_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "{not json").unwrap();
        let cache: FileCache<u64> = FileCache::load(&path, DEFAULT_TTL_MS);
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_file_yields_empty_cache() {
        let dir = tempdir().unwrap();
        let cache: FileCache<u64> = FileCache::load(dir.path().join("absent.json"), DEFAULT_TTL_MS);
        assert!(cache.is_empty());
    }
}
