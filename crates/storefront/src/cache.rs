//! Key-scoped, time-expiring local cache.
//!
//! Backs both read-through caching of catalog data and cart persistence
//! across page loads. Entries are JSON envelopes of
//! `{data, timestamp, duration}` stored under a shared key prefix; an entry
//! whose age exceeds its duration is logically absent, and reading it
//! deletes it (lazy eviction - there is no background sweeper).
//!
//! The backing store is injectable: [`MemoryStore`] for tests and ephemeral
//! use, [`FileStore`] for persistence across restarts. Nothing outside this
//! module depends on the concrete storage mechanism.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};

/// Key prefix for all cache entries.
///
/// `clear` removes only keys under this prefix, never unrelated data in a
/// shared store.
pub const CACHE_PREFIX: &str = "solstice_";

/// Default entry lifetime (24 hours).
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Raw string key-value storage.
///
/// Implementations only store and retrieve opaque strings; expiry and
/// namespacing live in [`Cache`].
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for a key.
    fn get(&self, key: &str) -> Option<String>;
    /// Write the raw value for a key.
    fn set(&self, key: &str, value: String);
    /// Delete a key. Absent keys are a no-op.
    fn remove(&self, key: &str);
    /// All keys currently present.
    fn keys(&self) -> Vec<String>;
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("lock poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries
            .lock()
            .expect("lock poisoned")
            .insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries.lock().expect("lock poisoned").remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

/// JSON-file-backed store.
///
/// The whole map is held in memory and flushed to disk on every mutation.
/// I/O failures are logged and otherwise ignored: a cache that cannot
/// persist degrades to an in-memory one rather than failing its caller.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open a file store, loading any existing content.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = std::fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn flush(&self, entries: &HashMap<String, String>) {
        match serde_json::to_string(entries) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(&self.path, raw) {
                    tracing::warn!(path = %self.path.display(), error = %e, "Cache flush failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Cache serialization failed"),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().expect("lock poisoned").get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.insert(key.to_string(), value);
        self.flush(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().expect("lock poisoned");
        entries.remove(key);
        self.flush(&entries);
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

/// Stored envelope around a cached value.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CacheEntry<T> {
    data: T,
    /// Write time, unix milliseconds.
    timestamp: i64,
    /// Lifetime, milliseconds.
    duration: u64,
}

impl<T> CacheEntry<T> {
    /// An entry is logically absent once its age exceeds its duration.
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp > i64::try_from(self.duration).unwrap_or(i64::MAX)
    }
}

/// Key-prefixed expiring cache over an injectable store.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl Cache {
    /// Create a cache over a store with the default key prefix.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            prefix: CACHE_PREFIX.to_string(),
        }
    }

    /// Store a value under a key with the default 24-hour lifetime.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.set_for(key, value, DEFAULT_CACHE_DURATION);
    }

    /// Store a value under a key with an explicit lifetime.
    pub fn set_for<T: Serialize + ?Sized>(&self, key: &str, value: &T, duration: Duration) {
        let entry = CacheEntry {
            data: value,
            timestamp: Utc::now().timestamp_millis(),
            duration: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        };

        match serde_json::to_string(&entry) {
            Ok(raw) => self.store.set(&self.prefixed(key), raw),
            Err(e) => tracing::warn!(key, error = %e, "Cache set failed"),
        }
    }

    /// Read a value, enforcing expiry.
    ///
    /// An expired entry is deleted as a side effect and reported absent.
    /// Undecodable entries are treated the same way.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.prefixed(key);
        let raw = self.store.get(&full_key)?;

        let Ok(entry) = serde_json::from_str::<CacheEntry<T>>(&raw) else {
            tracing::warn!(key, "Dropping undecodable cache entry");
            self.store.remove(&full_key);
            return None;
        };

        if entry.is_expired(Utc::now().timestamp_millis()) {
            self.store.remove(&full_key);
            return None;
        }

        Some(entry.data)
    }

    /// Delete an entry.
    pub fn remove(&self, key: &str) {
        self.store.remove(&self.prefixed(key));
    }

    /// Delete every entry under this cache's prefix.
    ///
    /// Keys outside the prefix are untouched.
    pub fn clear(&self) {
        for key in self.store.keys() {
            if key.starts_with(&self.prefix) {
                self.store.remove(&key);
            }
        }
    }

    /// Read-through helper: return the cached value or populate it from
    /// `fetch`.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error; nothing is cached on failure.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        duration: Duration,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            tracing::debug!(key, "Cache hit");
            return Ok(hit);
        }

        tracing::debug!(key, "Cache miss, fetching");
        let fresh = fetch().await?;
        self.set_for(key, &fresh, duration);
        Ok(fresh)
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}
