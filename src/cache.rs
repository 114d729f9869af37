//! Persistent last-known-good cache
//!
//! Every successful feed refresh is written through to a durable storage
//! backend and read back when the whole provider chain fails, or when a
//! session starts. Entries are never expired or deleted: an old value is
//! still better than nothing for a passive overlay.

use crate::{
    constants::{CACHE_NAMESPACE, DATA_DIR_ENV, FX_CACHE_KEY},
    error::CacheError,
    types::Coin,
};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Raw string storage the cache is layered on
///
/// Implementations are synchronous: a session seeds its first snapshot from
/// the cache before any network activity.
pub trait CacheStorage: Send + Sync {
    /// Reads a raw entry, `Ok(None)` when the key was never written
    fn read(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Writes a raw entry, replacing any previous value
    fn write(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// Identifier of one cached feed value
///
/// Price and history keys are per coin so switching coins never evicts
/// another coin's entry; the exchange rate key is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of the spot price entry for `coin`
    pub fn price(coin: Coin) -> Self {
        Self(format!("{}_price", coin.cache_id()))
    }

    /// Key of the 24h history entry for `coin`
    pub fn history(coin: Coin) -> Self {
        Self(format!("{}_history", coin.cache_id()))
    }

    /// Key of the exchange rate entry
    pub fn fx() -> Self {
        Self(FX_CACHE_KEY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn namespaced(&self) -> String {
        format!("{}{}", CACHE_NAMESPACE, self.0)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored value with its capture time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub value: T,
    /// Unix time of capture in milliseconds; informational only
    pub captured_at_ms: i64,
}

/// Typed, namespaced cache over a [`CacheStorage`] backend
#[derive(Clone)]
pub struct FeedCache {
    storage: Arc<dyn CacheStorage>,
}

impl FeedCache {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    /// Cache backed by an in-memory store, lost on drop
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Reads the value stored under `key`
    ///
    /// Unreadable or undecodable entries count as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Reads the full entry stored under `key`
    pub fn get_entry<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        decode_entry(key, self.storage.read(&key.namespaced()))
    }

    /// [`get`](Self::get) on the blocking thread pool
    pub async fn get_async<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let storage = self.storage.clone();
        let name = key.namespaced();
        match tokio::task::spawn_blocking(move || storage.read(&name)).await {
            Ok(raw) => decode_entry::<T>(key, raw).map(|entry| entry.value),
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Cache read task failed");
                None
            }
        }
    }

    /// Stores `value` under `key`, stamped with the current time
    ///
    /// Failures are dropped: losing the fallback copy never affects the
    /// in-memory snapshot.
    pub fn set<T: Serialize>(&self, key: &CacheKey, value: &T) {
        if let Err(e) = self.try_set(key, value) {
            tracing::debug!(key = %key, error = %e, "Dropping cache write");
        }
    }

    /// [`set`](Self::set) with the storage write on the blocking thread pool
    pub async fn set_async<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let raw = match encode_entry(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Dropping cache write");
                return;
            }
        };

        let storage = self.storage.clone();
        let name = key.namespaced();
        match tokio::task::spawn_blocking(move || storage.write(&name, &raw)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(key = %key, error = %e, "Dropping cache write"),
            Err(e) => tracing::debug!(key = %key, error = %e, "Cache write task failed"),
        }
    }

    fn try_set<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<(), CacheError> {
        let raw = encode_entry(value)?;
        self.storage.write(&key.namespaced(), &raw)
    }
}

fn encode_entry<T: Serialize>(value: &T) -> Result<String, CacheError> {
    let entry = CacheEntry {
        value,
        captured_at_ms: Utc::now().timestamp_millis(),
    };
    Ok(serde_json::to_string(&entry)?)
}

/// Unreadable or undecodable entries count as absent
fn decode_entry<T: DeserializeOwned>(
    key: &CacheKey,
    raw: Result<Option<String>, CacheError>,
) -> Option<CacheEntry<T>> {
    let raw = match raw {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::debug!(key = %key, error = %e, "Cache read failed");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(entry) => Some(entry),
        Err(e) => {
            tracing::debug!(key = %key, error = %e, "Discarding undecodable cache entry");
            None
        }
    }
}

/// One JSON file per entry inside a directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage in `$CRYPTO_OVERLAY_DATA_DIR/cache`, or the platform cache dir
    pub fn default_location() -> Result<Self, CacheError> {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return Ok(Self::new(Path::new(&dir).join("cache")));
        }

        let dirs = directories::ProjectDirs::from("com", "jvelascodev", "crypto-overlay")
            .ok_or_else(|| CacheError::Unavailable("no home directory".to_string()))?;
        Ok(Self::new(dirs.cache_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl CacheStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir)?;

        // One temp file per write; readers never observe a half-written entry
        let tmp = self
            .dir
            .join(format!("{}.{}.json.tmp", key, Uuid::new_v4().simple()));
        std::fs::write(&tmp, value)?;
        if let Err(e) = std::fs::rename(&tmp, self.path_for(key)) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

/// In-memory storage with an optional byte quota
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes pushing the total size past `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory storage poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Unavailable("memory storage poisoned".to_string()))?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(CacheError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
