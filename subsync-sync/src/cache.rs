//! Response cache: fingerprinted, time-boxed copies of remote listings.
//!
//! Persists one JSON document per key at `<home>/.subsync/cache/<key>.json`.
//! Writes use the same atomic `.tmp` + rename pattern as the project store.
//!
//! The cache only ever saves calls. A missing, stale, unreadable or
//! malformed entry is a miss; a failed write is logged and dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use subsync_core::store::root_at;

/// Deterministic fingerprint of one remote call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Fingerprint `operation` called with `args`.
///
/// Arguments are sorted by name before hashing, so the order they are passed
/// in never changes the key.
pub fn fingerprint<'a, I>(operation: &str, args: I) -> CacheKey
where
    I: IntoIterator<Item = (&'a str, Value)>,
{
    let sorted: BTreeMap<&str, Value> = args.into_iter().collect();
    let encoded = serde_json::to_string(&sorted).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(operation.as_bytes());
    hasher.update([0u8]);
    hasher.update(encoded.as_bytes());
    CacheKey(hex::encode(hasher.finalize()))
}

/// On-disk cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub stored_at: DateTime<Utc>,
    pub payload: Value,
}

/// Disk-backed response cache with a fixed freshness window.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    freshness: Duration,
    bypass_reads: bool,
}

/// `<home>/.subsync/cache/`
pub fn cache_dir_at(home: &Path) -> PathBuf {
    root_at(home).join("cache")
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, freshness: Duration) -> Self {
        Self {
            dir: dir.into(),
            freshness,
            bypass_reads: false,
        }
    }

    /// Skip reads (every lookup misses) while still refreshing entries.
    pub fn bypass_reads(mut self, bypass: bool) -> Self {
        self.bypass_reads = bypass;
        self
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Fresh payload for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.get_at(key, Utc::now())
    }

    /// [`get`](Self::get) evaluated at an explicit instant.
    pub fn get_at(&self, key: &CacheKey, now: DateTime<Utc>) -> Option<Value> {
        if self.bypass_reads {
            return None;
        }
        let path = self.entry_path(key);
        let contents = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&contents) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!("ignoring unreadable cache entry {}: {err}", path.display());
                return None;
            }
        };
        if entry.stored_at + self.freshness < now {
            tracing::debug!("cache entry {key} is stale");
            return None;
        }
        Some(entry.payload)
    }

    /// Typed lookup; a payload that no longer decodes is a miss.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let payload = self.get(key)?;
        serde_json::from_value(payload).ok()
    }

    /// Store `payload` under `key`, overwriting any previous entry.
    pub fn put(&self, key: &CacheKey, payload: Value) {
        self.put_at(key, payload, Utc::now());
    }

    /// [`put`](Self::put) stamped with an explicit capture time.
    pub fn put_at(&self, key: &CacheKey, payload: Value, stored_at: DateTime<Utc>) {
        let entry = CacheEntry {
            key: key.to_string(),
            stored_at,
            payload,
        };
        if let Err(err) = self.write_entry(key, &entry) {
            tracing::warn!("could not write cache entry {key}: {err}");
        }
    }

    /// Typed store.
    pub fn put_typed<T: Serialize>(&self, key: &CacheKey, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.put(key, value),
            Err(err) => tracing::warn!("could not encode cache entry {key}: {err}"),
        }
    }

    fn write_entry(&self, key: &CacheKey, entry: &CacheEntry) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(entry).map_err(std::io::Error::other)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn cache(tmp: &TempDir) -> ResponseCache {
        ResponseCache::new(tmp.path().join("cache"), Duration::hours(1))
    }

    #[test]
    fn fingerprint_ignores_argument_order() {
        let a = fingerprint("captions.list", [("a", json!(1)), ("b", json!(2))]);
        let b = fingerprint("captions.list", [("b", json!(2)), ("a", json!(1))]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_depends_on_operation_and_values() {
        let base = fingerprint("captions.list", [("videoId", json!("v1"))]);
        assert_ne!(base, fingerprint("videos.list", [("videoId", json!("v1"))]));
        assert_ne!(base, fingerprint("captions.list", [("videoId", json!("v2"))]));
    }

    #[test]
    fn missing_key_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let key = fingerprint("captions.list", [("videoId", json!("v1"))]);
        assert!(cache(&tmp).get(&key).is_none());
    }

    #[test]
    fn fresh_entry_is_a_hit() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let key = fingerprint("captions.list", [("videoId", json!("v1"))]);
        cache.put(&key, json!({"items": [1, 2]}));
        assert_eq!(cache.get(&key), Some(json!({"items": [1, 2]})));
    }

    #[test]
    fn stale_entry_is_never_returned() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let key = fingerprint("captions.list", [("videoId", json!("v1"))]);
        let captured = Utc::now() - Duration::hours(2);
        cache.put_at(&key, json!({"items": []}), captured);

        assert!(cache.get(&key).is_none());
        assert!(cache
            .get_at(&key, captured + Duration::minutes(59))
            .is_some());
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let key = fingerprint("captions.list", [("videoId", json!("v1"))]);
        std::fs::create_dir_all(tmp.path().join("cache")).unwrap();
        std::fs::write(
            tmp.path().join("cache").join(format!("{key}.json")),
            "{ not json",
        )
        .unwrap();
        assert!(cache.get(&key).is_none());

        std::fs::write(
            tmp.path().join("cache").join(format!("{key}.json")),
            r#"{"key": "x", "payload": 1}"#,
        )
        .unwrap();
        assert!(cache.get(&key).is_none(), "entry without stored_at is a miss");
    }

    #[test]
    fn later_put_overwrites_stale_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = cache(&tmp);
        let key = fingerprint("captions.list", [("videoId", json!("v1"))]);
        cache.put_at(&key, json!("old"), Utc::now() - Duration::days(1));
        cache.put(&key, json!("new"));
        assert_eq!(cache.get(&key), Some(json!("new")));
    }

    #[test]
    fn bypass_misses_but_still_writes() {
        let tmp = TempDir::new().unwrap();
        let key = fingerprint("captions.list", [("videoId", json!("v1"))]);
        let bypassing = cache(&tmp).bypass_reads(true);
        bypassing.put(&key, json!(1));
        assert!(bypassing.get(&key).is_none());
        assert_eq!(cache(&tmp).get(&key), Some(json!(1)));
    }

    #[test]
    fn unwritable_dir_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "file, not dir").unwrap();
        let cache = ResponseCache::new(blocker.join("cache"), Duration::hours(1));
        let key = fingerprint("op", std::iter::empty());
        cache.put(&key, json!(1));
        assert!(cache.get(&key).is_none());
    }
}
