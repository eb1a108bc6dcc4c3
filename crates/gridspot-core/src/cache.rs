// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Generic bounded TTL + LRU cache with optional disk persistence
//!
//! Expiry happens only inside `get`: an entry older than its TTL is deleted
//! and reported absent. There is deliberately no age filtering anywhere
//! else; whether cached content is usable is a content question answered by
//! the domain layer, not a freshness question answered here.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PERSIST_FILE: &str = "price_cache.json";

/// A stored value plus bookkeeping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub data: V,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: i64,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub last_access: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::seconds(self.ttl_seconds)
    }

    /// Most recent touch, falling back to creation time
    fn recency(&self) -> DateTime<Utc> {
        self.last_access.unwrap_or(self.created_at)
    }
}

/// Hit/miss/eviction counters for diagnostics
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Bounded key/value store with per-entry TTL and LRU eviction
#[derive(Debug)]
pub struct Cache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    max_entries: usize,
    persist_path: Option<PathBuf>,
    stats: CacheStats,
}

impl<V> Cache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    pub fn new(default_ttl_minutes: i64, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl: Duration::minutes(default_ttl_minutes),
            max_entries,
            persist_path: None,
            stats: CacheStats::default(),
        }
    }

    /// Enable disk persistence under `dir` and load any previously persisted
    /// entries. A corrupt file is logged and ignored, never fatal.
    pub fn with_persistence(mut self, dir: &Path) -> Self {
        let path = dir.join(PERSIST_FILE);
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<HashMap<String, CacheEntry<V>>>(
                    &content,
                ) {
                    Ok(loaded) => {
                        debug!("loaded {} persisted cache entries", loaded.len());
                        self.entries = loaded;
                    }
                    Err(e) => warn!("ignoring corrupt cache file {}: {e}", path.display()),
                },
                Err(e) => warn!("cannot read cache file {}: {e}", path.display()),
            }
        }
        self.persist_path = Some(path);
        self
    }

    pub fn set(
        &mut self,
        key: &str,
        value: V,
        ttl_minutes: Option<i64>,
        metadata: BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) {
        let ttl = ttl_minutes
            .map(Duration::minutes)
            .unwrap_or(self.default_ttl);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data: value,
                created_at: now,
                ttl_seconds: ttl.num_seconds(),
                access_count: 0,
                last_access: None,
                metadata,
            },
        );
        self.evict_if_needed(now);
        self.persist();
    }

    /// Returns a clone of the stored value; deletes and misses if the entry
    /// has outlived its TTL.
    pub fn get(&mut self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.stats.misses += 1;
                return None;
            }
        };
        if expired {
            self.entries.remove(key);
            self.stats.expirations += 1;
            self.stats.misses += 1;
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.access_count += 1;
        entry.last_access = Some(now);
        self.stats.hits += 1;
        Some(entry.data.clone())
    }

    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.persist();
        }
        removed
    }

    /// Remove every key satisfying the predicate, returning how many went
    pub fn delete_where(&mut self, predicate: impl Fn(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !predicate(key));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.persist();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Keys starting with `prefix`, expired or not; used by the domain layer
    /// to rebuild its latest-source pointers after a persisted reload
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Expired entries go first; if still over budget, least-recently-used
    /// entries go until the count fits.
    fn evict_if_needed(&mut self, now: DateTime<Utc>) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        self.stats.expirations += (before - self.entries.len()) as u64;

        while self.entries.len() > self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.recency())
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                    self.stats.evictions += 1;
                }
                None => break,
            }
        }
    }

    /// Atomic write (tmp + rename) of all entries, when enabled
    fn persist(&self) {
        let Some(path) = &self.persist_path else {
            return;
        };
        let result = serde_json::to_string_pretty(&self.entries)
            .map_err(gridspot_types::GridspotError::from)
            .and_then(|content| {
                let temp_path = path.with_extension("tmp");
                std::fs::write(&temp_path, content)?;
                std::fs::rename(&temp_path, path)?;
                Ok(())
            });
        if let Err(e) = result {
            warn!("cache persistence failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_set_get_roundtrip() {
        let mut cache: Cache<String> = Cache::new(60, 10);
        cache.set("a", "hello".to_string(), None, BTreeMap::new(), now());
        assert_eq!(cache.get("a", now()), Some("hello".to_string()));
        assert_eq!(cache.get("missing", now()), None);
    }

    #[test]
    fn test_expired_entry_deleted_on_get() {
        let mut cache: Cache<String> = Cache::new(60, 10);
        cache.set("a", "hello".to_string(), None, BTreeMap::new(), now());

        let later = now() + Duration::minutes(61);
        assert_eq!(cache.get("a", later), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_entry_valid_until_ttl() {
        let mut cache: Cache<String> = Cache::new(60, 10);
        cache.set("a", "hello".to_string(), None, BTreeMap::new(), now());

        // Age exactly at TTL is still valid; expiry is age > ttl
        let at_ttl = now() + Duration::minutes(60);
        assert_eq!(cache.get("a", at_ttl), Some("hello".to_string()));
    }

    #[test]
    fn test_per_entry_ttl_override() {
        let mut cache: Cache<String> = Cache::new(60, 10);
        cache.set("short", "x".to_string(), Some(5), BTreeMap::new(), now());
        cache.set("long", "y".to_string(), Some(120), BTreeMap::new(), now());

        let later = now() + Duration::minutes(30);
        assert_eq!(cache.get("short", later), None);
        assert_eq!(cache.get("long", later), Some("y".to_string()));
    }

    #[test]
    fn test_lru_eviction_over_budget() {
        let mut cache: Cache<u32> = Cache::new(60, 3);
        cache.set("a", 1, None, BTreeMap::new(), now());
        cache.set("b", 2, None, BTreeMap::new(), now());
        cache.set("c", 3, None, BTreeMap::new(), now());

        // Touch a and c so b becomes least recently used
        let t1 = now() + Duration::minutes(1);
        cache.get("a", t1);
        cache.get("c", t1);

        cache.set("d", 4, None, BTreeMap::new(), now() + Duration::minutes(2));
        assert_eq!(cache.len(), 3);
        assert!(cache.get("b", t1).is_none());
        assert!(cache.get("a", t1).is_some());
        assert!(cache.get("d", t1).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_eviction_prefers_expired_entries() {
        let mut cache: Cache<u32> = Cache::new(60, 2);
        cache.set("old", 1, Some(5), BTreeMap::new(), now());
        let later = now() + Duration::minutes(30);
        cache.set("b", 2, None, BTreeMap::new(), later);
        cache.set("c", 3, None, BTreeMap::new(), later);

        // "old" is expired at insertion time of "c" and is dropped first
        assert_eq!(cache.len(), 2);
        assert!(cache.get("b", later).is_some());
        assert!(cache.get("c", later).is_some());
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_delete_removes_entry() {
        let mut cache: Cache<u32> = Cache::new(60, 10);
        cache.set("a", 1, None, BTreeMap::new(), now());

        assert!(cache.delete("a"));
        assert!(cache.get("a", now()).is_none());
        assert!(!cache.delete("a"), "second delete finds nothing");
    }

    #[test]
    fn test_delete_where() {
        let mut cache: Cache<u32> = Cache::new(60, 10);
        cache.set("SE3|a", 1, None, BTreeMap::new(), now());
        cache.set("SE3|b", 2, None, BTreeMap::new(), now());
        cache.set("DK1|a", 3, None, BTreeMap::new(), now());

        let removed = cache.delete_where(|key| key.starts_with("SE3|"));
        assert_eq!(removed, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("DK1|a", now()).is_some());
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let mut cache: Cache<String> = Cache::new(60, 10).with_persistence(dir.path());
        cache.set("a", "persisted".to_string(), None, BTreeMap::new(), now());
        assert!(dir.path().join(PERSIST_FILE).exists());

        let mut reloaded: Cache<String> = Cache::new(60, 10).with_persistence(dir.path());
        assert_eq!(reloaded.get("a", now()), Some("persisted".to_string()));
    }

    #[test]
    fn test_corrupt_persistence_file_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PERSIST_FILE), "{not json").unwrap();

        let cache: Cache<String> = Cache::new(60, 10).with_persistence(dir.path());
        assert!(cache.is_empty());
    }
}
