//! In-memory record cache.
//!
//! Backends that enable caching keep the bytes of every successful read and
//! serve later reads of the same id from memory until the process restarts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │   Request   │
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐     Hit
//! │    Cache    │────────────► Return
//! └──────┬──────┘
//!        │ Miss
//!        ▼
//! ┌─────────────┐
//! │ Filesystem  │──── NotFound ──► Return (never cached)
//! └──────┬──────┘
//!        │
//!        ▼
//!   Populate cache
//! ```
//!
//! Entries are spread over independently locked shards. The lock of a shard
//! is held only for a map lookup or insert, never across I/O, so lookups of
//! unrelated ids do not wait on each other. Two concurrent misses for the
//! same id both read from disk and the last insert wins.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

const SHARDS: usize = 16;

/// Sharded map from record id to content.
pub struct RecordCache {
    shards: Vec<RwLock<HashMap<String, Bytes>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecordCache {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn shard(&self, id: &str) -> &RwLock<HashMap<String, Bytes>> {
        let mut hasher = DefaultHasher::new();
        id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % self.shards.len()]
    }

    /// Look up cached content, counting the hit or miss.
    pub fn get(&self, id: &str) -> Option<Bytes> {
        let found = self.shard(id).read().get(id).cloned();
        match &found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Store content read for `id`. Only successful reads may be inserted.
    pub fn insert(&self, id: &str, content: Bytes) {
        self.shard(id).write().insert(id.to_string(), content);
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (entries, total_size) = self.shards.iter().fold((0, 0), |(n, size), shard| {
            let shard = shard.read();
            (
                n + shard.len(),
                size + shard.values().map(|v| v.len() as u64).sum::<u64>(),
            )
        });
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            entries,
            total_size,
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("RecordCache")
            .field("entries", &stats.entries)
            .field("size_kb", &(stats.total_size / 1024))
            .field("hit_rate", &format!("{:.1}%", stats.hit_rate * 100.0))
            .finish()
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    /// Number of cached records
    pub entries: usize,
    /// Total size of cached content in bytes
    pub total_size: u64,
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Cache hit rate (0.0 to 1.0)
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_get_insert() {
        let cache = RecordCache::new();
        assert!(cache.get("a.xml").is_none());

        cache.insert("a.xml", Bytes::from("<a/>"));
        assert_eq!(cache.get("a.xml"), Some(Bytes::from("<a/>")));
        assert!(cache.get("b.xml").is_none());
    }

    #[test]
    fn test_last_insert_wins() {
        let cache = RecordCache::new();
        cache.insert("a.xml", Bytes::from("first"));
        cache.insert("a.xml", Bytes::from("second"));
        assert_eq!(cache.get("a.xml"), Some(Bytes::from("second")));
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_stats() {
        let cache = RecordCache::new();
        cache.get("a.xml");
        cache.insert("a.xml", Bytes::from("1234"));
        cache.insert("b.xml", Bytes::from("56"));
        cache.get("a.xml");
        cache.get("b.xml");
        cache.get("a.xml");

        let stats = cache.stats();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.total_size, 6);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_concurrent_inserts() {
        let cache = Arc::new(RecordCache::new());

        std::thread::scope(|s| {
            for t in 0..8 {
                let cache = Arc::clone(&cache);
                s.spawn(move || {
                    for i in 0..50 {
                        let id = format!("{}-{}.xml", t, i);
                        cache.insert(&id, Bytes::from(id.clone()));
                        assert_eq!(cache.get(&id), Some(Bytes::from(id.clone())));
                    }
                });
            }
        });

        assert_eq!(cache.stats().entries, 400);
    }
}
