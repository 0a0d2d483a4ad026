use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use lru::LruCache;
use tracing::debug;

use crate::error::CacheSpecResult;
use crate::spec::CacheSpec;
use crate::stats::{CacheStats, StatsCounter};

/// A cached value and its bookkeeping.
struct Entry {
    value: Arc<[u8]>,
    weight: u64,
    written: Instant,
    accessed: Instant,
}

struct Inner {
    entries: LruCache<String, Entry>,
    total_weight: u64,
    /// Bumped by every `invalidate` and `clear`.
    generation: u64,
}

/// Content cache shared by every entity under a storage manager.
///
/// Keys are opaque strings chosen by the entities (a repository uses its
/// directory plus the file path). Values are immutable byte buffers handed
/// out as `Arc<[u8]>`, so a hit never copies content.
///
/// Eviction follows the [`CacheSpec`]: least-recently-used entries are
/// dropped once the size or weight bound is exceeded, and expired entries are
/// dropped when next touched. Both count as evictions in [`CacheStats`];
/// `clear()` does not.
pub struct RepositoryCache {
    spec: CacheSpec,
    inner: Mutex<Inner>,
    stats: StatsCounter,
}

impl RepositoryCache {
    /// Create a cache governed by `spec`.
    pub fn new(spec: CacheSpec) -> Self {
        debug!(spec = %spec, "repository cache created");
        Self {
            spec,
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                total_weight: 0,
                generation: 0,
            }),
            stats: StatsCounter::default(),
        }
    }

    /// Parse `spec` and create a cache governed by it.
    pub fn from_spec_str(spec: &str) -> CacheSpecResult<Self> {
        Ok(Self::new(CacheSpec::parse(spec)?))
    }

    pub fn spec(&self) -> &CacheSpec {
        &self.spec
    }

    /// Look up `key`, recording a hit or a miss.
    pub fn get(&self, key: &str) -> Option<Arc<[u8]>> {
        let found = {
            let mut inner = self.lock();
            self.lookup(&mut inner, key, Instant::now())
        };
        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        found
    }

    /// Look up `key`, computing and caching it on a miss.
    ///
    /// The loader runs without the cache lock held. A failed load is recorded
    /// and its error returned; nothing is cached. A loaded value is not cached
    /// if an `invalidate` or `clear` ran while it was loading.
    pub fn get_or_load<F, E>(&self, key: &str, load: F) -> Result<Arc<[u8]>, E>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
    {
        let (found, generation) = {
            let mut inner = self.lock();
            let found = self.lookup(&mut inner, key, Instant::now());
            (found, inner.generation)
        };
        if let Some(value) = found {
            self.stats.record_hit();
            return Ok(value);
        }
        self.stats.record_miss();

        match load() {
            Ok(bytes) => {
                self.stats.record_load_success();
                let value: Arc<[u8]> = bytes.into();
                let mut inner = self.lock();
                if inner.generation == generation {
                    self.insert(&mut inner, key, Arc::clone(&value));
                } else {
                    debug!(key, "invalidated during load; not cached");
                }
                Ok(value)
            }
            Err(e) => {
                self.stats.record_load_failure();
                Err(e)
            }
        }
    }

    /// Insert or replace `key`.
    pub fn put(&self, key: &str, value: impl Into<Arc<[u8]>>) {
        let value = value.into();
        let mut inner = self.lock();
        self.insert(&mut inner, key, value);
    }

    /// Remove `key`. Returns `true` if it was cached.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.lock();
        inner.generation += 1;
        match inner.entries.pop(key) {
            Some(entry) => {
                inner.total_weight -= entry.weight;
                true
            }
            None => false,
        }
    }

    /// Number of cached entries, including expired ones not yet touched.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the weights of all cached entries.
    pub fn weighted_size(&self) -> u64 {
        self.lock().total_weight
    }

    /// Current statistics snapshot. Never mutates the cache.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Drop every entry. Idempotent; statistics are retained.
    pub fn clear(&self) {
        let mut inner = self.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.total_weight = 0;
        inner.generation += 1;
        debug!(dropped, "repository cache cleared");
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("cache lock poisoned")
    }

    fn insert(&self, inner: &mut Inner, key: &str, value: Arc<[u8]>) {
        let now = Instant::now();
        let weight = (key.len() + value.len()) as u64;
        if let Some(old) = inner.entries.put(
            key.to_string(),
            Entry {
                value,
                weight,
                written: now,
                accessed: now,
            },
        ) {
            inner.total_weight -= old.weight;
        }
        inner.total_weight += weight;
        self.enforce_bounds(inner);
    }

    fn lookup(&self, inner: &mut Inner, key: &str, now: Instant) -> Option<Arc<[u8]>> {
        let expired = match inner.entries.get_mut(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                entry.accessed = now;
                return Some(Arc::clone(&entry.value));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            if let Some(entry) = inner.entries.pop(key) {
                inner.total_weight -= entry.weight;
                self.stats.record_eviction(entry.weight);
            }
        }
        None
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        let idle = self
            .spec
            .expire_after_access
            .is_some_and(|ttl| now.duration_since(entry.accessed) >= ttl);
        let stale = self
            .spec
            .expire_after_write
            .is_some_and(|ttl| now.duration_since(entry.written) >= ttl);
        idle || stale
    }

    fn enforce_bounds(&self, inner: &mut Inner) {
        loop {
            let over_size = self
                .spec
                .maximum_size
                .is_some_and(|max| inner.entries.len() as u64 > max);
            let over_weight = self
                .spec
                .maximum_weight
                .is_some_and(|max| inner.total_weight > max);
            if !over_size && !over_weight {
                break;
            }
            match inner.entries.pop_lru() {
                Some((_, entry)) => {
                    inner.total_weight -= entry.weight;
                    self.stats.record_eviction(entry.weight);
                }
                None => break,
            }
        }
    }
}

impl std::fmt::Debug for RepositoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryCache")
            .field("spec", &self.spec.to_string())
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn cache(spec: &str) -> RepositoryCache {
        RepositoryCache::from_spec_str(spec).unwrap()
    }

    #[test]
    fn miss_then_hit() {
        let c = cache("maximumSize=10");
        assert!(c.get("a").is_none());
        c.put("a", b"hello".to_vec());
        assert_eq!(&*c.get("a").unwrap(), b"hello");

        let s = c.stats();
        assert_eq!(s.hit_count, 1);
        assert_eq!(s.miss_count, 1);
    }

    #[test]
    fn get_or_load_caches_successes() {
        let c = cache("maximumSize=10");
        let mut calls = 0;
        for _ in 0..3 {
            let v = c
                .get_or_load("k", || -> Result<Vec<u8>, ()> {
                    calls += 1;
                    Ok(b"v".to_vec())
                })
                .unwrap();
            assert_eq!(&*v, b"v");
        }
        assert_eq!(calls, 1);
        let s = c.stats();
        assert_eq!(s.load_success_count, 1);
        assert_eq!(s.hit_count, 2);
        assert_eq!(s.miss_count, 1);
    }

    #[test]
    fn get_or_load_does_not_cache_failures() {
        let c = cache("maximumSize=10");
        let r = c.get_or_load("k", || Err::<Vec<u8>, _>("boom"));
        assert_eq!(r.unwrap_err(), "boom");
        assert!(c.is_empty());
        assert_eq!(c.stats().load_failure_count, 1);
    }

    #[test]
    fn value_invalidated_during_load_is_not_cached() {
        let c = cache("maximumSize=10");
        let v = c
            .get_or_load("k", || {
                c.invalidate("k");
                Ok::<_, ()>(b"old".to_vec())
            })
            .unwrap();
        assert_eq!(&*v, b"old");
        assert!(c.get("k").is_none());

        let v = c.get_or_load("k", || Ok::<_, ()>(b"new".to_vec())).unwrap();
        assert_eq!(&*v, b"new");
        assert_eq!(c.get("k").as_deref(), Some(&b"new"[..]));
    }

    #[test]
    fn clear_during_load_also_skips_caching() {
        let c = cache("maximumSize=10");
        c.get_or_load("k", || {
            c.clear();
            Ok::<_, ()>(b"v".to_vec())
        })
        .unwrap();
        assert!(c.is_empty());
    }

    #[test]
    fn evicts_least_recently_used_by_size() {
        let c = cache("maximumSize=2");
        c.put("a", b"1".to_vec());
        c.put("b", b"2".to_vec());
        assert!(c.get("a").is_some());
        c.put("c", b"3".to_vec());

        assert_eq!(c.len(), 2);
        assert!(c.get("b").is_none());
        assert!(c.get("a").is_some());
        assert!(c.get("c").is_some());
        assert_eq!(c.stats().eviction_count, 1);
    }

    #[test]
    fn evicts_by_weight() {
        // Each entry weighs key (1) + value (4) = 5.
        let c = cache("maximumWeight=10");
        c.put("a", vec![0u8; 4]);
        c.put("b", vec![0u8; 4]);
        assert_eq!(c.weighted_size(), 10);
        c.put("c", vec![0u8; 4]);
        assert_eq!(c.weighted_size(), 10);
        assert!(c.get("a").is_none());
        let s = c.stats();
        assert_eq!(s.eviction_count, 1);
        assert_eq!(s.eviction_weight, 5);
    }

    #[test]
    fn replacing_adjusts_weight() {
        let c = cache("maximumWeight=100");
        c.put("a", vec![0u8; 9]);
        c.put("a", vec![0u8; 19]);
        assert_eq!(c.len(), 1);
        assert_eq!(c.weighted_size(), 20);
    }

    #[test]
    fn expires_after_write() {
        let c = cache("expireAfterWrite=20ms");
        c.put("a", b"1".to_vec());
        thread::sleep(Duration::from_millis(40));
        assert!(c.get("a").is_none());
        assert_eq!(c.stats().eviction_count, 1);
        assert_eq!(c.weighted_size(), 0);
    }

    #[test]
    fn expires_after_access() {
        let c = cache("expireAfterAccess=50ms");
        c.put("a", b"1".to_vec());
        assert!(c.get("a").is_some());
        thread::sleep(Duration::from_millis(80));
        assert!(c.get("a").is_none());
    }

    #[test]
    fn invalidate_removes_entry() {
        let c = cache("maximumSize=10");
        c.put("a", b"1".to_vec());
        assert!(c.invalidate("a"));
        assert!(!c.invalidate("a"));
        assert_eq!(c.weighted_size(), 0);
    }

    #[test]
    fn clear_is_idempotent_and_keeps_stats() {
        let c = cache("maximumSize=10");
        c.put("a", b"1".to_vec());
        c.get("a");
        c.clear();
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.weighted_size(), 0);
        let s = c.stats();
        assert_eq!(s.hit_count, 1);
        assert_eq!(s.eviction_count, 0);
    }

    #[test]
    fn unbounded_spec_keeps_everything() {
        let c = cache("expireAfterAccess=1h");
        for i in 0..100 {
            c.put(&format!("k{i}"), vec![0u8; 64]);
        }
        assert_eq!(c.len(), 100);
    }

    #[test]
    fn concurrent_access() {
        let c = Arc::new(cache("maximumSize=1000"));
        thread::scope(|s| {
            for t in 0..4 {
                let c = Arc::clone(&c);
                s.spawn(move || {
                    for i in 0..100 {
                        let key = format!("{t}-{i}");
                        c.put(&key, vec![t as u8]);
                        assert!(c.get(&key).is_some());
                    }
                });
            }
        });
        assert_eq!(c.len(), 400);
        assert_eq!(c.stats().hit_count, 400);
    }
}
