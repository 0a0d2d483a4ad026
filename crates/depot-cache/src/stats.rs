use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Immutable snapshot of cache statistics.
///
/// [`CacheStats::empty`] is the neutral snapshot reported when no cache is
/// configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub load_success_count: u64,
    pub load_failure_count: u64,
    pub eviction_count: u64,
    pub eviction_weight: u64,
}

impl CacheStats {
    /// A snapshot with every counter at zero.
    pub const fn empty() -> Self {
        Self {
            hit_count: 0,
            miss_count: 0,
            load_success_count: 0,
            load_failure_count: 0,
            eviction_count: 0,
            eviction_weight: 0,
        }
    }

    /// Total lookups: hits plus misses.
    pub fn request_count(&self) -> u64 {
        self.hit_count.saturating_add(self.miss_count)
    }

    /// Fraction of lookups that hit. `1.0` when there were no lookups.
    pub fn hit_rate(&self) -> f64 {
        match self.request_count() {
            0 => 1.0,
            total => self.hit_count as f64 / total as f64,
        }
    }

    /// Fraction of lookups that missed. `0.0` when there were no lookups.
    pub fn miss_rate(&self) -> f64 {
        match self.request_count() {
            0 => 0.0,
            total => self.miss_count as f64 / total as f64,
        }
    }

    /// Total loads attempted after a miss.
    pub fn load_count(&self) -> u64 {
        self.load_success_count.saturating_add(self.load_failure_count)
    }
}

/// Lock-free counters behind a live cache.
#[derive(Debug, Default)]
pub(crate) struct StatsCounter {
    hits: AtomicU64,
    misses: AtomicU64,
    load_successes: AtomicU64,
    load_failures: AtomicU64,
    evictions: AtomicU64,
    eviction_weight: AtomicU64,
}

impl StatsCounter {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_success(&self) {
        self.load_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self, weight: u64) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        self.eviction_weight.fetch_add(weight, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            load_success_count: self.load_successes.load(Ordering::Relaxed),
            load_failure_count: self.load_failures.load(Ordering::Relaxed),
            eviction_count: self.evictions.load(Ordering::Relaxed),
            eviction_weight: self.eviction_weight.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_all_zero() {
        let s = CacheStats::empty();
        assert_eq!(s, CacheStats::default());
        assert_eq!(s.request_count(), 0);
        assert_eq!(s.load_count(), 0);
    }

    #[test]
    fn rates_without_requests() {
        let s = CacheStats::empty();
        assert_eq!(s.hit_rate(), 1.0);
        assert_eq!(s.miss_rate(), 0.0);
    }

    #[test]
    fn rates_with_requests() {
        let s = CacheStats {
            hit_count: 3,
            miss_count: 1,
            ..CacheStats::empty()
        };
        assert_eq!(s.request_count(), 4);
        assert!((s.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert!((s.miss_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn counter_snapshot() {
        let c = StatsCounter::default();
        c.record_hit();
        c.record_miss();
        c.record_miss();
        c.record_load_success();
        c.record_load_failure();
        c.record_eviction(10);
        let s = c.snapshot();
        assert_eq!(s.hit_count, 1);
        assert_eq!(s.miss_count, 2);
        assert_eq!(s.load_count(), 2);
        assert_eq!(s.eviction_count, 1);
        assert_eq!(s.eviction_weight, 10);
    }

    #[test]
    fn serializes_counters() {
        let json = serde_json::to_value(CacheStats::empty()).unwrap();
        assert_eq!(json["hit_count"], 0);
        assert_eq!(json["eviction_weight"], 0);
    }
}
