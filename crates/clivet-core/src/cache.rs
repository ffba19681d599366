//! # TTL Cache
//!
//! Explicit freshness-windowed cache for rarely-changing lists (the tutor
//! directory in particular). An instance is owned by application context
//! and passed where needed; there is no module-level ambient state.

use chrono::{DateTime, Duration, Utc};

use crate::types::Tutor;

/// A single-slot cache with an explicit `{data, fetched_at}` pair and a
/// fixed time-to-live.
#[derive(Debug, Clone)]
pub struct TtlCache<T> {
    data: Option<T>,
    fetched_at: Option<DateTime<Utc>>,
    ttl: Duration,
}

impl<T> TtlCache<T> {
    /// Creates an empty cache with the given freshness window.
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            data: None,
            fetched_at: None,
            ttl,
        }
    }

    /// Returns the cached value if it is still fresh at `now`.
    pub fn get(&self, now: DateTime<Utc>) -> Option<&T> {
        let fetched_at = self.fetched_at?;
        if now - fetched_at > self.ttl {
            return None;
        }
        self.data.as_ref()
    }

    /// Stores a freshly fetched value.
    pub fn put(&mut self, data: T, now: DateTime<Utc>) {
        self.data = Some(data);
        self.fetched_at = Some(now);
    }

    /// Drops the cached value; the next read misses.
    ///
    /// Called after writes that change the underlying list (new tutor,
    /// balance adjustment).
    pub fn invalidate(&mut self) {
        self.data = None;
        self.fetched_at = None;
    }
}

/// The tutor list cache used by the point-of-sale wizard's tutor picker.
pub type TutorCache = TtlCache<Vec<Tutor>>;

/// Default freshness window for the tutor list.
pub fn default_tutor_ttl() -> Duration {
    Duration::minutes(5)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cache_misses() {
        let cache: TtlCache<Vec<i64>> = TtlCache::new(Duration::minutes(5));
        assert!(cache.get(Utc::now()).is_none());
    }

    #[test]
    fn test_fresh_value_hits() {
        let now = Utc::now();
        let mut cache = TtlCache::new(Duration::minutes(5));
        cache.put(vec![1, 2, 3], now);

        assert_eq!(cache.get(now), Some(&vec![1, 2, 3]));
        assert_eq!(cache.get(now + Duration::minutes(4)), Some(&vec![1, 2, 3]));
    }

    #[test]
    fn test_stale_value_misses() {
        let now = Utc::now();
        let mut cache = TtlCache::new(Duration::minutes(5));
        cache.put(vec![1], now);

        assert!(cache.get(now + Duration::minutes(6)).is_none());
    }

    #[test]
    fn test_invalidate() {
        let now = Utc::now();
        let mut cache = TtlCache::new(Duration::minutes(5));
        cache.put(vec![1], now);
        cache.invalidate();

        assert!(cache.get(now).is_none());
    }
}
