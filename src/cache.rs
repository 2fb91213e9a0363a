//! Memoized outcome books
//!
//! Books are keyed by draw, condition filter and snapshot revision, so a
//! changed snapshot never reads a stale book. Entries for older revisions
//! of a draw are purged as soon as a newer revision is seen.

use crate::lottery::{ConditionFilter, OutcomeBook};
use dashmap::DashMap;
use lru::LruCache;
use serde::Serialize;
use std::{
    num::NonZeroUsize,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};
use tracing::{debug, info};

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookKey {
    pub draw_id: String,
    pub filter: ConditionFilter,
    pub revision: u64,
}

impl BookKey {
    pub fn new(draw_id: &str, filter: ConditionFilter, revision: u64) -> Self {
        Self {
            draw_id: draw_id.to_string(),
            filter,
            revision,
        }
    }
}

struct CachedBook {
    book: Arc<OutcomeBook>,
    created_at: Instant,
}

impl CachedBook {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.map_or(false, |ttl| self.created_at.elapsed() > ttl)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub capacity: usize,
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

pub struct BookCache {
    books: Mutex<LruCache<BookKey, CachedBook>>,
    /// Latest revision seen per draw
    revisions: DashMap<String, u64>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl BookCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_CAPACITY } else { capacity };
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            books: Mutex::new(LruCache::new(capacity)),
            revisions: DashMap::new(),
            ttl: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_ttl(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new(capacity)
        }
    }

    fn books(&self) -> MutexGuard<'_, LruCache<BookKey, CachedBook>> {
        // A panic mid-insert leaves the map itself consistent
        self.books.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &BookKey) -> Option<Arc<OutcomeBook>> {
        self.observe_revision(&key.draw_id, key.revision);

        let mut books = self.books();
        let expired = match books.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(Arc::clone(&entry.book));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            books.pop(key);
            debug!(draw_id = %key.draw_id, filter = %key.filter, "cached book expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, key: BookKey, book: Arc<OutcomeBook>) {
        self.observe_revision(&key.draw_id, key.revision);

        let entry = CachedBook {
            book,
            created_at: Instant::now(),
        };
        let pushed = key.clone();
        if let Some((evicted, _)) = self.books().push(key, entry) {
            if evicted != pushed {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(draw_id = %evicted.draw_id, revision = evicted.revision, "evicted cached book");
            }
        }
    }

    /// Cached book for `key`, building and storing it on a miss
    pub fn get_or_build<F>(&self, key: BookKey, build: F) -> Arc<OutcomeBook>
    where
        F: FnOnce() -> OutcomeBook,
    {
        if let Some(book) = self.get(&key) {
            return book;
        }
        let book = Arc::new(build());
        self.put(key, Arc::clone(&book));
        book
    }

    /// Drop every cached book for the draw; returns how many were removed
    pub fn invalidate_draw(&self, draw_id: &str) -> usize {
        let removed = self.remove_where(|key| key.draw_id == draw_id);
        self.revisions.remove(draw_id);
        info!(draw_id, removed, "invalidated cached books");
        removed
    }

    pub fn clear(&self) {
        self.books().clear();
        self.revisions.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let books = self.books();
        CacheStats {
            capacity: books.cap().get(),
            size: books.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Record `revision` for the draw and purge books of older revisions
    fn observe_revision(&self, draw_id: &str, revision: u64) {
        let stale = {
            let mut latest = self.revisions.entry(draw_id.to_string()).or_insert(revision);
            if revision > *latest {
                let previous = *latest;
                *latest = revision;
                Some(previous)
            } else {
                None
            }
        };
        if let Some(previous) = stale {
            let removed =
                self.remove_where(|key| key.draw_id == draw_id && key.revision < revision);
            debug!(draw_id, previous, revision, removed, "snapshot revision advanced");
        }
    }

    fn remove_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&BookKey) -> bool,
    {
        let mut books = self.books();
        let doomed: Vec<BookKey> = books
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            books.pop(key);
        }
        doomed.len()
    }
}

impl Default for BookCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(draw_id: &str) -> Arc<OutcomeBook> {
        Arc::new(OutcomeBook::new(draw_id, ConditionFilter::All))
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = BookCache::new(4);
        let key = BookKey::new("d1", ConditionFilter::All, 1);

        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), book("d1"));
        assert!(cache.get(&key).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_filter_is_part_of_key() {
        let cache = BookCache::new(4);
        cache.put(BookKey::new("d1", ConditionFilter::First, 1), book("d1"));
        assert!(cache.get(&BookKey::new("d1", ConditionFilter::Second, 1)).is_none());
    }

    #[test]
    fn test_eviction_counted() {
        let cache = BookCache::new(2);
        cache.put(BookKey::new("d1", ConditionFilter::All, 1), book("d1"));
        cache.put(BookKey::new("d2", ConditionFilter::All, 1), book("d2"));
        cache.put(BookKey::new("d3", ConditionFilter::All, 1), book("d3"));

        assert!(cache.get(&BookKey::new("d1", ConditionFilter::All, 1)).is_none());
        assert_eq!(cache.stats().evictions, 1);

        // Replacing an existing key is not an eviction
        cache.put(BookKey::new("d3", ConditionFilter::All, 1), book("d3"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_newer_revision_purges_older() {
        let cache = BookCache::new(8);
        cache.put(BookKey::new("d1", ConditionFilter::All, 1), book("d1"));
        cache.put(BookKey::new("d1", ConditionFilter::First, 1), book("d1"));
        cache.put(BookKey::new("d2", ConditionFilter::All, 1), book("d2"));

        assert!(cache.get(&BookKey::new("d1", ConditionFilter::All, 2)).is_none());
        assert_eq!(cache.stats().size, 1);
        assert!(cache.get(&BookKey::new("d2", ConditionFilter::All, 1)).is_some());
    }

    #[test]
    fn test_invalidate_draw() {
        let cache = BookCache::new(8);
        cache.put(BookKey::new("d1", ConditionFilter::All, 1), book("d1"));
        cache.put(BookKey::new("d1", ConditionFilter::Second, 1), book("d1"));
        cache.put(BookKey::new("d2", ConditionFilter::All, 1), book("d2"));

        assert_eq!(cache.invalidate_draw("d1"), 2);
        assert_eq!(cache.stats().size, 1);
        assert_eq!(cache.invalidate_draw("d1"), 0);
    }

    #[test]
    fn test_get_or_build_builds_once() {
        let cache = BookCache::new(4);
        let key = BookKey::new("d1", ConditionFilter::All, 1);
        let mut builds = 0;
        for _ in 0..3 {
            cache.get_or_build(key.clone(), || {
                builds += 1;
                OutcomeBook::new("d1", ConditionFilter::All)
            });
        }
        assert_eq!(builds, 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = BookCache::with_ttl(4, Duration::from_millis(20));
        let key = BookKey::new("d1", ConditionFilter::All, 1);
        cache.put(key.clone(), book("d1"));
        assert!(cache.get(&key).is_some());

        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_zero_capacity_falls_back() {
        assert_eq!(BookCache::new(0).stats().capacity, DEFAULT_CAPACITY);
    }
}
