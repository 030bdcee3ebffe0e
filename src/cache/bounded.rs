//! Capacity-bounded weighted LRU cache.
//!
//! A map from string keys to arbitrary values, bounded by the total weight of
//! its entries. Weight defaults to one unit per entry; owners that account in
//! bytes supply their own weigher. When an insertion pushes the total weight
//! over capacity, least-recently-used entries are dropped until the budget
//! holds again, and the eviction hook fires once per dropped entry.
//!
//! The hook carries no built-in semantics: the cache never touches external
//! resources itself. A component that owns files (or sockets, or anything
//! else) behind its entries interprets "evicted" as "dispose".

use std::sync::Mutex;

use lru::LruCache;
use tracing::debug;

use crate::util::bytes::format_bytes;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::bounded";

type WeightFn<V> = dyn Fn(&str, &V) -> usize + Send + Sync;
type EvictionHook<V> = dyn Fn(&str, &V) + Send + Sync;

/// Weighted LRU cache with a fixed capacity budget.
///
/// `get` promotes the entry to most-recently-used; `has` is a non-touching
/// peek. All structural work happens under one mutex and is proportional to
/// the number of evicted entries, never to producer work — callers compute
/// values outside the cache and only hand in finished results.
pub struct BoundedCache<V> {
    capacity: usize,
    weigh: Box<WeightFn<V>>,
    on_evict: Option<Box<EvictionHook<V>>>,
    inner: Mutex<Inner<V>>,
}

struct Inner<V> {
    entries: LruCache<String, Weighted<V>>,
    total_weight: usize,
}

struct Weighted<V> {
    value: V,
    weight: usize,
}

impl<V> BoundedCache<V> {
    /// Create a cache bounded by entry count (unit weight per entry).
    pub fn new(capacity: usize) -> Self {
        Self::with_weigher(capacity, |_, _| 1)
    }

    /// Create a cache bounded by the given weigher, typically a byte-size
    /// function over key and value.
    pub fn with_weigher(
        capacity: usize,
        weigh: impl Fn(&str, &V) -> usize + Send + Sync + 'static,
    ) -> Self {
        Self {
            capacity,
            weigh: Box::new(weigh),
            on_evict: None,
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                total_weight: 0,
            }),
        }
    }

    /// Attach a hook invoked once per evicted entry, with that entry's key
    /// and value. The hook runs synchronously during the mutation that caused
    /// the eviction, after the structure has already been updated; it cannot
    /// roll the mutation back.
    pub fn with_eviction_hook(mut self, hook: impl Fn(&str, &V) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Box::new(hook));
        self
    }

    /// Look up a value, promoting the entry to most-recently-used on hit.
    pub fn get(&self, key: &str) -> Option<V>
    where
        V: Clone,
    {
        let mut inner = mutex_lock(&self.inner, SOURCE, "get");
        inner.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Existence check without promotion.
    pub fn has(&self, key: &str) -> bool {
        let inner = mutex_lock(&self.inner, SOURCE, "has");
        inner.entries.contains(key)
    }

    /// Insert or replace an entry, then evict least-recently-used entries
    /// until the weight budget holds. Replacing an existing key supersedes
    /// the old value without firing the eviction hook.
    ///
    /// An entry whose weight alone exceeds the capacity (or any entry, when
    /// capacity is zero) is evicted immediately after insertion; `set` still
    /// succeeds and the cache behaves as a no-op for that entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let weight = (self.weigh)(&key, &value);

        let mut dropped = Vec::new();
        {
            let mut inner = mutex_lock(&self.inner, SOURCE, "set");
            if let Some((_, superseded)) = inner.entries.push(key, Weighted { value, weight }) {
                inner.total_weight -= superseded.weight;
            }
            inner.total_weight += weight;

            // The just-inserted entry is most-recently-used, so it is popped
            // only once nothing older remains.
            while inner.total_weight > self.capacity {
                let Some((evicted_key, entry)) = inner.entries.pop_lru() else {
                    break;
                };
                inner.total_weight -= entry.weight;
                dropped.push((evicted_key, entry));
            }
        }

        // Hooks run outside the structural lock so they can re-enter the
        // cache or hand work to a runtime without deadlocking.
        for (evicted_key, entry) in &dropped {
            self.dispose(evicted_key, entry);
        }
    }

    /// Remove an entry explicitly, firing the eviction hook if present.
    pub fn remove(&self, key: &str) -> Option<V> {
        let entry = {
            let mut inner = mutex_lock(&self.inner, SOURCE, "remove");
            let entry = inner.entries.pop(key)?;
            inner.total_weight -= entry.weight;
            entry
        };
        self.dispose(key, &entry);
        Some(entry.value)
    }

    /// Drop every entry, firing the eviction hook for each.
    pub fn clear(&self) {
        let mut dropped = Vec::new();
        {
            let mut inner = mutex_lock(&self.inner, SOURCE, "clear");
            while let Some((key, entry)) = inner.entries.pop_lru() {
                dropped.push((key, entry));
            }
            inner.total_weight = 0;
        }
        for (key, entry) in &dropped {
            self.dispose(key, entry);
        }
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        mutex_lock(&self.inner, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of weights of retained entries. Always ≤ capacity after any
    /// mutation completes.
    pub fn total_weight(&self) -> usize {
        mutex_lock(&self.inner, SOURCE, "total_weight").total_weight
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn dispose(&self, key: &str, entry: &Weighted<V>) {
        debug!(
            target_module = SOURCE,
            key,
            weight = %format_bytes(entry.weight as u64),
            "evicting cache entry"
        );
        if let Some(hook) = self.on_evict.as_ref() {
            hook(key, &entry.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn disposal_log() -> (
        Arc<Mutex<Vec<(String, &'static str)>>>,
        impl Fn(&str, &&'static str) + Send + Sync + 'static,
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let hook = move |key: &str, value: &&'static str| {
            sink.lock().unwrap().push((key.to_string(), *value));
        };
        (log, hook)
    }

    #[test]
    fn get_hit_and_miss() {
        let cache = BoundedCache::new(4);
        assert!(cache.get("a").is_none());
        cache.set("a", 1);
        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_invariant_holds_after_every_set() {
        let cache = BoundedCache::with_weigher(10, |_, value: &usize| *value);
        for (key, weight) in [("a", 4), ("b", 4), ("c", 4), ("d", 9), ("e", 1), ("f", 10)] {
            cache.set(key, weight);
            assert!(
                cache.total_weight() <= cache.capacity(),
                "weight {} exceeded capacity after inserting {key}",
                cache.total_weight()
            );
        }
    }

    #[test]
    fn lru_entry_is_evicted_first() {
        let cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn get_promotes_entry() {
        let cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get("a"), Some(1));
        cache.set("c", 3);

        // "b" was least recently used once "a" was touched.
        assert!(cache.has("a"));
        assert!(!cache.has("b"));
        assert!(cache.has("c"));
    }

    #[test]
    fn has_does_not_promote() {
        let cache = BoundedCache::new(2);
        cache.set("a", 1);
        cache.set("b", 2);
        assert!(cache.has("a"));
        cache.set("c", 3);

        // The peek did not refresh "a", so it was still first out.
        assert!(!cache.has("a"));
        assert!(cache.has("b"));
    }

    #[test]
    fn disposal_hook_fires_once_per_evicted_entry() {
        let (log, hook) = disposal_log();
        let cache = BoundedCache::new(2).with_eviction_hook(hook);

        cache.set("a", "value-a");
        cache.set("b", "value-b");
        cache.set("c", "value-c");

        assert_eq!(log.lock().unwrap().as_slice(), &[("a".to_string(), "value-a")]);

        assert_eq!(cache.get("b"), Some("value-b"));
        cache.set("d", "value-d");

        // "c" was least recently used after "b" was touched.
        let events = log.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            &[
                ("a".to_string(), "value-a"),
                ("c".to_string(), "value-c"),
            ]
        );
    }

    #[test]
    fn replacement_supersedes_without_disposal() {
        let (log, hook) = disposal_log();
        let cache = BoundedCache::new(2).with_eviction_hook(hook);

        cache.set("a", "first");
        cache.set("a", "second");

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(cache.get("a"), Some("second"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn remove_fires_disposal() {
        let (log, hook) = disposal_log();
        let cache = BoundedCache::new(2).with_eviction_hook(hook);

        cache.set("a", "value-a");
        assert_eq!(cache.remove("a"), Some("value-a"));
        assert_eq!(log.lock().unwrap().as_slice(), &[("a".to_string(), "value-a")]);
        assert!(cache.remove("a").is_none());
        assert_eq!(cache.total_weight(), 0);
    }

    #[test]
    fn zero_capacity_is_a_no_op_cache() {
        let (log, hook) = disposal_log();
        let cache = BoundedCache::new(0).with_eviction_hook(hook);

        cache.set("a", "value-a");

        assert!(!cache.has("a"));
        assert!(cache.is_empty());
        assert_eq!(cache.total_weight(), 0);
        assert_eq!(log.lock().unwrap().as_slice(), &[("a".to_string(), "value-a")]);
    }

    #[test]
    fn oversized_entry_is_immediately_evicted() {
        let cache = BoundedCache::with_weigher(8, |_, value: &usize| *value);
        cache.set("small", 3);
        cache.set("huge", 64);

        assert!(!cache.has("huge"));
        // The oversized insert drained everything older before giving up on
        // itself, so the cache ends empty.
        assert!(cache.is_empty());
        assert_eq!(cache.total_weight(), 0);
    }

    #[test]
    fn clear_disposes_every_entry() {
        let (log, hook) = disposal_log();
        let cache = BoundedCache::new(4).with_eviction_hook(hook);

        cache.set("a", "value-a");
        cache.set("b", "value-b");
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.total_weight(), 0);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn weighted_eviction_drains_until_budget_holds() {
        let (log, hook) = disposal_log();
        let cache = BoundedCache::with_weigher(10, |_, value: &&'static str| value.len())
            .with_eviction_hook(hook);

        cache.set("a", "aaaa");
        cache.set("b", "bbbb");
        // 9 bytes force both 4-byte entries out.
        cache.set("c", "ccccccccc");

        assert_eq!(log.lock().unwrap().len(), 2);
        assert!(cache.has("c"));
        assert_eq!(cache.total_weight(), 9);
    }
}
