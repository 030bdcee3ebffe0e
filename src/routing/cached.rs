//! Path-keyed cached wrapper over [`Router`].
//!
//! Caches match results under the raw path string. On a hit the stored
//! result is returned unchanged — filters and fallbacks are only evaluated
//! on a miss, so their outcome is frozen into the cache as if the path alone
//! determined routing. Callers must keep filter/fallback behavior stable per
//! path, or accept stale results.
//!
//! Cache keys are exact path strings. Callers strip query strings before
//! matching; a query string would only fragment the cache.

use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::cache::BoundedCache;

use super::router::{Fallback, RouteMatch, Router};

const SOURCE: &str = "routing::cached";

const METRIC_ROUTE_CACHE_HIT: &str = "brezza_route_cache_hit_total";
const METRIC_ROUTE_CACHE_MISS: &str = "brezza_route_cache_miss_total";
const METRIC_ROUTE_CACHE_EVICT: &str = "brezza_route_cache_evict_total";

/// Match results shared between the cache and callers.
pub type SharedMatches<T> = Arc<Vec<RouteMatch<T>>>;

/// A [`Router`] with a bounded match-result cache keyed by path.
pub struct CachedRouter<T: Clone> {
    router: Router<T>,
    results: BoundedCache<SharedMatches<T>>,
}

impl<T: Clone> CachedRouter<T> {
    /// Wrap a router with a cache holding up to `capacity` distinct paths
    /// (unit weight per path).
    pub fn new(router: Router<T>, capacity: usize) -> Self {
        Self {
            router,
            results: BoundedCache::new(capacity)
                .with_eviction_hook(|_, _| counter!(METRIC_ROUTE_CACHE_EVICT).increment(1)),
        }
    }

    /// Register a pattern on the wrapped router.
    ///
    /// The cache is NOT invalidated: registering after traffic has warmed the
    /// cache can leave stale "no match" (or shorter-than-now) entries behind.
    /// Deployments that add routes after startup call [`Self::clear_cache`]
    /// afterwards.
    pub fn add(&mut self, pattern: &str, target: T) {
        self.router.add(pattern, target);
    }

    /// Cached equivalent of [`Router::match_path`].
    pub fn match_path(&self, path: &str) -> SharedMatches<T> {
        self.match_path_or(path, |_| true, &[])
    }

    /// Cached equivalent of [`Router::match_path_or`]. The filter and the
    /// fallbacks run only on a miss.
    pub fn match_path_or(
        &self,
        path: &str,
        filter: impl Fn(&T) -> bool,
        fallbacks: &[Fallback<'_, T>],
    ) -> SharedMatches<T> {
        if let Some(cached) = self.results.get(path) {
            debug!(target_module = SOURCE, path, outcome = "hit", "serving cached match");
            counter!(METRIC_ROUTE_CACHE_HIT).increment(1);
            return cached;
        }

        debug!(target_module = SOURCE, path, outcome = "miss", "evaluating registry");
        counter!(METRIC_ROUTE_CACHE_MISS).increment(1);

        let matches: SharedMatches<T> = Arc::new(self.router.match_path_or(path, filter, fallbacks));
        self.results.set(path, Arc::clone(&matches));
        matches
    }

    /// First cached match in registration order, if any.
    pub fn first_match(&self, path: &str) -> Option<RouteMatch<T>> {
        self.match_path(path).first().cloned()
    }

    /// Drop every cached match result. The registry itself is untouched.
    pub fn clear_cache(&self) {
        self.results.clear();
    }

    /// Direct access to the wrapped router, bypassing the cache.
    pub fn router(&self) -> &Router<T> {
        &self.router
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn sample() -> CachedRouter<&'static str> {
        let mut router = Router::new();
        router.add("/posts/:slug", "post");
        router.add("/static/(.*)", "asset");
        CachedRouter::new(router, 8)
    }

    #[test]
    fn cold_and_warm_results_equal_uncached() {
        let cached = sample();
        let direct = cached.router().match_path("/posts/hello");

        let cold = cached.match_path("/posts/hello");
        assert_eq!(*cold, direct);

        let warm = cached.match_path("/posts/hello");
        assert_eq!(*warm, direct);
        assert!(Arc::ptr_eq(&cold, &warm));
    }

    #[test]
    fn filter_runs_only_on_miss() {
        let cached = sample();
        let filter_calls = AtomicUsize::new(0);
        let filter = |_: &&'static str| {
            filter_calls.fetch_add(1, Ordering::SeqCst);
            true
        };

        cached.match_path_or("/posts/hello", filter, &[]);
        let after_cold = filter_calls.load(Ordering::SeqCst);
        assert!(after_cold > 0);

        cached.match_path_or("/posts/hello", filter, &[]);
        assert_eq!(filter_calls.load(Ordering::SeqCst), after_cold);
    }

    #[test]
    fn no_match_is_cached_too() {
        let cached = sample();
        assert!(cached.match_path("/nowhere").is_empty());

        let fallback = || panic!("fallback must not run on a warm path");
        assert!(cached.match_path_or("/nowhere", |_| true, &[&fallback]).is_empty());
    }

    #[test]
    fn clear_cache_recomputes_after_registry_mutation() {
        let mut cached = sample();
        assert!(cached.match_path("/about").is_empty());

        cached.add("/about", "about-page");
        // Stale: the warmed "no match" entry still answers.
        assert!(cached.match_path("/about").is_empty());

        cached.clear_cache();
        let matches = cached.match_path("/about");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].target, "about-page");
    }

    #[test]
    fn first_match_reads_through_cache() {
        let cached = sample();
        let first = cached.first_match("/static/css/site.css").expect("match");
        assert_eq!(first.target, "asset");
    }
}
