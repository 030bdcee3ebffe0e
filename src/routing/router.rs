//! Ordered route matching.
//!
//! Registrations are evaluated in insertion order, which makes results
//! deterministic and gives first-registered-wins semantics for ambiguous
//! paths. Matching cost is O(registrations × pattern evaluation) per call;
//! the cached wrapper in [`super::cached`] exists to amortize exactly that.

use tracing::debug;

use super::pattern::{Params, RoutePattern};

const SOURCE: &str = "routing::router";

/// A fallback producer, consulted in order when no registration matches.
pub type Fallback<'a, T> = &'a dyn Fn() -> Vec<RouteMatch<T>>;

/// One matched registration: the pattern it was registered under, the opaque
/// target, and the extracted `:name` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<T> {
    pub pattern: String,
    pub target: T,
    pub params: Params,
}

struct Registration<T> {
    pattern: RoutePattern,
    target: T,
}

/// An ordered registry of (pattern, target) pairs.
///
/// Registrations are immutable once added and live as long as the router.
pub struct Router<T> {
    routes: Vec<Registration<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register a pattern. Compilation happens here, eagerly, so match-time
    /// work is pure evaluation. Never fails.
    pub fn add(&mut self, pattern: &str, target: T) {
        self.routes.push(Registration {
            pattern: RoutePattern::compile(pattern),
            target,
        });
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<T: Clone> Router<T> {
    /// All matches for a path, in registration order.
    pub fn match_path(&self, path: &str) -> Vec<RouteMatch<T>> {
        self.match_path_where(path, |_| true)
    }

    /// All matches whose target passes the filter. A structural match whose
    /// target fails the filter does not count as a match at all.
    pub fn match_path_where(&self, path: &str, filter: impl Fn(&T) -> bool) -> Vec<RouteMatch<T>> {
        let matches: Vec<RouteMatch<T>> = self
            .routes
            .iter()
            .filter_map(|registration| {
                let params = registration.pattern.matches(path)?;
                if !filter(&registration.target) {
                    return None;
                }
                Some(RouteMatch {
                    pattern: registration.pattern.raw().to_string(),
                    target: registration.target.clone(),
                    params,
                })
            })
            .collect();

        debug!(
            target_module = SOURCE,
            path,
            matched = matches.len(),
            "evaluated route registry"
        );
        matches
    }

    /// Like [`Self::match_path_where`], but when nothing matches, fallback
    /// producers run in priority order and the first non-empty result wins.
    /// All fallbacks exhausted means no match.
    pub fn match_path_or(
        &self,
        path: &str,
        filter: impl Fn(&T) -> bool,
        fallbacks: &[Fallback<'_, T>],
    ) -> Vec<RouteMatch<T>> {
        let matches = self.match_path_where(path, filter);
        if !matches.is_empty() {
            return matches;
        }

        for fallback in fallbacks {
            let produced = fallback();
            if !produced.is_empty() {
                debug!(target_module = SOURCE, path, "fallback produced a match");
                return produced;
            }
        }
        Vec::new()
    }

    /// First match in registration order, if any.
    pub fn first_match(&self, path: &str) -> Option<RouteMatch<T>> {
        self.match_path(path).into_iter().next()
    }
}
