//! Router core - composite of the exact index and the pattern matcher.
//!
//! Registration happens once, single-threaded, before serving. After that the
//! router is only read, so one instance can be shared across worker threads
//! behind an `Arc` without locking.

use http::Method;
use serde::ser::{Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::RouteError;
use super::exact::ExactIndex;
use super::matcher::{AmbiguityPolicy, PatternMatcher};
use super::pattern::{normalize_path, RoutePattern};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Names are `Arc<str>` shared with the compiled pattern; values are
/// per-request data taken from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Set of HTTP methods a registration applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSet(SmallVec<[Method; 4]>);

impl MethodSet {
    #[must_use]
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// A set with exactly one method.
    #[must_use]
    pub fn single(method: Method) -> Self {
        let mut set = Self::new();
        set.insert(method);
        set
    }

    /// `GET` when `self` is empty, `self` otherwise.
    #[must_use]
    pub fn or_get(self) -> Self {
        if self.is_empty() {
            Self::single(Method::GET)
        } else {
            self
        }
    }

    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.0.iter().any(|m| m == method)
    }

    /// Add a method, ignoring duplicates.
    pub fn insert(&mut self, method: Method) {
        if !self.contains(&method) {
            self.0.push(method);
        }
    }

    /// Union `other` into `self`.
    pub fn extend(&mut self, other: &MethodSet) {
        for method in other.iter() {
            self.insert(method.clone());
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.0.iter()
    }
}

impl FromIterator<Method> for MethodSet {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        let mut set = Self::new();
        for method in iter {
            set.insert(method);
        }
        set
    }
}

impl From<Method> for MethodSet {
    fn from(method: Method) -> Self {
        Self::single(method)
    }
}

impl<const N: usize> From<[Method; N]> for MethodSet {
    fn from(methods: [Method; N]) -> Self {
        methods.into_iter().collect()
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, method) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(method.as_str())?;
        }
        Ok(())
    }
}

impl Serialize for MethodSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(Method::as_str))
    }
}

/// Result of resolving a method and path.
///
/// `path_params` is empty for exact-index hits.
pub struct RouteMatch<T: ?Sized> {
    /// Whatever was registered for the route (the dispatcher stores route names)
    pub target: Arc<T>,
    /// Cleaned template that matched
    pub template: Arc<str>,
    /// Bound variables in template order
    pub path_params: ParamVec,
}

impl<T: ?Sized> RouteMatch<T> {
    /// Get a path parameter by name. Last write wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

impl<T: ?Sized> Clone for RouteMatch<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            template: Arc::clone(&self.template),
            path_params: self.path_params.clone(),
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for RouteMatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("target", &self.target)
            .field("template", &self.template)
            .field("path_params", &self.path_params)
            .finish()
    }
}

/// One way of resolving a request to a registered target.
///
/// Strategies report misses as `NotFound`; the composite [`Router`] decides
/// whether a miss is really a `MethodNotAllowed` via [`MatchStrategy::allowed_methods`].
pub trait MatchStrategy<T: ?Sized>: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Resolve `method` + `path`.
    ///
    /// # Errors
    ///
    /// `NotFound` on a miss, `AmbiguousMatch` when the strategy refuses to pick.
    fn find(&self, method: &Method, path: &str) -> Result<RouteMatch<T>, RouteError>;

    /// Methods under which `path` would have matched.
    fn allowed_methods(&self, path: &str) -> MethodSet;
}

/// Composite router: exact index first, pattern matcher second, then one
/// retry against the normalized path.
pub struct Router<T: ?Sized> {
    exact: ExactIndex<T>,
    patterns: PatternMatcher<T>,
    templates: usize,
}

impl<T: ?Sized> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Router<T> {
    /// Empty router using [`AmbiguityPolicy::MostSpecific`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(AmbiguityPolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: AmbiguityPolicy) -> Self {
        Self {
            exact: ExactIndex::new(),
            patterns: PatternMatcher::new(policy),
            templates: 0,
        }
    }

    #[must_use]
    pub fn policy(&self) -> AmbiguityPolicy {
        self.patterns.policy()
    }

    /// Number of templates registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates == 0
    }

    /// Compile and register one template.
    ///
    /// The cleaned template always goes into the exact index; it additionally
    /// goes into the pattern matcher when it has a variable or a wildcard.
    /// An empty method set means `GET`. Returns the cleaned template.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the template does not compile.
    pub fn register(
        &mut self,
        template: &str,
        methods: &MethodSet,
        target: Arc<T>,
    ) -> Result<Arc<str>, RouteError> {
        let pattern = RoutePattern::compile(template)?;
        Ok(self.insert(pattern, methods, target))
    }

    /// Register an already compiled pattern. Returns the cleaned template.
    pub fn insert(&mut self, pattern: RoutePattern, methods: &MethodSet, target: Arc<T>) -> Arc<str> {
        let methods = methods.clone().or_get();
        let cleaned = Arc::clone(pattern.template());

        self.exact
            .insert(&cleaned, methods.clone(), Arc::clone(&target));
        let dynamic = pattern.is_dynamic();
        if dynamic {
            self.patterns.insert(pattern, methods.clone(), target);
        }
        self.templates += 1;

        debug!(
            template = %cleaned,
            methods = %methods,
            dynamic,
            "Template registered"
        );
        cleaned
    }
}

impl<T: ?Sized + Send + Sync> Router<T> {
    /// Resolve a request.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing matches under any method, `MethodNotAllowed`
    /// when the path is known for other methods, `AmbiguousMatch` under the
    /// reject policy.
    pub fn route(&self, method: &Method, path: &str) -> Result<RouteMatch<T>, RouteError> {
        if let Some(result) = self.try_strategies(method, path) {
            return result;
        }

        let cleaned = normalize_path(path);
        let retried = cleaned.as_ref() != path;
        if retried {
            debug!(path = %path, normalized = %cleaned, "Retrying with normalized path");
            if let Some(result) = self.try_strategies(method, &cleaned) {
                return result;
            }
        }

        let mut allowed = self.allowed_methods(path);
        if retried {
            allowed.extend(&self.allowed_methods(&cleaned));
        }

        if allowed.is_empty() {
            debug!(method = %method, path = %path, "No route matched");
            Err(RouteError::NotFound {
                method: method.clone(),
                path: path.to_string(),
            })
        } else {
            debug!(method = %method, path = %path, allowed = %allowed, "Method not allowed");
            Err(RouteError::MethodNotAllowed {
                path: path.to_string(),
                allowed,
            })
        }
    }

    /// Union of the methods every strategy would accept for `path`.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> MethodSet {
        let mut allowed = MethodSet::new();
        for strategy in self.strategies() {
            allowed.extend(&strategy.allowed_methods(path));
        }
        allowed
    }

    fn strategies(&self) -> [&dyn MatchStrategy<T>; 2] {
        [&self.exact as &dyn MatchStrategy<T>, &self.patterns]
    }

    /// `None` when every strategy missed.
    fn try_strategies(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<Result<RouteMatch<T>, RouteError>> {
        for strategy in self.strategies() {
            match strategy.find(method, path) {
                Ok(found) => {
                    debug!(
                        strategy = strategy.name(),
                        method = %method,
                        path = %path,
                        template = %found.template,
                        params = found.path_params.len(),
                        "Route matched"
                    );
                    return Some(Ok(found));
                }
                Err(err) if err.is_miss() => {}
                Err(err) => return Some(Err(err)),
            }
        }
        None
    }

    /// Log a one-line summary of the table.
    pub fn log_summary(&self, table: &'static str) {
        info!(
            table,
            templates = self.templates,
            exact_paths = self.exact.len(),
            patterns = self.patterns.len(),
            policy = ?self.policy(),
            "Routing table loaded"
        );
    }
}
