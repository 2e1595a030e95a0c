//! Literal path index.
//!
//! One hash probe per lookup. Templates are stored under their cleaned form;
//! each path keeps its registrations in order so that `GET /x` and `POST /x`
//! may resolve to different targets. This strategy never binds variables.

use http::Method;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::{MatchStrategy, MethodSet, ParamVec, RouteMatch};
use super::error::RouteError;

struct ExactEntry<T: ?Sized> {
    methods: MethodSet,
    target: Arc<T>,
    template: Arc<str>,
}

/// O(1) literal-path-plus-method table.
pub struct ExactIndex<T: ?Sized> {
    table: HashMap<Arc<str>, SmallVec<[ExactEntry<T>; 2]>>,
}

impl<T: ?Sized> Default for ExactIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> ExactIndex<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Register `path` for `methods`.
    pub fn insert(&mut self, path: &Arc<str>, methods: MethodSet, target: Arc<T>) {
        self.table
            .entry(Arc::clone(path))
            .or_default()
            .push(ExactEntry {
                methods,
                target,
                template: Arc::clone(path),
            });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Single table probe. A known path with a foreign method is still `NotFound`
    /// here; the composite router asks [`ExactIndex::allowed_methods`] afterwards.
    pub fn find(&self, method: &Method, path: &str) -> Result<RouteMatch<T>, RouteError> {
        self.table
            .get(path)
            .and_then(|entries| entries.iter().find(|e| e.methods.contains(method)))
            .map(|entry| RouteMatch {
                target: Arc::clone(&entry.target),
                template: Arc::clone(&entry.template),
                path_params: ParamVec::new(),
            })
            .ok_or_else(|| RouteError::NotFound {
                method: method.clone(),
                path: path.to_string(),
            })
    }

    /// Union of methods registered for `path`, empty when the path is unknown.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> MethodSet {
        let mut allowed = MethodSet::new();
        if let Some(entries) = self.table.get(path) {
            for entry in entries {
                allowed.extend(&entry.methods);
            }
        }
        allowed
    }
}

impl<T: ?Sized + Send + Sync> MatchStrategy<T> for ExactIndex<T> {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn find(&self, method: &Method, path: &str) -> Result<RouteMatch<T>, RouteError> {
        ExactIndex::find(self, method, path)
    }

    fn allowed_methods(&self, path: &str) -> MethodSet {
        ExactIndex::allowed_methods(self, path)
    }
}
