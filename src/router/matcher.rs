//! Progressive-elimination pattern matcher.
//!
//! Candidates start as every pattern registered for the request method. Patterns
//! with the wrong token count (non-wildcard) or whose wildcard bounds do not
//! admit the raw path are dropped up front; then each request token eliminates
//! the candidates whose segment at that position disagrees. Whatever survives
//! the last token is the match set.

use http::Method;
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::core::{MatchStrategy, MethodSet, ParamVec, RouteMatch};
use super::error::RouteError;
use super::pattern::{normalize_path, tokenize, RoutePattern};

/// What to do when more than one pattern survives elimination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AmbiguityPolicy {
    /// Rank survivors: most literal segments, then non-wildcard, then fewest
    /// variables, then earliest registration.
    #[default]
    MostSpecific,
    /// Fail with [`RouteError::AmbiguousMatch`].
    Reject,
}

impl AmbiguityPolicy {
    /// Parse a config value (`specific` / `reject`, case-insensitive).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "specific" | "most-specific" | "most_specific" => Some(Self::MostSpecific),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

struct PatternEntry<T: ?Sized> {
    pattern: RoutePattern,
    methods: MethodSet,
    target: Arc<T>,
}

type Survivors = SmallVec<[usize; 8]>;

/// Matcher for templates containing variables or a wildcard.
pub struct PatternMatcher<T: ?Sized> {
    entries: Vec<PatternEntry<T>>,
    by_method: HashMap<Method, Vec<usize>>,
    policy: AmbiguityPolicy,
}

impl<T: ?Sized> Default for PatternMatcher<T> {
    fn default() -> Self {
        Self::new(AmbiguityPolicy::default())
    }
}

impl<T: ?Sized> PatternMatcher<T> {
    #[must_use]
    pub fn new(policy: AmbiguityPolicy) -> Self {
        Self {
            entries: Vec::new(),
            by_method: HashMap::new(),
            policy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a compiled pattern. Entry order is registration order.
    pub fn insert(&mut self, pattern: RoutePattern, methods: MethodSet, target: Arc<T>) {
        let index = self.entries.len();
        for method in methods.iter() {
            self.by_method.entry(method.clone()).or_default().push(index);
        }
        self.entries.push(PatternEntry {
            pattern,
            methods,
            target,
        });
    }

    /// Resolve `method` + `path` by elimination.
    ///
    /// # Errors
    ///
    /// `NotFound` when nothing survives; `AmbiguousMatch` when several survive
    /// and the policy is [`AmbiguityPolicy::Reject`].
    pub fn find(&self, method: &Method, path: &str) -> Result<RouteMatch<T>, RouteError> {
        let not_found = || RouteError::NotFound {
            method: method.clone(),
            path: path.to_string(),
        };
        let Some(candidates) = self.by_method.get(method) else {
            return Err(not_found());
        };

        let cleaned = normalize_path(path);
        let tokens = tokenize(&cleaned);
        let survivors = self.eliminate(candidates.iter().copied(), path, &tokens);

        let winner = match survivors.as_slice() {
            [] => return Err(not_found()),
            [only] => *only,
            many => self.break_tie(path, many)?,
        };

        let entry = &self.entries[winner];
        Ok(RouteMatch {
            target: Arc::clone(&entry.target),
            template: Arc::clone(entry.pattern.template()),
            path_params: entry.pattern.extract(&tokens),
        })
    }

    /// Methods of every pattern that survives elimination for `path`.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> MethodSet {
        let cleaned = normalize_path(path);
        let tokens = tokenize(&cleaned);
        let mut allowed = MethodSet::new();
        for index in self.eliminate(0..self.entries.len(), path, &tokens) {
            allowed.extend(&self.entries[index].methods);
        }
        allowed
    }

    fn eliminate(
        &self,
        candidates: impl Iterator<Item = usize>,
        raw_path: &str,
        tokens: &[&str],
    ) -> Survivors {
        let mut live: Survivors = candidates
            .filter(|&i| {
                let pattern = &self.entries[i].pattern;
                match pattern.wildcard() {
                    Some(bounds) => bounds.admits(raw_path),
                    None => pattern.token_count() == tokens.len(),
                }
            })
            .collect();

        for (position, token) in tokens.iter().enumerate() {
            if live.is_empty() {
                break;
            }
            live.retain(|i| {
                let pattern = &self.entries[*i].pattern;
                pattern.is_wildcard() || pattern.matches_token(position, token)
            });
        }
        live
    }

    fn break_tie(&self, path: &str, survivors: &[usize]) -> Result<usize, RouteError> {
        let candidates: Vec<Arc<str>> = survivors
            .iter()
            .map(|&i| Arc::clone(self.entries[i].pattern.template()))
            .collect();

        match self.policy {
            AmbiguityPolicy::Reject => {
                warn!(
                    path = %path,
                    candidates = candidates.len(),
                    "Ambiguous route rejected"
                );
                Err(RouteError::AmbiguousMatch {
                    path: path.to_string(),
                    candidates,
                })
            }
            AmbiguityPolicy::MostSpecific => {
                let winner = survivors
                    .iter()
                    .copied()
                    .max_by_key(|&i| {
                        let pattern = &self.entries[i].pattern;
                        (
                            pattern.literal_count(),
                            !pattern.is_wildcard(),
                            Reverse(pattern.variable_count()),
                            Reverse(i),
                        )
                    })
                    .unwrap_or(survivors[0]);
                warn!(
                    path = %path,
                    candidates = candidates.len(),
                    chosen = %self.entries[winner].pattern.template(),
                    "Ambiguous route resolved to most specific pattern"
                );
                Ok(winner)
            }
        }
    }
}

impl<T: ?Sized + Send + Sync> MatchStrategy<T> for PatternMatcher<T> {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn find(&self, method: &Method, path: &str) -> Result<RouteMatch<T>, RouteError> {
        PatternMatcher::find(self, method, path)
    }

    fn allowed_methods(&self, path: &str) -> MethodSet {
        PatternMatcher::allowed_methods(self, path)
    }
}
