use http::Method;
use std::fmt;
use std::sync::Arc;

use super::core::MethodSet;

/// Routing failure.
///
/// `NotFound`, `MethodNotAllowed` and `MissingHandler` are status signals: the
/// dispatcher turns them into responses, they are never raised as panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No exact or pattern route matches the method and path.
    NotFound {
        /// Request method
        method: Method,
        /// Request path as received
        path: String,
    },
    /// The path is known but not registered for the request method.
    MethodNotAllowed {
        /// Request path as received
        path: String,
        /// Methods the path is registered for
        allowed: MethodSet,
    },
    /// More than one pattern survived elimination and the matcher was
    /// configured to reject rather than rank.
    AmbiguousMatch {
        /// Request path as received
        path: String,
        /// Templates of every surviving pattern, in registration order
        candidates: Vec<Arc<str>>,
    },
    /// A route matched but no handler descriptor is registered under its name.
    MissingHandler {
        /// Route name the matcher resolved to
        name: Arc<str>,
    },
    /// The template could not be compiled.
    InvalidPattern {
        /// Cleaned template
        template: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

impl RouteError {
    /// HTTP status code equivalent of this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            RouteError::NotFound { .. } => 404,
            RouteError::MethodNotAllowed { .. } => 405,
            RouteError::AmbiguousMatch { .. } => 409,
            RouteError::MissingHandler { .. } | RouteError::InvalidPattern { .. } => 500,
        }
    }

    /// True for the two "nothing here" outcomes a strategy may report.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            RouteError::NotFound { .. } | RouteError::MethodNotAllowed { .. }
        )
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::NotFound { method, path } => {
                write!(f, "no route for {method} {path}")
            }
            RouteError::MethodNotAllowed { path, allowed } => {
                write!(f, "{path} does not accept this method (allowed: {allowed})")
            }
            RouteError::AmbiguousMatch { path, candidates } => {
                write!(
                    f,
                    "{path} matches {} patterns: {}",
                    candidates.len(),
                    candidates
                        .iter()
                        .map(|c| c.as_ref())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
            RouteError::MissingHandler { name } => {
                write!(f, "route '{name}' has no registered handler")
            }
            RouteError::InvalidPattern { template, reason } => {
                write!(f, "invalid route template '{template}': {reason}")
            }
        }
    }
}

impl std::error::Error for RouteError {}
